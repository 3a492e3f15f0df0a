//! Path parameters, as resolved by the surrounding router.
mod path_params;

pub use path_params::PathParams;
