//! Bind structured values out of incoming request data.
//!
//! A value's schema annotates each field with the request locations it can be
//! populated from—path parameters, urlencoded form bodies, query parameters,
//! cookies, headers, the JSON body, the raw body, uploaded files. The [`Binder`]
//! compiles the schema into a reusable plan, then walks the request once per
//! bind, resolving each field from the first of its declared locations that
//! holds a value.
//!
//! Check out [`Binder::bind`] for the typed entry point and
//! [`Binder::bind_value`] for the dynamic one.
pub mod errors;
pub mod multipart;
pub mod schema;

mod binder;
mod collection;
mod json;
mod plan;
mod sources;
mod tag;
mod value;

pub use binder::{BindRequest, Binder};
pub use errors::BindError;
pub use plan::Plan;
pub use schema::Bindable;
pub use value::Value;
