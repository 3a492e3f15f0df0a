//! The buffered request body.
mod buffered_body;

pub use buffered_body::BufferedBody;
