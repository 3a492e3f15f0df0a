//! # tagbind
//!
//! Tag-driven, multi-source binding of HTTP request data into structured values.
//!
//! A value's schema annotates each field with the request locations that can
//! populate it—path parameters, form bodies, query parameters, cookies, headers,
//! the JSON body, the raw body, uploaded files. [`Binder`] compiles the schema
//! once, caches the resulting plan, and resolves each field from the first of its
//! declared locations that holds a value.
//!
//! Check out the [`binding`] module for the full API.
pub mod binding;
pub mod request;

pub use binding::{BindError, BindRequest, Bindable, Binder, Value};
