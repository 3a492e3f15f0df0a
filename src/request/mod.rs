//! Request types: the head of the incoming request, its buffered body and the
//! path parameters resolved by the surrounding router.
pub mod body;
pub mod path;

mod request_head;

pub use request_head::RequestHead;
