//! HTTP request handlers.

pub(crate) mod client;
/// Document endpoints.
pub mod document;
