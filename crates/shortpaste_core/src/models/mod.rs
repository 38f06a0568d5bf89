//! Data models shared by the store and the HTTP layer.

/// Documents, save requests and URL detection.
pub mod document;


pub use document::{is_url, parse_url, Document, DocumentView, SaveOutcome, SaveRequest};
