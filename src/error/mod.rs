//! Error types
//!
//! HTTP-facing error type; service errors live next to their services and
//! convert into `ApiError` at the handler boundary.

mod types;

pub use types::ApiError;
