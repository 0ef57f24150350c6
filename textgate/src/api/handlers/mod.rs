//! HTTP request handlers.
//!
//! - [`detection`]: image upload and text detection endpoints
//!
//! # Error Handling
//!
//! Handlers return [`crate::errors::Error`] which converts to the matching HTTP status code:
//! plain-text bodies for client errors, `{ "code", "message" }` JSON for provider failures.

pub mod detection;
