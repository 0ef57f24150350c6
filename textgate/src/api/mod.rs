//! API layer for HTTP request handling.
//!
//! - **[`handlers`]**: Axum route handlers
//!
//! # API Structure
//!
//! - `POST /detectText`: multipart image upload, returns the provider's structured result
//! - `POST /getOnlyText`: multipart image upload, returns the detected text as one comma-joined string
//! - `GET /healthz`: liveness

pub mod handlers;
