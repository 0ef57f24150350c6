use crate::detection::DetectionError;
use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::time::Duration;
use thiserror::Error as ThisError;

/// Message returned whenever a request carries no usable file.
pub const EMPTY_UPLOAD_MESSAGE: &str = "The file cannot be empty";

/// Message returned when the uploaded file name has no allowed image extension.
pub const UNSUPPORTED_FORMAT_MESSAGE: &str = "Please check the file format, it is not in image format that is jpeg,jpg or png";

#[derive(ThisError, Debug)]
pub enum Error {
    /// No file part in the upload, or a file part without bytes
    #[error("{}", EMPTY_UPLOAD_MESSAGE)]
    EmptyUpload,

    /// File name extension outside the png/jpg/jpeg allow-list
    #[error("Unsupported image format for file '{file_name}'")]
    UnsupportedFormat { file_name: String },

    /// Input rejected before reaching the detection provider
    #[error("{message}")]
    Validation { message: String },

    /// Malformed request, e.g. unreadable multipart body
    #[error("{message}")]
    BadRequest { message: String },

    /// Upload exceeded the configured size limit
    #[error("{message}")]
    PayloadTooLarge { message: String },

    /// The detection provider answered with an error or could not be reached
    #[error(transparent)]
    Detection(#[from] DetectionError),

    /// The detection provider did not answer in time
    #[error("Text detection did not complete within {timeout:?}")]
    DetectionTimeout { timeout: Duration },

    /// Local disk failure while handling an upload
    #[error("Failed to {operation}: {source}")]
    Storage { operation: String, source: std::io::Error },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn storage(operation: impl Into<String>, source: std::io::Error) -> Self {
        Error::Storage {
            operation: operation.into(),
            source,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::EmptyUpload | Error::UnsupportedFormat { .. } | Error::Validation { .. } | Error::BadRequest { .. } => {
                StatusCode::BAD_REQUEST
            }
            Error::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Error::Detection(err) => err.status_code(),
            Error::DetectionTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            Error::Storage { .. } | Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::EmptyUpload => EMPTY_UPLOAD_MESSAGE.to_string(),
            Error::UnsupportedFormat { .. } => UNSUPPORTED_FORMAT_MESSAGE.to_string(),
            Error::Validation { message } | Error::BadRequest { message } | Error::PayloadTooLarge { message } => message.clone(),
            Error::Detection(err) => err.message().to_string(),
            Error::DetectionTimeout { .. } => self.to_string(),
            Error::Storage { .. } | Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Storage { .. } | Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Detection(_) | Error::DetectionTimeout { .. } => {
                tracing::warn!("Text detection error: {}", self);
            }
            Error::EmptyUpload
            | Error::UnsupportedFormat { .. }
            | Error::Validation { .. }
            | Error::BadRequest { .. }
            | Error::PayloadTooLarge { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // Provider failures carry the provider's code so callers can tell throttling from bad input
            Error::Detection(err) => {
                let body = serde_json::json!({
                    "code": err.code(),
                    "message": err.message(),
                });
                (status, axum::response::Json(body)).into_response()
            }
            Error::DetectionTimeout { .. } => {
                let body = serde_json::json!({
                    "code": "Timeout",
                    "message": self.user_message(),
                });
                (status, axum::response::Json(body)).into_response()
            }
            _ => (status, self.user_message()).into_response(),
        }
    }
}

impl From<MultipartError> for Error {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Error::PayloadTooLarge { message: err.body_text() }
        } else {
            Error::BadRequest {
                message: format!("Failed to parse multipart data: {}", err.body_text()),
            }
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
