//! Text detection provider abstraction.
//!
//! The [`TextDetector`] trait is the seam between the gateway and the external
//! text-detection service. [`DetectionClient`] wraps a detector with the checks
//! and limits every request goes through: empty images never leave the process
//! and every call is bounded by the configured timeout.

use async_trait::async_trait;
use axum::http::StatusCode;
use bytes::Bytes;
use std::{sync::Arc, time::Duration};
use tracing::{debug, instrument};

use crate::config::DetectionConfig;
use crate::errors::{Error, Result};

pub mod models;
pub mod rekognition;

pub use models::{DetectionResult, TextDetection, TextKind};

/// Create the detection provider from configuration
pub async fn create_detector(config: &DetectionConfig) -> Arc<dyn TextDetector> {
    Arc::new(rekognition::RekognitionDetector::from_config(config).await)
}

/// Errors reported by a detection provider
#[derive(Debug, Clone, thiserror::Error)]
pub enum DetectionError {
    /// The provider received the request and rejected it
    #[error("Text detection failed ({code}): {message}")]
    Service { code: String, message: String },

    /// The request never got a provider answer (DNS, TLS, connection, signing)
    #[error("{0}")]
    Transport(String),
}

impl DetectionError {
    pub fn code(&self) -> &str {
        match self {
            DetectionError::Service { code, .. } => code,
            DetectionError::Transport(_) => "TransportError",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DetectionError::Service { message, .. } | DetectionError::Transport(message) => message,
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.code() {
            "ThrottlingException" | "ProvisionedThroughputExceededException" | "LimitExceededException" => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            _ => StatusCode::BAD_GATEWAY,
        }
    }
}

/// An external capability that finds text in an image.
///
/// Implementations must return detections in the order the provider reports them.
#[async_trait]
pub trait TextDetector: Send + Sync {
    async fn detect_text(&self, image: Bytes) -> std::result::Result<DetectionResult, DetectionError>;
}

/// Shared, read-only handle used by request handlers to reach the provider.
#[derive(Clone)]
pub struct DetectionClient {
    detector: Arc<dyn TextDetector>,
    timeout: Duration,
}

impl DetectionClient {
    pub fn new(detector: Arc<dyn TextDetector>, timeout: Duration) -> Self {
        Self { detector, timeout }
    }

    #[instrument(skip_all, fields(size = image_bytes.len()))]
    pub async fn detect_text(&self, image_bytes: Bytes) -> Result<DetectionResult> {
        if image_bytes.is_empty() {
            return Err(Error::Validation {
                message: "empty image".to_string(),
            });
        }

        let result = tokio::time::timeout(self.timeout, self.detector.detect_text(image_bytes))
            .await
            .map_err(|_| Error::DetectionTimeout { timeout: self.timeout })??;

        debug!(detections = result.text_detections.len(), "Detection provider answered");
        Ok(result)
    }
}

impl std::fmt::Debug for DetectionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionClient").field("timeout", &self.timeout).finish_non_exhaustive()
    }
}
