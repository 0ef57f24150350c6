//! AWS Rekognition `DetectText` provider.

use async_trait::async_trait;
use aws_credential_types::Credentials;
use aws_sdk_rekognition::{
    Client,
    config::Region,
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    operation::detect_text::DetectTextOutput,
    primitives::Blob,
    types,
};
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use super::models::{BoundingBox, DetectionResult, Geometry, Point, TextDetection, TextKind};
use super::{DetectionError, TextDetector};
use crate::config::DetectionConfig;

const TRANSPORT_ERROR_MESSAGE: &str = "Text detection service is unreachable";

/// Text detector backed by a single, process-wide Rekognition client.
#[derive(Debug, Clone)]
pub struct RekognitionDetector {
    client: Client,
}

impl RekognitionDetector {
    /// Build the SDK client.
    ///
    /// Explicit credentials from the config take precedence; otherwise the AWS default
    /// provider chain (environment, profile, instance metadata) is used. SDK retries are
    /// disabled so a failing call is reported once, straight back to the caller.
    pub async fn from_config(config: &DetectionConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .retry_config(aws_config::retry::RetryConfig::disabled());

        if let (Some(id), Some(secret)) = (&config.credential_id, &config.credential_secret) {
            loader = loader.credentials_provider(Credentials::new(
                id.clone(),
                secret.clone(),
                config.session_token.clone(),
                None,
                "textgate-config",
            ));
        }

        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url.clone());
        }

        let sdk_config = loader.load().await;
        info!(
            region = %config.region,
            endpoint_url = ?config.endpoint_url,
            static_credentials = config.credential_id.is_some(),
            "Rekognition client initialized"
        );

        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl TextDetector for RekognitionDetector {
    #[instrument(skip_all, fields(size = image.len()))]
    async fn detect_text(&self, image: Bytes) -> Result<DetectionResult, DetectionError> {
        let image = types::Image::builder().bytes(Blob::new(image.to_vec())).build();

        let output = self.client.detect_text().image(image).send().await.map_err(into_detection_error)?;

        Ok(DetectionResult::from(output))
    }
}

fn into_detection_error<E>(err: SdkError<E>) -> DetectionError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    match err.as_service_error() {
        Some(service_err) => {
            let code = service_err.code().unwrap_or("Unknown").to_string();
            let message = service_err
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| DisplayErrorContext(&err).to_string());
            DetectionError::Service { code, message }
        }
        None => {
            // Full context names the endpoint; keep it in the logs only
            warn!(error = %DisplayErrorContext(&err), "Rekognition request failed before a response");
            DetectionError::Transport(TRANSPORT_ERROR_MESSAGE.to_string())
        }
    }
}

impl From<DetectTextOutput> for DetectionResult {
    fn from(output: DetectTextOutput) -> Self {
        Self {
            text_detections: output.text_detections().iter().map(TextDetection::from).collect(),
            text_model_version: output.text_model_version().map(str::to_string),
        }
    }
}

impl From<&types::TextDetection> for TextDetection {
    fn from(detection: &types::TextDetection) -> Self {
        Self {
            detected_text: detection.detected_text().map(str::to_string),
            kind: detection.r#type().and_then(text_kind),
            id: detection.id(),
            parent_id: detection.parent_id(),
            confidence: detection.confidence(),
            geometry: detection.geometry().map(Geometry::from),
        }
    }
}

fn text_kind(kind: &types::TextTypes) -> Option<TextKind> {
    match kind {
        types::TextTypes::Line => Some(TextKind::Line),
        types::TextTypes::Word => Some(TextKind::Word),
        other => {
            debug!(kind = other.as_str(), "Dropping unknown text detection type");
            None
        }
    }
}

impl From<&types::Geometry> for Geometry {
    fn from(geometry: &types::Geometry) -> Self {
        Self {
            bounding_box: geometry.bounding_box().map(|b| BoundingBox {
                width: b.width(),
                height: b.height(),
                left: b.left(),
                top: b.top(),
            }),
            polygon: geometry.polygon().iter().map(|p| Point { x: p.x(), y: p.y() }).collect(),
        }
    }
}
