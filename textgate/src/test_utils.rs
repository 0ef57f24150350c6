//! Test utilities: a scriptable detector and helpers to stand up the app on a temp directory.

use crate::config::Config;
use crate::detection::{DetectionError, DetectionResult, TextDetection, TextDetector, TextKind};
use async_trait::async_trait;
use axum_test::TestServer;
use axum_test::multipart::{MultipartForm, Part};
use bytes::Bytes;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone)]
enum StubBehavior {
    Fixed(DetectionResult),
    /// One LINE per whitespace-separated token of the image bytes
    Echo,
    Fail { code: String, message: String },
}

/// In-process stand-in for the detection provider.
#[derive(Debug)]
pub struct StubDetector {
    behavior: StubBehavior,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl StubDetector {
    fn with_behavior(behavior: StubBehavior) -> Self {
        Self {
            behavior,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn fixed(result: DetectionResult) -> Self {
        Self::with_behavior(StubBehavior::Fixed(result))
    }

    pub fn echo() -> Self {
        Self::with_behavior(StubBehavior::Echo)
    }

    pub fn failing(code: &str, message: &str) -> Self {
        Self::with_behavior(StubBehavior::Fail {
            code: code.to_string(),
            message: message.to_string(),
        })
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times the provider was invoked
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextDetector for StubDetector {
    async fn detect_text(&self, image: Bytes) -> Result<DetectionResult, DetectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match &self.behavior {
            StubBehavior::Fixed(result) => Ok(result.clone()),
            StubBehavior::Echo => {
                let text = String::from_utf8_lossy(&image);
                Ok(DetectionResult::new(text.split_whitespace().map(line).collect()))
            }
            StubBehavior::Fail { code, message } => Err(DetectionError::Service {
                code: code.clone(),
                message: message.clone(),
            }),
        }
    }
}

fn detection(text: &str, kind: TextKind) -> TextDetection {
    TextDetection {
        detected_text: Some(text.to_string()),
        kind: Some(kind),
        confidence: Some(99.0),
        ..Default::default()
    }
}

pub fn line(text: &str) -> TextDetection {
    detection(text, TextKind::Line)
}

pub fn word(text: &str) -> TextDetection {
    detection(text, TextKind::Word)
}

pub fn create_test_config() -> Config {
    let mut config = Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        ..Default::default()
    };
    config.limits.max_file_size = 1024 * 1024;
    config.detection.timeout = Duration::from_secs(5);
    config
}

/// Test server on a fresh storage directory. Keep the `TempDir` alive for the duration of the test.
pub async fn create_test_app(detector: Arc<StubDetector>) -> (TestServer, TempDir) {
    create_test_app_with_config(create_test_config(), detector).await
}

pub async fn create_test_app_with_config(mut config: Config, detector: Arc<StubDetector>) -> (TestServer, TempDir) {
    let storage = tempfile::tempdir().expect("Failed to create storage directory");
    config.storage.directory = storage.path().to_path_buf();

    let app = crate::Application::with_detector(config, detector)
        .await
        .expect("Failed to create application");

    (app.into_test_server(), storage)
}

pub fn image_form(field: &str, file_name: &str, bytes: &[u8]) -> MultipartForm {
    MultipartForm::new().add_part(field.to_string(), Part::bytes(bytes.to_vec()).file_name(file_name.to_string()))
}

/// Files currently present in a storage directory
pub fn stored_files(directory: &Path) -> usize {
    std::fs::read_dir(directory).map(|entries| entries.count()).unwrap_or(0)
}
