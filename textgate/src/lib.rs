//! # textgate: image text-detection gateway
//!
//! `textgate` accepts image uploads over HTTP and forwards them to a cloud text-detection
//! service (AWS Rekognition `DetectText`), answering with either the provider's full
//! structured result or just the detected text.
//!
//! ## Request Flow
//!
//! Every request runs the same pipeline, with all state scoped to that request:
//!
//! 1. **Ingest** ([`ingest`]): the first multipart part carrying a file name is checked
//!    against the png/jpg/jpeg allow-list and streamed to a uniquely named file in the
//!    storage directory. Rejected or empty uploads never reach the provider.
//! 2. **Detect** ([`detection`]): the stored bytes are sent to the provider through the
//!    [`detection::TextDetector`] trait, bounded by a timeout.
//! 3. **Shape** ([`shaping`]): the result is returned as-is (`/detectText`) or flattened to
//!    a comma-joined string (`/getOnlyText`).
//!
//! The stored file is removed once the request finishes, on success, error or client
//! disconnect. Errors map to HTTP statuses in [`errors`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use textgate::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = textgate::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     textgate::telemetry::init_telemetry(&config.telemetry)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod detection;
pub mod errors;
pub mod ingest;
pub mod shaping;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use detection::{DetectionClient, TextDetector};
use ingest::ImageStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::{Level, debug, info, instrument};

/// Headroom on top of `limits.max_file_size` for multipart boundaries and part headers.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Application state shared across all request handlers.
///
/// Everything in here is read-only after startup. Per-request data (the upload, its bytes,
/// the detection result) is never stored here.
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .images(images)
///     .detection(detection)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub images: ImageStore,
    pub detection: DetectionClient,
}

/// Build the application router with all endpoints and middleware.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.config.limits.max_file_size)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let detection_routes = Router::new()
        .route("/detectText", post(api::handlers::detection::detect_text))
        .route("/getOnlyText", post(api::handlers::detection::get_only_text))
        .layer(DefaultBodyLimit::max(body_limit));

    let router = Router::new()
        .merge(detection_routes)
        .route("/healthz", get(|| async { "OK" }))
        .with_state(state);

    // Add tracing layer
    router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    )
}

/// The assembled service.
///
/// 1. **Create**: [`Application::new`] builds the provider client, prepares the storage
///    directory and the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and handles requests until the
///    shutdown future resolves
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application backed by the configured detection provider
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let detector = detection::create_detector(&config.detection).await;
        Self::with_detector(config, detector).await
    }

    /// Create a new application around an already-built detector
    pub async fn with_detector(config: Config, detector: Arc<dyn TextDetector>) -> anyhow::Result<Self> {
        debug!("Starting text gateway with configuration: {:#?}", config);

        let images = ImageStore::from_config(&config).await?;
        let detection = DetectionClient::new(detector, config.detection.timeout);

        let state = AppState::builder().config(config.clone()).images(images).detection(detection).build();
        let router = build_router(state);

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Text gateway listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
