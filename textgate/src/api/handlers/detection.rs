//! HTTP handlers for text detection.
//!
//! Both endpoints share one pipeline: take the first multipart part that carries a file
//! name (whatever the field is called), store it, read it back, send it to the provider
//! and shape the answer. The stored file belongs to the request and is removed when the
//! pipeline returns, whatever the outcome.

use axum::{
    Json,
    extract::{Multipart, State},
};
use tracing::{debug, info, instrument};

use crate::AppState;
use crate::detection::DetectionResult;
use crate::errors::{Error, Result};
use crate::ingest::UploadedImage;
use crate::shaping;

/// `POST /detectText`: the provider's full structured result.
#[instrument(skip_all)]
pub async fn detect_text(State(state): State<AppState>, multipart: Multipart) -> Result<Json<DetectionResult>> {
    let result = run_detection(&state, multipart).await?;
    Ok(shaping::shape_full(result))
}

/// `POST /getOnlyText`: the detected strings joined with commas.
#[instrument(skip_all)]
pub async fn get_only_text(State(state): State<AppState>, multipart: Multipart) -> Result<Json<String>> {
    let result = run_detection(&state, multipart).await?;
    Ok(Json(shaping::shape_text_only(&result)))
}

#[instrument(skip_all, fields(file_id = tracing::field::Empty))]
async fn run_detection(state: &AppState, mut multipart: Multipart) -> Result<DetectionResult> {
    let image = receive_upload(state, &mut multipart).await?.ok_or(Error::EmptyUpload)?;
    tracing::Span::current().record("file_id", tracing::field::display(image.file_id()));
    debug!(original_name = image.original_name(), "Upload validated and stored");

    let image_bytes = state.images.read(&image).await?;
    let result = state.detection.detect_text(image_bytes).await?;

    info!(
        original_name = image.original_name(),
        size = image.size(),
        detections = result.text_detections.len(),
        "Text detected"
    );

    image.release().await;
    Ok(result)
}

/// Store the first file part of the form. `None` when the form has no file part.
async fn receive_upload(state: &AppState, multipart: &mut Multipart) -> Result<Option<UploadedImage>> {
    while let Some(field) = multipart.next_field().await? {
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                debug!(field = ?field.name(), "Skipping multipart field without a file");
                continue;
            }
        };

        debug!(field = ?field.name(), file_name = %file_name, "Upload received");
        return state.images.ingest(&file_name, field).await.map(Some);
    }

    Ok(None)
}
