//! Response shapes for detection results.

use axum::Json;

use crate::detection::DetectionResult;

/// Full provider payload, unchanged.
pub fn shape_full(result: DetectionResult) -> Json<DetectionResult> {
    Json(result)
}

/// Every detected string in provider order, joined with `,` and no escaping.
///
/// Detections without text contribute an empty element; no detections yield `""`.
pub fn shape_text_only(result: &DetectionResult) -> String {
    result.texts().collect::<Vec<_>>().join(",")
}
