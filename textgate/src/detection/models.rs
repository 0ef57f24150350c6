//! Structured detection results.
//!
//! Field names follow the provider's wire format (PascalCase, `TextDetections`,
//! `DetectedText`, ...) so `/detectText` can hand the result back unchanged.

use serde::{Deserialize, Serialize};

/// Everything the provider detected in one image, in provider order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetectionResult {
    #[serde(default)]
    pub text_detections: Vec<TextDetection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_model_version: Option<String>,
}

impl DetectionResult {
    pub fn new(text_detections: Vec<TextDetection>) -> Self {
        Self {
            text_detections,
            text_model_version: None,
        }
    }

    /// Detected strings in provider order; detections without text yield `""`.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.text_detections.iter().map(|d| d.detected_text.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TextDetection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detected_text: Option<String>,
    #[serde(rename = "Type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TextKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i32>,
    /// Id of the LINE a WORD belongs to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TextKind {
    Line,
    Word,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Geometry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,
    #[serde(default)]
    pub polygon: Vec<Point>,
}

/// Ratios of the overall image size, not pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BoundingBox {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top: Option<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Point {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serializes_with_provider_field_names() {
        let result = DetectionResult {
            text_detections: vec![TextDetection {
                detected_text: Some("HELLO".to_string()),
                kind: Some(TextKind::Line),
                id: Some(0),
                parent_id: None,
                confidence: Some(99.5),
                geometry: Some(Geometry {
                    bounding_box: Some(BoundingBox {
                        width: Some(0.5),
                        height: Some(0.25),
                        left: Some(0.0),
                        top: Some(0.5),
                    }),
                    polygon: vec![Point { x: Some(0.0), y: Some(0.5) }],
                }),
            }],
            text_model_version: Some("3.0".to_string()),
        };

        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(
            value,
            json!({
                "TextDetections": [{
                    "DetectedText": "HELLO",
                    "Type": "LINE",
                    "Id": 0,
                    "Confidence": 99.5,
                    "Geometry": {
                        "BoundingBox": { "Width": 0.5, "Height": 0.25, "Left": 0.0, "Top": 0.5 },
                        "Polygon": [{ "X": 0.0, "Y": 0.5 }]
                    }
                }],
                "TextModelVersion": "3.0"
            })
        );
    }

    #[test]
    fn test_empty_result_keeps_detections_key() {
        let value = serde_json::to_value(DetectionResult::default()).unwrap();
        assert_eq!(value, json!({ "TextDetections": [] }));
    }

    #[test]
    fn test_texts_preserves_order_and_fills_missing() {
        let result = DetectionResult::new(vec![
            TextDetection {
                detected_text: Some("b".to_string()),
                ..Default::default()
            },
            TextDetection::default(),
            TextDetection {
                detected_text: Some("a".to_string()),
                ..Default::default()
            },
        ]);

        assert_eq!(result.texts().collect::<Vec<_>>(), vec!["b", "", "a"]);
    }
}
