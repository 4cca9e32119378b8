//! Collaborator service request/response types.

use serde::{Deserialize, Serialize};

use fscope_models::BBox;

/// Request for per-frame object detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectRequest {
    pub frame_index: u64,
    pub width: u32,
    pub height: u32,
    /// Base64-encoded pixel buffer
    pub frame: String,
}

/// One detected object on the wire (the frame index is implied by the
/// request).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedObject {
    #[serde(rename = "class")]
    pub class_label: String,
    pub confidence: f64,
    pub bbox: BBox,
}

/// Response from the detection service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub detections: Vec<DetectedObject>,
}

/// Request for bounding-box-prompted segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentRequest {
    pub frame_index: u64,
    pub width: u32,
    pub height: u32,
    /// Base64-encoded pixel buffer
    pub frame: String,
    pub bbox: BBox,
}

/// Response from the segmentation service: an RLE mask over the full
/// frame grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentResponse {
    pub rle: String,
    pub width: u32,
    pub height: u32,
}

/// Request for whole-video semantic analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzeRequest {
    pub video_ref: String,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: Option<String>,
}
