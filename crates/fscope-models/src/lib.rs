//! Shared data models for the FrameScope analysis pipeline.
//!
//! This crate provides Serde-serializable types for:
//! - Jobs, job status and failure causes
//! - Per-frame detections and bounding boxes
//! - Semantic analysis output (products, scenes)
//! - Object tracks and trajectory points
//! - Segmentation mask artifacts
//! - The composed analysis result payload

pub mod detection;
pub mod frame;
pub mod job;
pub mod mask;
pub mod product;
pub mod result;
pub mod timeline;
pub mod track;

// Re-export common types
pub use detection::{BBox, Detection, VerifiedDetection};
pub use frame::Frame;
pub use job::{FailureKind, Job, JobFailure, JobId, JobStatus};
pub use mask::MaskArtifact;
pub use product::{Product, SceneSegment, SemanticAnalysis};
pub use result::{AnalysisResult, SemanticResult};
pub use timeline::{AnalysisStatistics, TimelineEntry};
pub use track::{format_track_id, Track, TrackPoint, TrackQuality};

/// Metadata describing a resolved video, as reported by the video store.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct VideoInfo {
    /// Total number of frames in the video
    pub frame_count: u64,
    /// Frames per second
    pub fps: f64,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}
