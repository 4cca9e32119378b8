//! Collaborator contracts consumed by the orchestrator.
//!
//! Implementations are interchangeable: the HTTP clients in this crate for
//! production, hand-written fakes in tests.

use async_trait::async_trait;

use fscope_mask::BinaryMask;
use fscope_models::{BBox, Detection, Frame, SemanticAnalysis};

use crate::error::ClientResult;

/// Fixed-vocabulary per-frame object detector.
///
/// May fail transiently (network/GPU unavailable); the orchestrator owns
/// the retry policy.
#[async_trait]
pub trait ObjectDetector: Send + Sync {
    async fn detect(&self, frame: &Frame) -> ClientResult<Vec<Detection>>;
}

/// Pixel segmenter prompted with a bounding box.
///
/// This collaborator is optional: running without one is a valid
/// configuration, not an error.
#[async_trait]
pub trait Segmenter: Send + Sync {
    async fn segment(&self, frame: &Frame, bbox: &BBox) -> ClientResult<BinaryMask>;
}

/// Whole-video semantic analyzer.
///
/// Slow (tens of seconds) and transient-failure prone.
#[async_trait]
pub trait SemanticAnalyzer: Send + Sync {
    async fn analyze(&self, video_ref: &str) -> ClientResult<SemanticAnalysis>;
}
