//! Timeline entries and aggregate statistics.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One chronological entry of the reconciled timeline.
///
/// Derived and recomputed each time the timeline builder runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TimelineEntry {
    pub scene_index: u32,

    /// Inclusive frame range `[start, end]` covered by the scene
    pub frame_range: (u64, u64),

    /// Scene description from the semantic analyzer
    pub description: String,

    /// Product names actually confirmed by detections within this scene
    pub verified_products: BTreeSet<String>,
}

/// Aggregate statistics over a completed analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisStatistics {
    /// Total unique tracked objects (open and closed)
    pub total_tracks: u64,

    /// Total detections across all sampled frames
    pub total_detections: u64,

    /// Sampled frames with at least one detection
    pub frames_with_detections: u64,

    /// Total frames selected by the sampler
    pub total_sampled_frames: u64,

    /// Mean confidence over all detections (0.0 when there are none)
    pub average_confidence: f64,

    /// Detection count per class label
    pub class_distribution: BTreeMap<String, u64>,
}
