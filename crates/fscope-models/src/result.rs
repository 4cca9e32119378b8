//! The composed result payload of a completed job.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::detection::VerifiedDetection;
use crate::mask::MaskArtifact;
use crate::product::SemanticAnalysis;
use crate::timeline::{AnalysisStatistics, TimelineEntry};
use crate::track::Track;

/// Semantic section of the result, present when semantic analysis
/// completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SemanticResult {
    pub analysis: SemanticAnalysis,

    /// Product names confirmed by at least one detection
    pub verified_product_names: BTreeSet<String>,
}

/// Final queryable output of a completed job.
///
/// Sections are typed per stage rather than ad hoc optional keys:
/// segmentation and semantics may be absent (graceful degradation) while
/// detections, tracks and statistics are always present. Frame-index map
/// keys serialize as JSON strings, matching the established wire shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    /// Verified detections grouped by sampled frame index
    pub detections: BTreeMap<u64, Vec<VerifiedDetection>>,

    /// Trajectory summaries keyed by track id
    pub tracks: BTreeMap<String, Track>,

    /// Segmentation masks grouped by frame index; absent when the
    /// segmenter was unavailable or its output was dropped
    #[serde(skip_serializing_if = "Option::is_none")]
    pub masks: Option<BTreeMap<u64, Vec<MaskArtifact>>>,

    /// Semantic section; absent when semantic analysis did not complete
    #[serde(skip_serializing_if = "Option::is_none")]
    pub semantic: Option<SemanticResult>,

    /// Chronological per-scene summary
    pub timeline: Vec<TimelineEntry>,

    pub statistics: AnalysisStatistics,
}

impl AnalysisResult {
    /// Product names verified by detections, empty when no semantic
    /// section is present.
    pub fn verified_product_names(&self) -> BTreeSet<String> {
        self.semantic
            .as_ref()
            .map(|s| s.verified_product_names.clone())
            .unwrap_or_default()
    }
}
