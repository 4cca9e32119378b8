//! Semantic analyzer output: products and scene segments.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A product identified by the semantic analyzer.
///
/// Names are free text ("GOODBOY GRAVIES"), unlike the detector's fixed
/// vocabulary; the verifier bridges the two.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Product {
    /// Free-text product name
    pub name: String,

    /// Category (tool/utensil/appliance/container/...)
    pub category: String,

    /// First time the product is seen in use, seconds from video start
    pub first_seen_ts: f64,

    /// Last time the product is seen in use
    pub last_seen_ts: f64,
}

/// A contiguous semantic scene within the video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SceneSegment {
    pub start_seconds: f64,
    pub end_seconds: f64,
    /// What happens in this scene
    pub description: String,
}

impl SceneSegment {
    /// Whether a `[first, last]` timestamp range overlaps this scene.
    pub fn overlaps(&self, first_ts: f64, last_ts: f64) -> bool {
        first_ts <= self.end_seconds && last_ts >= self.start_seconds
    }
}

/// Full output of the semantic analyzer for one video.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SemanticAnalysis {
    /// Products actively used in the video
    #[serde(default)]
    pub products: Vec<Product>,

    /// Chronological scene segments
    #[serde(default)]
    pub scenes: Vec<SceneSegment>,

    /// One-paragraph video summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_overlap() {
        let scene = SceneSegment {
            start_seconds: 10.0,
            end_seconds: 20.0,
            description: "chopping".into(),
        };
        assert!(scene.overlaps(15.0, 25.0));
        assert!(scene.overlaps(5.0, 10.0));
        assert!(!scene.overlaps(20.5, 30.0));
    }
}
