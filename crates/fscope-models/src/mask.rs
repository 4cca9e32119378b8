//! Persisted segmentation mask artifacts.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A run-length encoded segmentation mask for one detected object.
///
/// `rle` is a comma-separated sequence of run lengths alternating
/// background/foreground, starting with the background run (which may be
/// `0`). This exact string format is a compatibility surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MaskArtifact {
    /// Reference to the detection or track this mask belongs to
    pub detection_ref: String,

    /// Class of the segmented object
    #[serde(rename = "class")]
    pub class_label: String,

    /// Run-length encoded mask
    pub rle: String,

    /// Foreground pixel count; must equal the decoded foreground area
    pub area_pixels: u64,

    pub width: u32,
    pub height: u32,
}
