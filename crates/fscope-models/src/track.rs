//! Object tracks produced by the trajectory aggregator.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::detection::BBox;

/// How a track was produced. Internal quality flag only; it is skipped on
/// the wire so fallback tracks are structurally indistinguishable from
/// primary ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackQuality {
    /// IoU tracker with gap-scaled matching
    #[default]
    Primary,
    /// Nearest-centroid fallback
    Fallback,
}

/// One member frame of a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrackPoint {
    pub frame_index: u64,
    /// Seconds from video start (`frame_index / fps`)
    pub timestamp: f64,
    pub bbox: BBox,
    pub confidence: f64,
}

/// An object identity persisted across multiple sampled frames.
///
/// Member frames are strictly increasing by frame index. A closed track is
/// never reopened and never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Track {
    /// Opaque monotonic id ("track_0001", "track_0002", ...), never reused
    pub track_id: String,

    /// Detector class of every member detection
    #[serde(rename = "class")]
    pub class_label: String,

    pub start_frame: u64,
    pub end_frame: u64,
    /// `end_frame - start_frame`
    pub duration_frames: u64,

    pub member_frames: Vec<TrackPoint>,

    /// Running average of member confidences
    pub avg_confidence: f64,

    /// Whether the track is closed to further matching
    pub closed: bool,

    #[serde(skip)]
    #[schemars(skip)]
    pub quality: TrackQuality,
}

impl Track {
    /// Number of frames the object was actually observed in.
    pub fn num_frames_tracked(&self) -> usize {
        self.member_frames.len()
    }

    /// Track duration in seconds given the sampled stream's frame rate.
    pub fn duration_seconds(&self, fps: f64) -> f64 {
        if fps <= 0.0 {
            return 0.0;
        }
        self.duration_frames as f64 / fps
    }
}

/// Format a monotonic track id. Ids start at 1.
pub fn format_track_id(seq: u64) -> String {
    format!("track_{:04}", seq)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_track_id_format() {
        assert_eq!(format_track_id(1), "track_0001");
        assert_eq!(format_track_id(42), "track_0042");
        assert_eq!(format_track_id(12345), "track_12345");
    }

    #[test]
    fn test_quality_not_serialized() {
        let track = Track {
            track_id: format_track_id(1),
            class_label: "bowl".into(),
            start_frame: 0,
            end_frame: 10,
            duration_frames: 10,
            member_frames: Vec::new(),
            avg_confidence: 0.9,
            closed: true,
            quality: TrackQuality::Fallback,
        };
        let json = serde_json::to_string(&track).unwrap();
        assert!(!json.contains("quality"));
        assert!(!json.contains("fallback"));
    }
}
