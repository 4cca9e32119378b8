//! Timeline building.
//!
//! Read-side merge of semantic scenes, the verification report and the
//! track set into per-scene timeline entries plus aggregate statistics.
//! No side effects; recomputing from the same inputs gives the same
//! output.

use std::collections::BTreeSet;

use fscope_models::{
    AnalysisStatistics, SemanticAnalysis, TimelineEntry, Track,
};

use crate::verifier::VerificationReport;

/// Output of a timeline build.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimelineSummary {
    pub entries: Vec<TimelineEntry>,
    pub statistics: AnalysisStatistics,
}

/// Merge stage outputs into a chronological summary.
///
/// A product appears on a scene only when it was verified by at least one
/// detection *and* its seen-range overlaps the scene's time range. With no
/// semantic analysis there are no entries, but statistics are still
/// computed from detections and tracks.
pub fn build_timeline(
    semantic: Option<&SemanticAnalysis>,
    verification: &VerificationReport,
    tracks: &[Track],
    total_sampled_frames: u64,
    fps: f64,
) -> TimelineSummary {
    let entries = semantic
        .map(|analysis| scene_entries(analysis, verification, fps))
        .unwrap_or_default();

    TimelineSummary {
        entries,
        statistics: statistics(verification, tracks, total_sampled_frames),
    }
}

fn scene_entries(
    analysis: &SemanticAnalysis,
    verification: &VerificationReport,
    fps: f64,
) -> Vec<TimelineEntry> {
    analysis
        .scenes
        .iter()
        .enumerate()
        .map(|(scene_index, scene)| {
            let verified_products: BTreeSet<String> = analysis
                .products
                .iter()
                .filter(|p| verification.verified_product_names.contains(&p.name))
                .filter(|p| scene.overlaps(p.first_seen_ts, p.last_seen_ts))
                .map(|p| p.name.clone())
                .collect();

            TimelineEntry {
                scene_index: scene_index as u32,
                frame_range: (
                    (scene.start_seconds * fps).floor() as u64,
                    (scene.end_seconds * fps).floor() as u64,
                ),
                description: scene.description.clone(),
                verified_products,
            }
        })
        .collect()
}

fn statistics(
    verification: &VerificationReport,
    tracks: &[Track],
    total_sampled_frames: u64,
) -> AnalysisStatistics {
    let all_confidences: Vec<f64> = verification
        .verified
        .values()
        .flatten()
        .map(|v| v.detection.confidence)
        .collect();

    let average_confidence = if all_confidences.is_empty() {
        0.0
    } else {
        all_confidences.iter().sum::<f64>() / all_confidences.len() as f64
    };

    AnalysisStatistics {
        total_tracks: tracks.len() as u64,
        total_detections: all_confidences.len() as u64,
        frames_with_detections: verification
            .verified
            .values()
            .filter(|dets| !dets.is_empty())
            .count() as u64,
        total_sampled_frames,
        average_confidence,
        class_distribution: verification.class_distribution.clone(),
    }
}
