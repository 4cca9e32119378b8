//! Trajectory aggregation.
//!
//! Greedy online multi-object tracking over the time-ordered sampled
//! detection stream. Two implementations of one [`Tracker`] interface:
//! the primary IoU tracker with gap-scaled matching, and a
//! nearest-centroid fallback for when detection confidences are unusable.
//! Both produce the same `Track` shape; only an internal quality flag
//! differs.

use tracing::debug;

use fscope_models::{format_track_id, Detection, Track, TrackPoint, TrackQuality};

/// Tracker selection and tuning.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub mode: TrackerMode,
    /// Frame rate of the source video; maps frame indices to timestamps
    pub fps: f64,
    /// Base IoU acceptance threshold for a one-step gap
    pub match_threshold: f64,
    /// Relative threshold growth per additional elapsed sampled step
    pub gap_growth: f64,
    /// Sampled steps a track may go unmatched before it is closed
    pub track_buffer: u64,
    /// Max center distance for the centroid fallback, in pixels
    pub max_centroid_distance: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            mode: TrackerMode::Auto,
            fps: 30.0,
            match_threshold: 0.3,
            gap_growth: 0.15,
            track_buffer: 30,
            max_centroid_distance: 50.0,
        }
    }
}

/// Which tracker implementation to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackerMode {
    /// Pick based on input quality: IoU when confidences are usable,
    /// centroid fallback otherwise
    #[default]
    Auto,
    Iou,
    Centroid,
}

/// Online tracker over the sampled detection stream.
///
/// `observe` must be called in increasing frame order; each call is one
/// sampled step.
pub trait Tracker: Send {
    fn observe(&mut self, frame_index: u64, detections: &[Detection]);

    /// Finish tracking and return every track, open or closed.
    fn into_tracks(self: Box<Self>) -> Vec<Track>;
}

/// Select a tracker for the given detection stream.
///
/// In `Auto` mode the IoU tracker is used unless some detection carries an
/// unusable confidence (non-finite or non-positive), in which case the
/// centroid fallback takes over.
pub fn build_tracker<'a, I>(config: &TrackerConfig, detections: I) -> Box<dyn Tracker>
where
    I: IntoIterator<Item = &'a Detection>,
{
    let mode = match config.mode {
        TrackerMode::Iou => TrackerMode::Iou,
        TrackerMode::Centroid => TrackerMode::Centroid,
        TrackerMode::Auto => {
            let degraded = detections
                .into_iter()
                .any(|d| !d.confidence.is_finite() || d.confidence <= 0.0);
            if degraded {
                debug!("detection confidences unusable, using centroid fallback tracker");
                TrackerMode::Centroid
            } else {
                TrackerMode::Iou
            }
        }
    };

    match mode {
        TrackerMode::Centroid => Box::new(CentroidTracker::new(config.clone())),
        _ => Box::new(IouTracker::new(config.clone())),
    }
}

/// Internal per-track state shared by both implementations.
#[derive(Debug)]
struct ActiveTrack {
    seq: u64,
    class_label: String,
    last_bbox: fscope_models::BBox,
    /// Sampled step of the last update
    last_step: u64,
    points: Vec<TrackPoint>,
    confidence_sum: f64,
    closed: bool,
}

impl ActiveTrack {
    fn center(&self) -> (f64, f64) {
        self.last_bbox.center()
    }
}

/// Bookkeeping common to both trackers: id assignment, closing stale
/// tracks, and folding state into the output shape.
#[derive(Debug)]
struct TrackBook {
    tracks: Vec<ActiveTrack>,
    next_seq: u64,
    fps: f64,
    track_buffer: u64,
}

impl TrackBook {
    fn new(fps: f64, track_buffer: u64) -> Self {
        Self {
            tracks: Vec::new(),
            next_seq: 1,
            fps,
            track_buffer,
        }
    }

    /// Close tracks whose gap exceeded the buffer. Closed tracks are never
    /// reopened.
    fn close_stale(&mut self, step: u64) {
        for track in &mut self.tracks {
            if !track.closed && step.saturating_sub(track.last_step) > self.track_buffer {
                track.closed = true;
            }
        }
    }

    fn append(&mut self, slot: usize, step: u64, frame_index: u64, detection: &Detection) {
        let track = &mut self.tracks[slot];
        track.points.push(TrackPoint {
            frame_index,
            timestamp: frame_index as f64 / self.fps,
            bbox: detection.bbox,
            confidence: detection.confidence,
        });
        track.confidence_sum += detection.confidence;
        track.last_bbox = detection.bbox;
        track.last_step = step;
    }

    fn spawn(&mut self, step: u64, frame_index: u64, detection: &Detection) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.tracks.push(ActiveTrack {
            seq,
            class_label: detection.class_label.clone(),
            last_bbox: detection.bbox,
            last_step: step,
            points: vec![TrackPoint {
                frame_index,
                timestamp: frame_index as f64 / self.fps,
                bbox: detection.bbox,
                confidence: detection.confidence,
            }],
            confidence_sum: detection.confidence,
            closed: false,
        });
    }

    fn into_tracks(self, quality: TrackQuality) -> Vec<Track> {
        self.tracks
            .into_iter()
            .map(|t| {
                let start_frame = t.points.first().map(|p| p.frame_index).unwrap_or(0);
                let end_frame = t.points.last().map(|p| p.frame_index).unwrap_or(start_frame);
                let avg_confidence = if t.points.is_empty() {
                    0.0
                } else {
                    t.confidence_sum / t.points.len() as f64
                };
                Track {
                    track_id: format_track_id(t.seq),
                    class_label: t.class_label,
                    start_frame,
                    end_frame,
                    duration_frames: end_frame - start_frame,
                    member_frames: t.points,
                    avg_confidence,
                    closed: t.closed,
                    quality,
                }
            })
            .collect()
    }
}

/// Primary tracker: greedy same-class IoU matching with gap-scaled
/// acceptance. The longer a track has gone unmatched, the more overlap a
/// detection needs to claim it, modeling motion uncertainty across
/// skipped sampled frames.
pub struct IouTracker {
    config: TrackerConfig,
    book: TrackBook,
    step: u64,
}

impl IouTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let book = TrackBook::new(config.fps, config.track_buffer);
        Self {
            config,
            book,
            step: 0,
        }
    }

    fn required_iou(&self, gap: u64) -> f64 {
        self.config.match_threshold * (1.0 + self.config.gap_growth * gap.saturating_sub(1) as f64)
    }
}

impl Tracker for IouTracker {
    fn observe(&mut self, frame_index: u64, detections: &[Detection]) {
        self.step += 1;
        self.book.close_stale(self.step);

        // Score every open same-class (track, detection) pair.
        let mut candidates: Vec<(f64, usize, usize)> = Vec::new();
        for (slot, track) in self.book.tracks.iter().enumerate() {
            if track.closed {
                continue;
            }
            let gap = self.step - track.last_step;
            let required = self.required_iou(gap);
            for (det_idx, detection) in detections.iter().enumerate() {
                if detection.class_label != track.class_label {
                    continue;
                }
                let iou = track.last_bbox.iou(&detection.bbox);
                if iou >= required {
                    candidates.push((iou, slot, det_idx));
                }
            }
        }

        // Greedy assignment in descending score order, each track and each
        // detection used at most once per frame.
        candidates.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

        let mut track_used = vec![false; self.book.tracks.len()];
        let mut det_used = vec![false; detections.len()];
        for (_score, slot, det_idx) in candidates {
            if track_used[slot] || det_used[det_idx] {
                continue;
            }
            track_used[slot] = true;
            det_used[det_idx] = true;
            self.book.append(slot, self.step, frame_index, &detections[det_idx]);
        }

        // Rejected or unmatched detections become new tracks.
        for (det_idx, detection) in detections.iter().enumerate() {
            if !det_used[det_idx] {
                self.book.spawn(self.step, frame_index, detection);
            }
        }
    }

    fn into_tracks(self: Box<Self>) -> Vec<Track> {
        self.book.into_tracks(TrackQuality::Primary)
    }
}

/// Fallback tracker: nearest open same-class centroid within a fixed
/// pixel radius. Lower fidelity, same output shape.
pub struct CentroidTracker {
    config: TrackerConfig,
    book: TrackBook,
    step: u64,
}

impl CentroidTracker {
    pub fn new(config: TrackerConfig) -> Self {
        let book = TrackBook::new(config.fps, config.track_buffer);
        Self {
            config,
            book,
            step: 0,
        }
    }
}

impl Tracker for CentroidTracker {
    fn observe(&mut self, frame_index: u64, detections: &[Detection]) {
        self.step += 1;
        self.book.close_stale(self.step);

        let mut track_used = vec![false; self.book.tracks.len()];

        for detection in detections {
            let (cx, cy) = detection.bbox.center();

            let mut best: Option<(usize, f64)> = None;
            for (slot, track) in self.book.tracks.iter().enumerate() {
                if track.closed || track_used[slot] || track.class_label != detection.class_label {
                    continue;
                }
                let (tx, ty) = track.center();
                let distance = ((cx - tx).powi(2) + (cy - ty).powi(2)).sqrt();
                if distance < self.config.max_centroid_distance
                    && best.map(|(_, d)| distance < d).unwrap_or(true)
                {
                    best = Some((slot, distance));
                }
            }

            match best {
                Some((slot, _)) => {
                    track_used[slot] = true;
                    self.book.append(slot, self.step, frame_index, detection);
                }
                None => self.book.spawn(self.step, frame_index, detection),
            }
        }
    }

    fn into_tracks(self: Box<Self>) -> Vec<Track> {
        self.book.into_tracks(TrackQuality::Fallback)
    }
}

/// Summary statistics over a set of tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackStatistics {
    pub total_tracks: u64,
    pub average_duration_frames: f64,
    pub average_duration_seconds: f64,
    pub average_confidence: f64,
    pub min_duration_frames: u64,
    pub max_duration_frames: u64,
}

/// Compute summary statistics for a completed tracking pass.
pub fn track_statistics(tracks: &[Track], fps: f64) -> TrackStatistics {
    if tracks.is_empty() {
        return TrackStatistics::default();
    }

    let durations: Vec<u64> = tracks.iter().map(|t| t.duration_frames).collect();
    let n = tracks.len() as f64;

    TrackStatistics {
        total_tracks: tracks.len() as u64,
        average_duration_frames: durations.iter().sum::<u64>() as f64 / n,
        average_duration_seconds: tracks.iter().map(|t| t.duration_seconds(fps)).sum::<f64>() / n,
        average_confidence: tracks.iter().map(|t| t.avg_confidence).sum::<f64>() / n,
        min_duration_frames: durations.iter().copied().min().unwrap_or(0),
        max_duration_frames: durations.iter().copied().max().unwrap_or(0),
    }
}

/// Drop tracks observed in fewer than `min_frames` member frames.
pub fn filter_tracks_by_duration(tracks: Vec<Track>, min_frames: usize) -> Vec<Track> {
    tracks
        .into_iter()
        .filter(|t| t.num_frames_tracked() >= min_frames)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use fscope_models::BBox;

    fn det(frame: u64, label: &str, x: f64, confidence: f64) -> Detection {
        Detection::new(frame, label, confidence, BBox::new(x, 100.0, 60.0, 60.0))
    }

    fn run_iou(frames: &[(u64, Vec<Detection>)]) -> Vec<Track> {
        let mut tracker: Box<dyn Tracker> = Box::new(IouTracker::new(TrackerConfig {
            fps: 30.0,
            track_buffer: 3,
            ..TrackerConfig::default()
        }));
        for (frame_index, detections) in frames {
            tracker.observe(*frame_index, detections);
        }
        tracker.into_tracks()
    }

    #[test]
    fn test_slow_moving_object_yields_one_track() {
        let frames: Vec<(u64, Vec<Detection>)> = (0..6)
            .map(|i| (i * 5, vec![det(i * 5, "bowl", 100.0 + i as f64 * 3.0, 0.9)]))
            .collect();

        let tracks = run_iou(&frames);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, "track_0001");
        assert_eq!(tracks[0].start_frame, 0);
        assert_eq!(tracks[0].end_frame, 25);
        assert_eq!(tracks[0].duration_frames, 25);
        assert_eq!(tracks[0].num_frames_tracked(), 6);
        assert!((tracks[0].avg_confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn test_member_frames_strictly_increasing() {
        let frames: Vec<(u64, Vec<Detection>)> = (0..10)
            .map(|i| (i * 5, vec![det(i * 5, "bowl", 100.0, 0.9)]))
            .collect();
        let tracks = run_iou(&frames);
        let indices: Vec<u64> = tracks[0].member_frames.iter().map(|p| p.frame_index).collect();
        assert!(indices.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_one_shot_detection_closes_into_single_frame_track() {
        let mut frames = vec![(0u64, vec![det(0, "cup", 500.0, 0.8)])];
        // The cup never reappears; keep observing empty frames past the buffer.
        for i in 1..6u64 {
            frames.push((i * 5, Vec::new()));
        }

        let tracks = run_iou(&frames);
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].start_frame, 0);
        assert_eq!(tracks[0].end_frame, 0);
        assert_eq!(tracks[0].duration_frames, 0);
        assert!(tracks[0].closed);
    }

    #[test]
    fn test_different_classes_never_share_a_track() {
        let frames = vec![
            (0u64, vec![det(0, "bowl", 100.0, 0.9)]),
            (5u64, vec![det(5, "cup", 100.0, 0.9)]),
        ];
        let tracks = run_iou(&frames);
        assert_eq!(tracks.len(), 2);
    }

    #[test]
    fn test_distant_detection_starts_new_track() {
        let frames = vec![
            (0u64, vec![det(0, "bowl", 100.0, 0.9)]),
            (5u64, vec![det(5, "bowl", 900.0, 0.9)]),
        ];
        let tracks = run_iou(&frames);
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[1].track_id, "track_0002");
    }

    #[test]
    fn test_gap_requires_higher_overlap() {
        let tracker = IouTracker::new(TrackerConfig::default());
        let base = tracker.required_iou(1);
        assert!(tracker.required_iou(3) > base);
        assert!((base - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_closed_track_never_reopens() {
        let mut frames = vec![(0u64, vec![det(0, "bowl", 100.0, 0.9)])];
        for i in 1..6u64 {
            frames.push((i * 5, Vec::new()));
        }
        // Same position again, long after the buffer expired.
        frames.push((30, vec![det(30, "bowl", 100.0, 0.9)]));

        let tracks = run_iou(&frames);
        assert_eq!(tracks.len(), 2);
        assert!(tracks[0].closed);
        assert!(!tracks[1].closed);
    }

    #[test]
    fn test_greedy_assignment_is_one_to_one() {
        // Two overlapping detections, one track: only one may claim it.
        let frames = vec![
            (0u64, vec![det(0, "bowl", 100.0, 0.9)]),
            (
                5u64,
                vec![det(5, "bowl", 102.0, 0.9), det(5, "bowl", 104.0, 0.8)],
            ),
        ];
        let tracks = run_iou(&frames);
        assert_eq!(tracks.len(), 2);
        let tracked: usize = tracks.iter().map(|t| t.num_frames_tracked()).sum();
        assert_eq!(tracked, 3);
    }

    #[test]
    fn test_centroid_fallback_same_shape() {
        let mut tracker: Box<dyn Tracker> =
            Box::new(CentroidTracker::new(TrackerConfig::default()));
        for i in 0..4u64 {
            tracker.observe(i * 5, &[det(i * 5, "bowl", 100.0 + i as f64 * 10.0, 0.0)]);
        }
        let tracks = tracker.into_tracks();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].track_id, "track_0001");
        assert_eq!(tracks[0].quality, TrackQuality::Fallback);
        assert_eq!(tracks[0].num_frames_tracked(), 4);
    }

    #[test]
    fn test_auto_mode_selects_fallback_on_missing_confidence() {
        let config = TrackerConfig::default();
        let degraded = vec![det(0, "bowl", 100.0, 0.0)];
        let healthy = vec![det(0, "bowl", 100.0, 0.9)];

        let tracks = {
            let mut t = build_tracker(&config, degraded.iter());
            t.observe(0, &degraded);
            t.into_tracks()
        };
        assert_eq!(tracks[0].quality, TrackQuality::Fallback);

        let tracks = {
            let mut t = build_tracker(&config, healthy.iter());
            t.observe(0, &healthy);
            t.into_tracks()
        };
        assert_eq!(tracks[0].quality, TrackQuality::Primary);
    }

    #[test]
    fn test_track_statistics() {
        let frames: Vec<(u64, Vec<Detection>)> = (0..3)
            .map(|i| (i * 5, vec![det(i * 5, "bowl", 100.0, 0.6)]))
            .collect();
        let tracks = run_iou(&frames);
        let stats = track_statistics(&tracks, 30.0);
        assert_eq!(stats.total_tracks, 1);
        assert_eq!(stats.max_duration_frames, 10);
        assert!((stats.average_confidence - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_filter_by_duration() {
        let frames = vec![
            (0u64, vec![det(0, "bowl", 100.0, 0.9), det(0, "cup", 500.0, 0.9)]),
            (5u64, vec![det(5, "bowl", 100.0, 0.9)]),
        ];
        let tracks = run_iou(&frames);
        let kept = filter_tracks_by_duration(tracks, 2);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].class_label, "bowl");
    }
}
