//! Pure analysis components of the FrameScope pipeline.
//!
//! This crate provides:
//! - Frame sampling (which frame indices to analyze, at which timestamps)
//! - Detection verification against semantic product lists
//! - Trajectory aggregation (IoU tracker + centroid fallback)
//! - Timeline building and aggregate statistics
//!
//! Everything here is deterministic and side-effect free; collaborator
//! I/O lives in `fscope-client` and orchestration in `fscope-worker`.

pub mod sampler;
pub mod timeline;
pub mod tracker;
pub mod verifier;

pub use sampler::{sample, SampledFrame, SamplerError, DEFAULT_STRIDE};
pub use timeline::{build_timeline, TimelineSummary};
pub use tracker::{
    build_tracker, track_statistics, CentroidTracker, IouTracker, TrackStatistics, Tracker,
    TrackerConfig, TrackerMode,
};
pub use verifier::{verify, RejectedDetection, VerificationReport, VerifierError};
