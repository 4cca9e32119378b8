//! Worker configuration.

use std::time::Duration;

use fscope_analysis::TrackerConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum jobs running stages concurrently
    pub max_concurrent_jobs: usize,
    /// Analyze every Nth frame
    pub frame_stride: u64,
    /// Total attempts per transient-prone collaborator call
    pub stage_attempts: u32,
    /// Base delay for exponential retry backoff
    pub retry_base_delay: Duration,
    /// Budget for a single collaborator call before it counts as a
    /// transient failure
    pub stage_timeout: Duration,
    /// Tracker selection and tuning; fps is overridden per job from the
    /// resolved video metadata
    pub tracker: TrackerConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 4,
            frame_stride: fscope_analysis::DEFAULT_STRIDE,
            stage_attempts: 3,
            retry_base_delay: Duration::from_millis(500),
            stage_timeout: Duration::from_secs(120),
            tracker: TrackerConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_concurrent_jobs: std::env::var("FSCOPE_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.max_concurrent_jobs),
            frame_stride: std::env::var("FSCOPE_FRAME_STRIDE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.frame_stride),
            stage_attempts: std::env::var("FSCOPE_STAGE_ATTEMPTS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stage_attempts),
            retry_base_delay: Duration::from_millis(
                std::env::var("FSCOPE_RETRY_BASE_DELAY_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.retry_base_delay.as_millis() as u64),
            ),
            stage_timeout: Duration::from_secs(
                std::env::var("FSCOPE_STAGE_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(defaults.stage_timeout.as_secs()),
            ),
            tracker: defaults.tracker,
        }
    }
}
