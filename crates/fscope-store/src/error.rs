//! Store error types.

use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("video not found: {0}")]
    VideoNotFound(String),

    #[error("frame {index} out of range for {video_ref} ({frame_count} frames)")]
    FrameOutOfRange {
        video_ref: String,
        index: u64,
        frame_count: u64,
    },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
