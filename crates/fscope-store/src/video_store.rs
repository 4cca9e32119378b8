//! Video store collaborator contract.
//!
//! Decoding is an external concern; the core only resolves refs to frame
//! metadata and reads individual frame buffers.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use fscope_models::VideoInfo;

use crate::error::{StoreError, StoreResult};

/// Access to already-ingested videos.
#[async_trait]
pub trait VideoStore: Send + Sync {
    /// Resolve a video ref to its metadata. Fails with `VideoNotFound`
    /// for unknown refs.
    async fn resolve(&self, video_ref: &str) -> StoreResult<VideoInfo>;

    /// Read one decoded frame as a raw RGB pixel buffer.
    async fn read_frame(&self, video_ref: &str, index: u64) -> StoreResult<Vec<u8>>;
}

/// In-memory video store.
///
/// Stands in for the decoding collaborator in single-process deployments
/// and doubles as the deterministic fixture source for tests: frame
/// buffers are synthesized as zeroed RGB planes of the registered
/// dimensions.
#[derive(Debug, Default)]
pub struct MemoryVideoStore {
    videos: RwLock<HashMap<String, VideoInfo>>,
}

impl MemoryVideoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a video under a ref.
    pub async fn insert(&self, video_ref: impl Into<String>, info: VideoInfo) {
        self.videos.write().await.insert(video_ref.into(), info);
    }
}

#[async_trait]
impl VideoStore for MemoryVideoStore {
    async fn resolve(&self, video_ref: &str) -> StoreResult<VideoInfo> {
        self.videos
            .read()
            .await
            .get(video_ref)
            .copied()
            .ok_or_else(|| StoreError::VideoNotFound(video_ref.to_string()))
    }

    async fn read_frame(&self, video_ref: &str, index: u64) -> StoreResult<Vec<u8>> {
        let info = self.resolve(video_ref).await?;
        if index >= info.frame_count {
            return Err(StoreError::FrameOutOfRange {
                video_ref: video_ref.to_string(),
                index,
                frame_count: info.frame_count,
            });
        }
        Ok(vec![0u8; (info.width as usize) * (info.height as usize) * 3])
    }
}
