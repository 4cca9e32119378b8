//! Transient decoded frames.

/// A decoded video frame handed to the detector/segmenter.
///
/// Frames are produced by the sampler + video store, consumed read-only by
/// collaborators, and discarded after each stage; they are never persisted
/// on the job record, so this type carries no serde derives.
#[derive(Debug, Clone)]
pub struct Frame {
    pub index: u64,
    /// Seconds from video start (`index / fps`)
    pub timestamp_seconds: f64,
    /// Raw pixel buffer as returned by the video store
    pub pixel_data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}
