//! Frame sampling.
//!
//! Selects which frame indices to analyze at which decimation rate and
//! maps frame indices to timestamps. Pure and deterministic: the same
//! inputs always produce the same sampled list, which is what makes test
//! fixtures reproducible.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default decimation: process every 5th frame.
pub const DEFAULT_STRIDE: u64 = 5;

/// A frame selected for analysis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampledFrame {
    pub index: u64,
    /// `index / fps`
    pub timestamp_seconds: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum SamplerError {
    #[error("stride must be >= 1, got {0}")]
    InvalidStride(u64),

    #[error("fps must be positive, got {0}")]
    InvalidFps(f64),
}

/// Sample frame indices `0, stride, 2*stride, ...` below `total_frames`.
///
/// Indices are strictly increasing and never reach `total_frames`;
/// `stride = 1` selects every frame.
pub fn sample(total_frames: u64, fps: f64, stride: u64) -> Result<Vec<SampledFrame>, SamplerError> {
    if stride < 1 {
        return Err(SamplerError::InvalidStride(stride));
    }
    if !(fps > 0.0) {
        return Err(SamplerError::InvalidFps(fps));
    }

    Ok((0..total_frames)
        .step_by(stride as usize)
        .map(|index| SampledFrame {
            index,
            timestamp_seconds: index as f64 / fps,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stride_one_selects_every_frame() {
        let frames = sample(4, 30.0, 1).unwrap();
        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_default_stride() {
        let frames = sample(12, 30.0, DEFAULT_STRIDE).unwrap();
        let indices: Vec<u64> = frames.iter().map(|f| f.index).collect();
        assert_eq!(indices, vec![0, 5, 10]);
    }

    #[test]
    fn test_indices_stay_below_total_and_increase() {
        for stride in 1..10 {
            for total in [0u64, 1, 7, 100] {
                let frames = sample(total, 24.0, stride).unwrap();
                assert!(frames.iter().all(|f| f.index < total));
                assert!(frames.windows(2).all(|w| w[0].index < w[1].index));
            }
        }
    }

    #[test]
    fn test_timestamp_mapping() {
        let frames = sample(100, 25.0, 10).unwrap();
        assert_eq!(frames[1].index, 10);
        assert!((frames[1].timestamp_seconds - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_zero_stride_rejected() {
        assert_eq!(sample(10, 30.0, 0), Err(SamplerError::InvalidStride(0)));
    }

    #[test]
    fn test_bad_fps_rejected() {
        assert!(sample(10, 0.0, 1).is_err());
        assert!(sample(10, -30.0, 1).is_err());
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(sample(150, 30.0, 5).unwrap(), sample(150, 30.0, 5).unwrap());
    }
}
