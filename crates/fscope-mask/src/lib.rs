//! Run-length codec for binary segmentation masks.
//!
//! Masks are encoded as a comma-separated sequence of run lengths scanned
//! row-major, alternating background/foreground and always starting with
//! the background run (a leading `0` when the mask opens with a foreground
//! pixel). The string format is a compatibility surface: round trips are
//! bit-exact and malformed input is rejected, never truncated or padded.

use thiserror::Error;

pub type MaskResult<T> = Result<T, MaskError>;

/// Errors produced by the mask codec.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MaskError {
    #[error("corrupt mask: non-numeric run length {token:?} at position {position}")]
    NonNumericRun { token: String, position: usize },

    #[error("corrupt mask: run lengths sum to {actual}, expected {expected} ({width}x{height})")]
    LengthMismatch {
        expected: u64,
        actual: u64,
        width: u32,
        height: u32,
    },

    #[error("corrupt mask: empty RLE string for non-empty {width}x{height} mask")]
    Empty { width: u32, height: u32 },

    #[error("mask dimensions {width}x{height} do not match {len} pixels of data")]
    DimensionMismatch { width: u32, height: u32, len: usize },
}

/// A width x height binary grid stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

impl BinaryMask {
    /// Create a mask from row-major pixel data.
    pub fn from_data(width: u32, height: u32, data: Vec<bool>) -> MaskResult<Self> {
        if data.len() != (width as usize) * (height as usize) {
            return Err(MaskError::DimensionMismatch {
                width,
                height,
                len: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Create an all-background mask.
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; (width as usize) * (height as usize)],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[(y as usize) * (self.width as usize) + (x as usize)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        self.data[(y as usize) * (self.width as usize) + (x as usize)] = value;
    }

    /// Row-major pixel data.
    pub fn pixels(&self) -> &[bool] {
        &self.data
    }

    /// Number of foreground pixels.
    pub fn foreground_area(&self) -> u64 {
        self.data.iter().filter(|&&p| p).count() as u64
    }
}

/// Encode a mask as an RLE string in a single row-major pass.
pub fn encode(mask: &BinaryMask) -> String {
    let pixels = mask.pixels();
    if pixels.is_empty() {
        return String::new();
    }

    let mut runs: Vec<u64> = Vec::new();
    // Runs alternate starting with background.
    if pixels[0] {
        runs.push(0);
    }

    let mut current = pixels[0];
    let mut count: u64 = 0;
    for &p in pixels {
        if p == current {
            count += 1;
        } else {
            runs.push(count);
            current = p;
            count = 1;
        }
    }
    runs.push(count);

    runs.iter()
        .map(|r| r.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Decode an RLE string back into the exact original mask.
///
/// Fails with a `corrupt mask` error when a token is non-numeric or the
/// run lengths do not sum to `width * height`.
pub fn decode(rle: &str, width: u32, height: u32) -> MaskResult<BinaryMask> {
    let expected = (width as u64) * (height as u64);

    if rle.is_empty() {
        if expected == 0 {
            return Ok(BinaryMask::empty(width, height));
        }
        return Err(MaskError::Empty { width, height });
    }

    let runs = parse_runs(rle)?;

    let total: u64 = runs.iter().sum();
    if total != expected {
        return Err(MaskError::LengthMismatch {
            expected,
            actual: total,
            width,
            height,
        });
    }

    let mut data = Vec::with_capacity(expected as usize);
    let mut value = false;
    for run in runs {
        for _ in 0..run {
            data.push(value);
        }
        value = !value;
    }

    BinaryMask::from_data(width, height, data)
}

/// Sum the foreground run lengths of an RLE string without decoding the
/// full grid. Foreground runs are the odd-indexed runs (the background run
/// comes first).
pub fn area_pixels(rle: &str) -> MaskResult<u64> {
    if rle.is_empty() {
        return Ok(0);
    }
    let runs = parse_runs(rle)?;
    Ok(runs
        .iter()
        .enumerate()
        .filter(|(i, _)| i % 2 == 1)
        .map(|(_, r)| *r)
        .sum())
}

fn parse_runs(rle: &str) -> MaskResult<Vec<u64>> {
    rle.split(',')
        .enumerate()
        .map(|(position, token)| {
            token.trim().parse::<u64>().map_err(|_| MaskError::NonNumericRun {
                token: token.to_string(),
                position,
            })
        })
        .collect()
}
