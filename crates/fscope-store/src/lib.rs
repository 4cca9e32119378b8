//! Storage abstractions for the FrameScope pipeline.
//!
//! This crate provides:
//! - The `JobStore` contract (atomic per-record job + result persistence)
//!   with in-memory and Redis implementations
//! - The `VideoStore` collaborator contract with an in-memory fixture
//!   implementation
//! - A Redis pub/sub progress channel for stage/progress events

pub mod error;
pub mod job_store;
pub mod progress;
pub mod video_store;

pub use error::{StoreError, StoreResult};
pub use job_store::{JobStore, MemoryJobStore, RedisJobStore};
pub use progress::{ProgressChannel, ProgressEvent};
pub use video_store::{MemoryVideoStore, VideoStore};
