//! Clients for the external analysis collaborators.
//!
//! The pipeline core treats the object detector, the segmenter and the
//! semantic analyzer as remote services behind narrow contracts. This
//! crate provides:
//! - The collaborator traits consumed by the orchestrator
//! - HTTP implementations with timeout and retry handling
//! - Request/response wire types

pub mod client;
pub mod contract;
pub mod error;
pub mod types;

pub use client::{ClientConfig, HttpDetector, HttpSegmenter, HttpSemanticAnalyzer};
pub use contract::{ObjectDetector, Segmenter, SemanticAnalyzer};
pub use error::{ClientError, ClientResult};
