//! Job record, status machine and failure causes.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for an analysis job.
///
/// A fresh id is minted for every submission; retries replay within the
/// same job record rather than creating siblings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job state in the pipeline.
///
/// Transitions are one-directional and no stage state is revisited:
/// `queued → sampling → detecting → [segmenting] → analyzing_semantics →
/// tracking → reconciling → completed`, with `failed` reachable from any
/// non-terminal state. `cancelling` is a cooperative mark that the next
/// `advance` turns into a terminal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is waiting for a worker
    #[default]
    Queued,
    /// Selecting frame indices to analyze
    Sampling,
    /// Running per-frame object detection
    Detecting,
    /// Running per-object segmentation (skippable)
    Segmenting,
    /// Running whole-video semantic analysis
    AnalyzingSemantics,
    /// Folding detections into object tracks
    Tracking,
    /// Cross-referencing and merging stage outputs
    Reconciling,
    /// Cancellation requested, not yet applied
    Cancelling,
    /// Job finished successfully
    Completed,
    /// Job failed; see the recorded failure cause
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Sampling => "sampling",
            JobStatus::Detecting => "detecting",
            JobStatus::Segmenting => "segmenting",
            JobStatus::AnalyzingSemantics => "analyzing_semantics",
            JobStatus::Tracking => "tracking",
            JobStatus::Reconciling => "reconciling",
            JobStatus::Cancelling => "cancelling",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (the record is immutable from here).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Progress value (0-100) reached once this stage has completed.
    ///
    /// Stage bands: sampling 5, detecting 35, segmenting 20, semantics 20,
    /// tracking 10, reconciling 10.
    pub fn band_end(&self) -> u8 {
        match self {
            JobStatus::Queued | JobStatus::Cancelling => 0,
            JobStatus::Sampling => 5,
            JobStatus::Detecting => 40,
            JobStatus::Segmenting => 60,
            JobStatus::AnalyzingSemantics => 80,
            JobStatus::Tracking => 90,
            JobStatus::Reconciling | JobStatus::Completed => 100,
            JobStatus::Failed => 0,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Classification of a job failure cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Bad input from the caller (unresolvable video ref, malformed detection)
    InvalidInput,
    /// A collaborator kept failing transiently until the retry budget ran out
    CollaboratorTransientFailure,
    /// A local computation stage hit a programming/data error
    StageFailed,
    /// The job was cancelled cooperatively
    Cancelled,
}

/// Structured failure cause recorded on a failed job.
///
/// Only the first unrecoverable cause is kept; later errors on an
/// already-failed job never overwrite it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct JobFailure {
    pub kind: FailureKind,
    /// The stage that was executing when the failure occurred
    pub stage: String,
    pub message: String,
}

impl JobFailure {
    pub fn new(kind: FailureKind, stage: JobStatus, message: impl Into<String>) -> Self {
        Self {
            kind,
            stage: stage.as_str().to_string(),
            message: message.into(),
        }
    }
}

/// An analysis job record.
///
/// Owned by the orchestrator; read by any number of status pollers. The
/// record is always persisted whole, so readers never observe a
/// partially-mutated snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID
    pub id: JobId,

    /// User that submitted the job
    pub owner_id: String,

    /// Reference to the stored video under analysis
    pub video_ref: String,

    /// Current status
    #[serde(default)]
    pub status: JobStatus,

    /// Human-readable name of the current stage
    pub stage_name: String,

    /// Progress (0-100), monotonically non-decreasing until terminal
    #[serde(default)]
    pub progress: u8,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Failure cause (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JobFailure>,
}

impl Job {
    /// Create a new job in the queued state.
    pub fn new(owner_id: impl Into<String>, video_ref: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: JobId::new(),
            owner_id: owner_id.into(),
            video_ref: video_ref.into(),
            status: JobStatus::Queued,
            stage_name: JobStatus::Queued.as_str().to_string(),
            progress: 0,
            created_at: now,
            updated_at: now,
            error: None,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Enter a stage, keeping progress where it was.
    pub fn enter_stage(&mut self, status: JobStatus) {
        self.status = status;
        self.stage_name = status.as_str().to_string();
        self.updated_at = Utc::now();
    }

    /// Record completion of the current stage by bumping progress to its
    /// band end. Progress never moves backwards.
    pub fn complete_stage(&mut self) {
        self.progress = self.progress.max(self.status.band_end()).min(100);
        self.updated_at = Utc::now();
    }

    /// Mark the job completed.
    pub fn complete(&mut self) {
        self.status = JobStatus::Completed;
        self.stage_name = JobStatus::Completed.as_str().to_string();
        self.progress = 100;
        self.updated_at = Utc::now();
    }

    /// Mark the job failed with a cause. The first cause wins; calling this
    /// on an already-failed job is a no-op.
    pub fn fail(&mut self, cause: JobFailure) {
        if self.status == JobStatus::Failed {
            return;
        }
        self.status = JobStatus::Failed;
        self.stage_name = JobStatus::Failed.as_str().to_string();
        self.error = Some(cause);
        self.updated_at = Utc::now();
    }

    /// Request cooperative cancellation. No effect on terminal jobs.
    pub fn request_cancel(&mut self) {
        if !self.is_terminal() {
            self.status = JobStatus::Cancelling;
            self.stage_name = JobStatus::Cancelling.as_str().to_string();
            self.updated_at = Utc::now();
        }
    }
}
