//! Worker error types.

use thiserror::Error;

use fscope_client::ClientError;
use fscope_models::{FailureKind, JobId};
use fscope_store::StoreError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("job not found: {0}")]
    NotFound(JobId),

    #[error("job not ready: {0}")]
    NotReady(JobId),

    #[error("collaborator failed after {attempts} attempts: {source}")]
    CollaboratorTransient {
        attempts: u32,
        #[source]
        source: ClientError,
    },

    #[error("stage failed: {0}")]
    StageFailed(String),

    #[error("job cancelled")]
    Cancelled,

    #[error("client error: {0}")]
    Client(#[from] ClientError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("executor is not running")]
    ExecutorStopped,
}

impl WorkerError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    pub fn stage_failed(msg: impl Into<String>) -> Self {
        Self::StageFailed(msg.into())
    }

    /// Map onto the failure taxonomy recorded on the job.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            WorkerError::InvalidInput(_) => FailureKind::InvalidInput,
            WorkerError::CollaboratorTransient { .. } => FailureKind::CollaboratorTransientFailure,
            WorkerError::Cancelled => FailureKind::Cancelled,
            _ => FailureKind::StageFailed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_mapping() {
        assert_eq!(
            WorkerError::invalid_input("bad ref").failure_kind(),
            FailureKind::InvalidInput
        );
        assert_eq!(WorkerError::Cancelled.failure_kind(), FailureKind::Cancelled);
        assert_eq!(
            WorkerError::stage_failed("boom").failure_kind(),
            FailureKind::StageFailed
        );
    }
}
