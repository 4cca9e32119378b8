//! Job executor.
//!
//! Bounded pool driving submitted jobs to completion. Concurrency is
//! capped by a semaphore so a burst of submissions cannot overwhelm the
//! shared downstream collaborators; shutdown is graceful and waits for
//! in-flight jobs.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch, Mutex, Semaphore};
use tracing::{error, info, warn};

use fscope_models::JobId;

use crate::error::{WorkerError, WorkerResult};
use crate::orchestrator::JobOrchestrator;

/// Executes jobs from an in-process intake channel.
pub struct JobExecutor {
    orchestrator: Arc<JobOrchestrator>,
    max_concurrent_jobs: usize,
    job_semaphore: Arc<Semaphore>,
    intake_tx: mpsc::UnboundedSender<JobId>,
    intake_rx: Mutex<Option<mpsc::UnboundedReceiver<JobId>>>,
    shutdown: watch::Sender<bool>,
}

impl JobExecutor {
    pub fn new(orchestrator: Arc<JobOrchestrator>, max_concurrent_jobs: usize) -> Self {
        let (intake_tx, intake_rx) = mpsc::unbounded_channel();
        let (shutdown, _) = watch::channel(false);

        Self {
            orchestrator,
            max_concurrent_jobs,
            job_semaphore: Arc::new(Semaphore::new(max_concurrent_jobs)),
            intake_tx,
            intake_rx: Mutex::new(Some(intake_rx)),
            shutdown,
        }
    }

    /// Submit a job and queue it for execution.
    pub async fn submit(
        &self,
        owner_id: impl Into<String>,
        video_ref: impl Into<String>,
    ) -> WorkerResult<JobId> {
        let id = self.orchestrator.submit(owner_id, video_ref).await?;
        self.intake_tx
            .send(id.clone())
            .map_err(|_| WorkerError::ExecutorStopped)?;
        Ok(id)
    }

    /// Run the executor until shutdown is signalled.
    pub async fn run(&self) -> WorkerResult<()> {
        let mut intake = self
            .intake_rx
            .lock()
            .await
            .take()
            .ok_or(WorkerError::ExecutorStopped)?;

        info!(
            max_concurrent_jobs = self.max_concurrent_jobs,
            "starting job executor"
        );

        let mut shutdown_rx = self.shutdown.subscribe();

        loop {
            tokio::select! {
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("shutdown signal received, stopping executor");
                        break;
                    }
                }
                maybe_id = intake.recv() => {
                    let Some(id) = maybe_id else { break };

                    let permit = self
                        .job_semaphore
                        .clone()
                        .acquire_owned()
                        .await
                        .map_err(|_| WorkerError::ExecutorStopped)?;
                    let orchestrator = Arc::clone(&self.orchestrator);

                    tokio::spawn(async move {
                        let _permit = permit;
                        match orchestrator.run_to_completion(&id).await {
                            Ok(job) => {
                                info!(job_id = %id, status = %job.status, "job finished");
                            }
                            Err(e) => {
                                // Stage failures are recorded on the job;
                                // reaching here means infrastructure broke.
                                error!(job_id = %id, "job execution aborted: {e}");
                            }
                        }
                    });
                }
            }
        }

        info!("waiting for in-flight jobs to complete");
        self.wait_for_jobs().await;
        info!("job executor stopped");
        Ok(())
    }

    /// Signal shutdown.
    pub fn shutdown(&self) {
        if self.shutdown.send(true).is_err() {
            warn!("shutdown signalled with no running executor");
        }
    }

    /// Wait for all in-flight jobs to release their permits.
    async fn wait_for_jobs(&self) {
        loop {
            if self.job_semaphore.available_permits() == self.max_concurrent_jobs {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
