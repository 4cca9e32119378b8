//! Progress events via Redis Pub/Sub.
//!
//! Stage transitions and progress updates are published per job so an
//! external interface layer can stream them to clients instead of
//! polling. The core itself never depends on a subscriber being present.

use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use tracing::debug;

use fscope_models::{Job, JobId, JobStatus};

use crate::error::StoreResult;

/// Progress event published to Redis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub stage_name: String,
    /// Progress (0-100)
    pub progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProgressEvent {
    /// Snapshot a job into an event.
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id.clone(),
            status: job.status,
            stage_name: job.stage_name.clone(),
            progress: job.progress,
            message: job.error.as_ref().map(|e| e.message.clone()),
        }
    }
}

/// Channel for publishing/subscribing to progress events.
#[derive(Clone)]
pub struct ProgressChannel {
    client: redis::Client,
}

impl ProgressChannel {
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Get the channel name for a job.
    pub fn channel_name(job_id: &JobId) -> String {
        format!("fscope:progress:{job_id}")
    }

    /// Publish a progress event.
    pub async fn publish(&self, event: &ProgressEvent) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let channel = Self::channel_name(&event.job_id);
        let payload = serde_json::to_string(event)?;

        debug!(%channel, progress = event.progress, "publishing progress event");
        conn.publish::<_, _, ()>(channel, payload).await?;

        Ok(())
    }

    /// Publish the current state of a job.
    pub async fn publish_job(&self, job: &Job) -> StoreResult<()> {
        self.publish(&ProgressEvent::from_job(job)).await
    }

    /// Subscribe to progress events for a job.
    /// Returns a pinned stream that can be polled with `.next()`.
    pub async fn subscribe(
        &self,
        job_id: &JobId,
    ) -> StoreResult<std::pin::Pin<Box<dyn futures_util::Stream<Item = ProgressEvent> + Send>>>
    {
        use futures_util::StreamExt;

        let mut pubsub = self.client.get_async_pubsub().await?;
        let channel = Self::channel_name(job_id);

        pubsub.subscribe(&channel).await?;

        let stream = pubsub.into_on_message().filter_map(|msg| async move {
            let payload: String = msg.get_payload().ok()?;
            serde_json::from_str(&payload).ok()
        });

        Ok(Box::pin(stream))
    }
}
