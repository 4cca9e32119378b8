//! Job record persistence.
//!
//! The store replaces process-global job maps: records are read and
//! written whole (atomic at the single-record level), so status pollers
//! never observe a half-updated job and the orchestrator survives process
//! restarts when backed by Redis.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::debug;

use fscope_models::{AnalysisResult, Job, JobId};

use crate::error::StoreResult;

/// Key-value persistence for jobs and their result payloads.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist the full job record, replacing any previous snapshot.
    async fn put(&self, job: &Job) -> StoreResult<()>;

    /// Fetch the latest persisted snapshot.
    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>>;

    /// Persist the final result payload of a completed job.
    async fn put_result(&self, id: &JobId, result: &AnalysisResult) -> StoreResult<()>;

    async fn get_result(&self, id: &JobId) -> StoreResult<Option<AnalysisResult>>;
}

/// In-memory job store for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<JobId, Job>>,
    results: RwLock<HashMap<JobId, AnalysisResult>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn put(&self, job: &Job) -> StoreResult<()> {
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        Ok(self.jobs.read().await.get(id).cloned())
    }

    async fn put_result(&self, id: &JobId, result: &AnalysisResult) -> StoreResult<()> {
        self.results.write().await.insert(id.clone(), result.clone());
        Ok(())
    }

    async fn get_result(&self, id: &JobId) -> StoreResult<Option<AnalysisResult>> {
        Ok(self.results.read().await.get(id).cloned())
    }
}

/// Redis-backed job store.
///
/// Records are serialized whole into `fscope:job:{id}` /
/// `fscope:result:{id}` keys; a single SET per update keeps reads atomic.
pub struct RedisJobStore {
    client: redis::Client,
}

impl RedisJobStore {
    pub fn new(redis_url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self { client })
    }

    /// Create from the `REDIS_URL` environment variable.
    pub fn from_env() -> StoreResult<Self> {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
        Self::new(&redis_url)
    }

    fn job_key(id: &JobId) -> String {
        format!("fscope:job:{id}")
    }

    fn result_key(id: &JobId) -> String {
        format!("fscope:result:{id}")
    }
}

#[async_trait]
impl JobStore for RedisJobStore {
    async fn put(&self, job: &Job) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(job)?;
        conn.set::<_, _, ()>(Self::job_key(&job.id), payload).await?;
        debug!(job_id = %job.id, status = %job.status, "persisted job");
        Ok(())
    }

    async fn get(&self, id: &JobId) -> StoreResult<Option<Job>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::job_key(id)).await?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn put_result(&self, id: &JobId, result: &AnalysisResult) -> StoreResult<()> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload = serde_json::to_string(result)?;
        conn.set::<_, _, ()>(Self::result_key(id), payload).await?;
        Ok(())
    }

    async fn get_result(&self, id: &JobId) -> StoreResult<Option<AnalysisResult>> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::result_key(id)).await?;
        match payload {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = MemoryJobStore::new();
        let job = Job::new("user1", "videos/a.mp4");

        store.put(&job).await.unwrap();
        let loaded = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, job.id);
        assert_eq!(loaded.status, job.status);
    }

    #[tokio::test]
    async fn test_memory_store_unknown_id() {
        let store = MemoryJobStore::new();
        assert!(store.get(&JobId::new()).await.unwrap().is_none());
        assert!(store.get_result(&JobId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces_whole_record() {
        let store = MemoryJobStore::new();
        let mut job = Job::new("user1", "videos/a.mp4");
        store.put(&job).await.unwrap();

        job.enter_stage(fscope_models::JobStatus::Detecting);
        job.complete_stage();
        store.put(&job).await.unwrap();

        let loaded = store.get(&job.id).await.unwrap().unwrap();
        assert_eq!(loaded.progress, 40);
        assert_eq!(loaded.status, fscope_models::JobStatus::Detecting);
    }
}
