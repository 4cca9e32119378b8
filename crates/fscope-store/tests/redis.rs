//! Redis integration tests.
//!
//! These tests require a running Redis instance.
//! Run with: `cargo test -p fscope-store --test redis -- --ignored`

use std::time::Duration;

use fscope_models::{Job, JobId, JobStatus};
use fscope_store::{JobStore, ProgressChannel, ProgressEvent, RedisJobStore};

/// Test Redis job store round trip.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_job_round_trip() {
    dotenvy::dotenv().ok();

    let store = RedisJobStore::from_env().expect("Failed to create Redis job store");

    let mut job = Job::new("test_user", "videos/integration.mp4");
    store.put(&job).await.expect("Failed to put job");

    let loaded = store
        .get(&job.id)
        .await
        .expect("Failed to get job")
        .expect("Job missing");
    assert_eq!(loaded.status, JobStatus::Queued);

    // Update whole record and read back.
    job.enter_stage(JobStatus::Detecting);
    job.complete_stage();
    store.put(&job).await.expect("Failed to update job");

    let loaded = store
        .get(&job.id)
        .await
        .expect("Failed to get job")
        .expect("Job missing");
    assert_eq!(loaded.status, JobStatus::Detecting);
    assert_eq!(loaded.progress, 40);
}

/// Test unknown ids resolve to None, not an error.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_redis_unknown_job() {
    dotenvy::dotenv().ok();

    let store = RedisJobStore::from_env().expect("Failed to create Redis job store");
    let missing = store.get(&JobId::new()).await.expect("Failed to query");
    assert!(missing.is_none());
}

/// Test progress channel pub/sub.
#[tokio::test]
#[ignore = "requires Redis"]
async fn test_progress_channel() {
    use futures_util::StreamExt;

    dotenvy::dotenv().ok();

    let redis_url =
        std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());
    let progress = ProgressChannel::new(&redis_url).expect("Failed to create progress channel");

    let job = Job::new("test_user", "videos/progress.mp4");
    let job_id = job.id.clone();

    // Subscribe in a separate task.
    let progress_clone = progress.clone();
    let subscriber = tokio::spawn(async move {
        let mut stream = progress_clone
            .subscribe(&job_id)
            .await
            .expect("Failed to subscribe");
        let mut messages: Vec<ProgressEvent> = Vec::new();

        let timeout = tokio::time::timeout(Duration::from_secs(2), async {
            while let Some(event) = stream.next().await {
                messages.push(event);
                if messages.len() >= 2 {
                    break;
                }
            }
        });

        let _ = timeout.await;
        messages
    });

    // Give the subscriber time to connect.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut updated = job.clone();
    updated.enter_stage(JobStatus::Sampling);
    progress.publish_job(&job).await.ok();
    progress.publish_job(&updated).await.ok();

    let messages = subscriber.await.expect("Subscriber task failed");
    println!("Received {} messages", messages.len());
}
