//! Job orchestration.
//!
//! The orchestrator drives a job through the stage state machine:
//! `queued → sampling → detecting → [segmenting] → analyzing_semantics →
//! tracking → reconciling → completed`, with `failed` reachable from any
//! non-terminal state. Each `advance` call performs exactly one stage,
//! persists the whole job record around it, and holds a per-job mutex so
//! at most one advance runs per job at any time.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use fscope_analysis::{build_timeline, build_tracker, sample, verify, SampledFrame};
use fscope_client::{ClientError, ObjectDetector, Segmenter, SemanticAnalyzer};
use fscope_models::{
    AnalysisResult, Detection, Frame, Job, JobFailure, JobId, JobStatus, MaskArtifact,
    SemanticAnalysis, SemanticResult, Track, VideoInfo,
};
use fscope_store::{JobStore, ProgressChannel, StoreError, VideoStore};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::retry::{retry_async, RetryConfig, RetryResult};

/// In-memory working set of a job between stages.
///
/// Holds intermediate stage outputs only; the durable state is the job
/// record and final result in the store. When the working set is lost
/// (process restart), `ensure_sampled` re-derives the deterministic parts.
#[derive(Default)]
struct JobWork {
    video: Option<VideoInfo>,
    sampled: Vec<SampledFrame>,
    detections: BTreeMap<u64, Vec<Detection>>,
    /// `None` means segmentation was skipped or degraded; the result
    /// payload then omits the mask section entirely.
    masks: Option<BTreeMap<u64, Vec<MaskArtifact>>>,
    semantic: Option<SemanticAnalysis>,
    tracks: Vec<Track>,
}

/// Decide the stage the next `advance` call should run.
///
/// A stage whose progress band was never reached is re-run (crash replay
/// within the same job record); completed stages are never revisited,
/// which is what makes `advance` idempotent for past stages and terminal
/// jobs.
fn next_stage(job: &Job, has_segmenter: bool) -> Option<JobStatus> {
    use JobStatus::*;

    match job.status {
        Queued => Some(Sampling),
        Completed | Failed | Cancelling => None,
        current if job.progress < current.band_end() => Some(current),
        Sampling => Some(Detecting),
        Detecting => Some(if has_segmenter {
            Segmenting
        } else {
            AnalyzingSemantics
        }),
        Segmenting => Some(AnalyzingSemantics),
        AnalyzingSemantics => Some(Tracking),
        Tracking => Some(Reconciling),
        Reconciling => None,
    }
}

/// Drives jobs through the analysis pipeline.
pub struct JobOrchestrator {
    config: WorkerConfig,
    store: Arc<dyn JobStore>,
    videos: Arc<dyn VideoStore>,
    detector: Arc<dyn ObjectDetector>,
    segmenter: Option<Arc<dyn Segmenter>>,
    semantic: Arc<dyn SemanticAnalyzer>,
    progress: Option<ProgressChannel>,
    /// Per-job advance mutexes
    locks: Mutex<HashMap<JobId, Arc<Mutex<()>>>>,
    /// Per-job working sets
    work: Mutex<HashMap<JobId, JobWork>>,
}

impl JobOrchestrator {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn JobStore>,
        videos: Arc<dyn VideoStore>,
        detector: Arc<dyn ObjectDetector>,
        segmenter: Option<Arc<dyn Segmenter>>,
        semantic: Arc<dyn SemanticAnalyzer>,
    ) -> Self {
        Self {
            config,
            store,
            videos,
            detector,
            segmenter,
            semantic,
            progress: None,
            locks: Mutex::new(HashMap::new()),
            work: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a progress channel; stage transitions are published to it.
    pub fn with_progress(mut self, channel: ProgressChannel) -> Self {
        self.progress = Some(channel);
        self
    }

    /// Create a job for an already-stored video.
    ///
    /// Fails with `InvalidInput` when the video ref cannot be resolved.
    /// Every call mints a fresh job id; concurrent submits share no state
    /// beyond the job store.
    pub async fn submit(
        &self,
        owner_id: impl Into<String>,
        video_ref: impl Into<String>,
    ) -> WorkerResult<JobId> {
        let video_ref = video_ref.into();
        self.videos
            .resolve(&video_ref)
            .await
            .map_err(map_resolve_error)?;

        let job = Job::new(owner_id, &video_ref);
        self.store.put(&job).await?;
        self.publish(&job).await;

        info!(job_id = %job.id, %video_ref, "job submitted");
        Ok(job.id)
    }

    /// Perform the next stage of a job.
    ///
    /// Idempotent: calling it on a terminal job, or on a job already past
    /// a stage, is a no-op for that stage. At most one advance executes
    /// per job id at any time.
    pub async fn advance(&self, id: &JobId) -> WorkerResult<()> {
        let lock = self.job_lock(id).await;
        let _guard = lock.lock().await;

        let mut job = self
            .store
            .get(id)
            .await?
            .ok_or_else(|| WorkerError::NotFound(id.clone()))?;

        if job.is_terminal() {
            debug!(job_id = %job.id, "advance on terminal job is a no-op");
            return Ok(());
        }

        if job.status == JobStatus::Cancelling {
            return self.finish_cancelled(job).await;
        }

        let Some(stage) = next_stage(&job, self.segmenter.is_some()) else {
            return Ok(());
        };

        job.enter_stage(stage);
        self.store.put(&job).await?;
        self.publish(&job).await;

        let mut work = self.take_work(id).await;
        let outcome = self.run_stage(&job, stage, &mut work).await;

        match outcome {
            Ok(()) => {
                // A cancellation mark set while the stage ran wins over
                // the stage result.
                if let Some(stored) = self.store.get(id).await? {
                    if stored.status == JobStatus::Cancelling {
                        return self.finish_cancelled(stored).await;
                    }
                }

                job.complete_stage();
                if stage == JobStatus::Reconciling {
                    job.complete();
                    info!(job_id = %job.id, "job completed");
                } else {
                    debug!(job_id = %job.id, stage = %stage, progress = job.progress, "stage complete");
                }
                // Persist the terminal record before dropping the working
                // set, so a racing advance observes the terminal state.
                self.store.put(&job).await?;
                self.publish(&job).await;
                if job.is_terminal() {
                    self.clear_work(id).await;
                } else {
                    self.put_work(id, work).await;
                }
                Ok(())
            }
            Err(err) => {
                warn!(job_id = %job.id, stage = %stage, "stage failed: {err}");
                job.fail(JobFailure::new(err.failure_kind(), stage, err.to_string()));
                self.store.put(&job).await?;
                self.publish(&job).await;
                self.clear_work(id).await;
                Err(err)
            }
        }
    }

    /// Advance a job until it reaches a terminal state.
    pub async fn run_to_completion(&self, id: &JobId) -> WorkerResult<Job> {
        loop {
            let advance_result = self.advance(id).await;
            let job = self.status(id).await?;
            if job.is_terminal() {
                return Ok(job);
            }
            // An advance error without a terminal job means infrastructure
            // trouble (e.g. the store), not a recorded job failure.
            advance_result?;
        }
    }

    /// Latest persisted job snapshot. Never blocks on in-flight stage
    /// work.
    pub async fn status(&self, id: &JobId) -> WorkerResult<Job> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| WorkerError::NotFound(id.clone()))
    }

    /// Final result payload of a completed job.
    pub async fn result(&self, id: &JobId) -> WorkerResult<AnalysisResult> {
        let job = self.status(id).await?;
        if job.status != JobStatus::Completed {
            return Err(WorkerError::NotReady(id.clone()));
        }
        self.store
            .get_result(id)
            .await?
            .ok_or_else(|| WorkerError::NotReady(id.clone()))
    }

    /// Request cooperative cancellation: the next `advance` terminates the
    /// job instead of performing stage work. In-flight collaborator calls
    /// are not interrupted.
    pub async fn cancel(&self, id: &JobId) -> WorkerResult<()> {
        let mut job = self.status(id).await?;
        if job.is_terminal() {
            return Ok(());
        }
        job.request_cancel();
        self.store.put(&job).await?;
        self.publish(&job).await;
        Ok(())
    }

    async fn finish_cancelled(&self, mut job: Job) -> WorkerResult<()> {
        let stage = job.status;
        job.fail(JobFailure::new(
            fscope_models::FailureKind::Cancelled,
            stage,
            "cancelled by request",
        ));
        self.store.put(&job).await?;
        self.publish(&job).await;
        self.clear_work(&job.id).await;
        info!(job_id = %job.id, "job cancelled");
        Ok(())
    }

    async fn run_stage(
        &self,
        job: &Job,
        stage: JobStatus,
        work: &mut JobWork,
    ) -> WorkerResult<()> {
        match stage {
            JobStatus::Sampling => self.run_sampling(job, work).await,
            JobStatus::Detecting => self.run_detection(job, work).await,
            JobStatus::Segmenting => self.run_segmentation(job, work).await,
            JobStatus::AnalyzingSemantics => self.run_semantics(job, work).await,
            JobStatus::Tracking => self.run_tracking(job, work).await,
            JobStatus::Reconciling => self.run_reconciliation(job, work).await,
            _ => Ok(()),
        }
    }

    async fn run_sampling(&self, job: &Job, work: &mut JobWork) -> WorkerResult<()> {
        let video = self.ensure_sampled(job, work).await?;
        info!(
            job_id = %job.id,
            sampled = work.sampled.len(),
            total = video.frame_count,
            stride = self.config.frame_stride,
            "sampled frames"
        );
        Ok(())
    }

    async fn run_detection(&self, job: &Job, work: &mut JobWork) -> WorkerResult<()> {
        let video = self.ensure_sampled(job, work).await?;

        let mut detections: BTreeMap<u64, Vec<Detection>> = BTreeMap::new();
        for sampled in work.sampled.clone() {
            let frame = self.load_frame(job, &video, &sampled).await?;
            let frame_detections = self
                .call_collaborator("detect", || async { self.detector.detect(&frame).await })
                .await?;
            detections.insert(sampled.index, frame_detections);
            // The frame buffer is dropped here; frames are never retained
            // past the stage that consumed them.
        }

        let total: usize = detections.values().map(Vec::len).sum();
        info!(job_id = %job.id, detections = total, "detection complete");
        work.detections = detections;
        Ok(())
    }

    async fn run_segmentation(&self, job: &Job, work: &mut JobWork) -> WorkerResult<()> {
        let Some(segmenter) = self.segmenter.clone() else {
            return Ok(());
        };
        let video = self.ensure_sampled(job, work).await?;

        let mut masks: BTreeMap<u64, Vec<MaskArtifact>> = BTreeMap::new();
        let mut degraded = false;

        'frames: for (&frame_index, frame_detections) in &work.detections {
            if frame_detections.is_empty() {
                continue;
            }
            let sampled = SampledFrame {
                index: frame_index,
                timestamp_seconds: frame_index as f64 / video.fps,
            };
            let frame = self.load_frame(job, &video, &sampled).await?;

            for (det_idx, detection) in frame_detections.iter().enumerate() {
                let outcome = self
                    .call_collaborator("segment", || async {
                        segmenter.segment(&frame, &detection.bbox).await
                    })
                    .await;

                match outcome {
                    Ok(mask) => {
                        masks.entry(frame_index).or_default().push(MaskArtifact {
                            detection_ref: format!("frame_{frame_index}_det_{det_idx}"),
                            class_label: detection.class_label.clone(),
                            rle: fscope_mask::encode(&mask),
                            area_pixels: mask.foreground_area(),
                            width: mask.width(),
                            height: mask.height(),
                        });
                    }
                    Err(WorkerError::Client(ClientError::Mask(e))) => {
                        // Corrupt mask: drop this object's mask, keep the job.
                        warn!(job_id = %job.id, frame_index, det_idx, "dropping corrupt mask: {e}");
                    }
                    Err(WorkerError::CollaboratorTransient { source, .. }) => {
                        warn!(job_id = %job.id, "segmenter unavailable, continuing without masks: {source}");
                        degraded = true;
                        break 'frames;
                    }
                    Err(e) => {
                        warn!(job_id = %job.id, frame_index, det_idx, "dropping mask: {e}");
                    }
                }
            }
        }

        work.masks = if degraded { None } else { Some(masks) };
        Ok(())
    }

    async fn run_semantics(&self, job: &Job, work: &mut JobWork) -> WorkerResult<()> {
        let outcome = self
            .call_collaborator("analyze", || async {
                self.semantic.analyze(&job.video_ref).await
            })
            .await;

        match outcome {
            Ok(analysis) => {
                info!(
                    job_id = %job.id,
                    products = analysis.products.len(),
                    scenes = analysis.scenes.len(),
                    "semantic analysis complete"
                );
                work.semantic = Some(analysis);
            }
            Err(e) => {
                // Semantics degrade gracefully: the job still completes
                // with the semantic section empty.
                warn!(job_id = %job.id, "semantic analysis unavailable, continuing without it: {e}");
                work.semantic = None;
            }
        }
        Ok(())
    }

    async fn run_tracking(&self, job: &Job, work: &mut JobWork) -> WorkerResult<()> {
        let video = self.ensure_sampled(job, work).await?;

        let mut tracker_config = self.config.tracker.clone();
        tracker_config.fps = video.fps;

        let mut tracker = build_tracker(&tracker_config, work.detections.values().flatten());
        let empty = Vec::new();
        for sampled in &work.sampled {
            let frame_detections = work.detections.get(&sampled.index).unwrap_or(&empty);
            tracker.observe(sampled.index, frame_detections);
        }

        work.tracks = tracker.into_tracks();
        info!(job_id = %job.id, tracks = work.tracks.len(), "tracking complete");
        Ok(())
    }

    async fn run_reconciliation(&self, job: &Job, work: &mut JobWork) -> WorkerResult<()> {
        let video = self.ensure_sampled(job, work).await?;

        let products = work
            .semantic
            .as_ref()
            .map(|s| s.products.clone())
            .unwrap_or_default();

        // Verification errors are data errors, never retried.
        let report = verify(&products, &work.detections)
            .map_err(|e| WorkerError::InvalidInput(e.to_string()))?;

        let summary = build_timeline(
            work.semantic.as_ref(),
            &report,
            &work.tracks,
            work.sampled.len() as u64,
            video.fps,
        );

        let result = AnalysisResult {
            detections: report.verified.clone(),
            tracks: work
                .tracks
                .iter()
                .map(|t| (t.track_id.clone(), t.clone()))
                .collect(),
            masks: work.masks.clone(),
            semantic: work.semantic.clone().map(|analysis| SemanticResult {
                analysis,
                verified_product_names: report.verified_product_names.clone(),
            }),
            timeline: summary.entries,
            statistics: summary.statistics,
        };

        self.store.put_result(&job.id, &result).await?;
        info!(
            job_id = %job.id,
            verified = report.verified_product_names.len(),
            "reconciliation complete"
        );
        Ok(())
    }

    /// Resolve the video and (re)derive the sampled frame list when the
    /// working set is missing them. The sampler is deterministic, so a
    /// replay after a lost working set selects the same frames.
    async fn ensure_sampled(&self, job: &Job, work: &mut JobWork) -> WorkerResult<VideoInfo> {
        let video = match work.video {
            Some(v) => v,
            None => {
                let v = self
                    .videos
                    .resolve(&job.video_ref)
                    .await
                    .map_err(map_resolve_error)?;
                work.video = Some(v);
                v
            }
        };

        if work.sampled.is_empty() {
            work.sampled = sample(video.frame_count, video.fps, self.config.frame_stride)
                .map_err(|e| WorkerError::InvalidInput(e.to_string()))?;
        }

        Ok(video)
    }

    async fn load_frame(
        &self,
        job: &Job,
        video: &VideoInfo,
        sampled: &SampledFrame,
    ) -> WorkerResult<Frame> {
        let pixel_data = self.videos.read_frame(&job.video_ref, sampled.index).await?;
        Ok(Frame {
            index: sampled.index,
            timestamp_seconds: sampled.timestamp_seconds,
            pixel_data,
            width: video.width,
            height: video.height,
        })
    }

    /// Run a collaborator call under the per-stage timeout and transient
    /// retry policy. Local computation never goes through here.
    async fn call_collaborator<T, F, Fut>(&self, name: &str, operation: F) -> WorkerResult<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T, ClientError>>,
    {
        let retry_config = RetryConfig::new(name)
            .with_max_retries(self.config.stage_attempts.saturating_sub(1))
            .with_base_delay(self.config.retry_base_delay);
        let timeout = self.config.stage_timeout;

        let outcome = retry_async(&retry_config, ClientError::is_retryable, || async {
            match tokio::time::timeout(timeout, operation()).await {
                Ok(result) => result,
                Err(_) => Err(ClientError::Timeout(timeout.as_secs())),
            }
        })
        .await;

        match outcome {
            RetryResult::Success(value) => Ok(value),
            RetryResult::Failed { error, attempts } => {
                if error.is_retryable() {
                    Err(WorkerError::CollaboratorTransient {
                        attempts,
                        source: error,
                    })
                } else {
                    Err(WorkerError::Client(error))
                }
            }
        }
    }

    async fn publish(&self, job: &Job) {
        if let Some(channel) = &self.progress {
            if let Err(e) = channel.publish_job(job).await {
                warn!(job_id = %job.id, "failed to publish progress: {e}");
            }
        }
    }

    async fn job_lock(&self, id: &JobId) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn take_work(&self, id: &JobId) -> JobWork {
        self.work.lock().await.remove(id).unwrap_or_default()
    }

    async fn put_work(&self, id: &JobId, work: JobWork) {
        self.work.lock().await.insert(id.clone(), work);
    }

    async fn clear_work(&self, id: &JobId) {
        self.work.lock().await.remove(id);
        self.locks.lock().await.remove(id);
    }
}

fn map_resolve_error(e: StoreError) -> WorkerError {
    match e {
        StoreError::VideoNotFound(video_ref) => {
            WorkerError::InvalidInput(format!("unknown video ref: {video_ref}"))
        }
        other => WorkerError::Store(other),
    }
}
