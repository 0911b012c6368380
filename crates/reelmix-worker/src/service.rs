//! Job submission.
//!
//! Requests are validated up front; accepted jobs run on their own task and
//! report through the job store. Submitters only ever poll.

use metrics::counter;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{info, Instrument};

use reelmix_models::{
    BatchJob, BatchRequest, JobKind, VideoAudioBatchRequest, VoiceAdderRequest,
};

use crate::error::{WorkerError, WorkerResult};
use crate::job_store::{JobProgress, JobStore, JobTracker};
use crate::logging::JobLogger;
use crate::orchestrator::BatchOrchestrator;

pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "reelmix_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "reelmix_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "reelmix_jobs_failed_total";
}

fn record_job(name: &'static str, kind: JobKind) {
    let labels = [("kind", kind.as_str().to_string())];
    counter!(name, &labels).increment(1);
}

/// Accepts jobs and runs them in the background.
#[derive(Clone)]
pub struct BatchService {
    orchestrator: Arc<BatchOrchestrator>,
    tracker: JobTracker,
}

impl BatchService {
    pub fn new(orchestrator: Arc<BatchOrchestrator>, store: Arc<dyn JobStore>) -> Self {
        Self {
            orchestrator,
            tracker: JobTracker::new(store),
        }
    }

    pub fn orchestrator(&self) -> &Arc<BatchOrchestrator> {
        &self.orchestrator
    }

    pub fn tracker(&self) -> &JobTracker {
        &self.tracker
    }

    fn output_folder(&self, requested: Option<&Path>) -> PathBuf {
        requested
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.orchestrator.config().output_dir.clone())
    }

    /// Validate and start a video-only batch.
    pub fn submit_batch(&self, request: &BatchRequest) -> WorkerResult<BatchJob> {
        let params = request.validate()?;
        let folder = self.output_folder(params.output_folder.as_deref());
        let job = self.tracker.create(JobKind::Batch, &folder);

        self.spawn_job(&job, move |orchestrator, folder, sink| async move {
            orchestrator.process_batch(&params, &folder, &sink).await
        });
        Ok(job)
    }

    /// Validate and start a video+audio batch.
    pub fn submit_video_audio(&self, request: &VideoAudioBatchRequest) -> WorkerResult<BatchJob> {
        let params = request.validate()?;
        let folder = self.output_folder(params.output_folder.as_deref());
        let job = self.tracker.create(JobKind::VideoAudio, &folder);

        self.spawn_job(&job, move |orchestrator, folder, sink| async move {
            orchestrator
                .process_video_audio_batch(&params, &folder, &sink)
                .await
        });
        Ok(job)
    }

    /// Validate and start a voice-over job.
    pub fn submit_voice(&self, request: &VoiceAdderRequest) -> WorkerResult<BatchJob> {
        let params = request.validate()?;
        let folder = self.output_folder(params.output_folder.as_deref());
        let job = self.tracker.create(JobKind::Voice, &folder);

        self.spawn_job(&job, move |orchestrator, folder, sink| async move {
            let output = orchestrator
                .process_voice_adder(&params, &folder, &sink)
                .await?;
            Ok::<_, WorkerError>(
                output
                    .file_name()
                    .map(|n| vec![n.to_string_lossy().into_owned()])
                    .unwrap_or_default(),
            )
        });
        Ok(job)
    }

    /// Run `work` on its own task and write the outcome into the job record.
    ///
    /// Panics inside `work` are caught and recorded as job errors.
    fn spawn_job<F, Fut>(&self, job: &BatchJob, work: F)
    where
        F: FnOnce(Arc<BatchOrchestrator>, PathBuf, JobProgress) -> Fut + Send + 'static,
        Fut: Future<Output = WorkerResult<Vec<String>>> + Send + 'static,
    {
        let tracker = self.tracker.clone();
        let orchestrator = self.orchestrator.clone();
        let id = job.id.clone();
        let folder = job.output_folder.clone();
        let kind = job.kind;
        let logger = JobLogger::new(&id, kind);
        let span = logger.create_span();
        record_job(names::JOBS_SUBMITTED_TOTAL, kind);

        tokio::spawn(
            async move {
                logger.log_start(&folder.display().to_string());
                let sink = tracker.sink(&id, logger.clone());
                let handle = tokio::spawn(work(orchestrator, folder, sink).in_current_span());

                match handle.await {
                    Ok(Ok(outputs)) => {
                        record_job(names::JOBS_COMPLETED_TOTAL, kind);
                        logger.log_completion(outputs.len());
                        tracker.complete(&id, outputs);
                    }
                    Ok(Err(e)) => {
                        record_job(names::JOBS_FAILED_TOTAL, kind);
                        logger.log_error(&e.to_string());
                        tracker.fail(&id, &e.to_string());
                    }
                    Err(join_err) => {
                        record_job(names::JOBS_FAILED_TOTAL, kind);
                        let message = format!("Job task failed: {}", join_err);
                        logger.log_error(&message);
                        tracker.fail(&id, &message);
                    }
                }
            }
            .instrument(span),
        );
    }
}

/// Periodically drop terminal job records older than `retention`.
pub fn spawn_retention_sweeper(store: Arc<dyn JobStore>, retention: Duration) -> JoinHandle<()> {
    let period = (retention / 2).clamp(Duration::from_secs(1), Duration::from_secs(300));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let removed = store.prune_terminal(retention);
            if removed > 0 {
                info!(removed, remaining = store.len(), "Pruned finished job records");
            }
        }
    })
}
