//! Application state.

use std::sync::Arc;

use reelmix_media::{
    CapabilityProbe, FfmpegCapabilityProbe, FfmpegExecutor, FfprobeProber,
    MediaProber,
};
use reelmix_worker::{BatchOrchestrator, BatchService, InMemoryJobStore, JobStore, WorkerConfig};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub service: BatchService,
    pub jobs: Arc<dyn JobStore>,
}

impl AppState {
    /// Wire the service over the given FFmpeg seams.
    pub fn new(
        config: ApiConfig,
        worker: WorkerConfig,
        executor: Arc<dyn FfmpegExecutor>,
        prober: Arc<dyn MediaProber>,
        capability: Arc<dyn CapabilityProbe>,
    ) -> Self {
        let orchestrator = BatchOrchestrator::new(worker, executor, prober, capability);
        let jobs: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
        let service = BatchService::new(Arc::new(orchestrator), jobs.clone());
        Self {
            config,
            service,
            jobs,
        }
    }

    /// Production wiring: the FFmpeg and FFprobe binaries on `PATH`.
    pub fn with_ffmpeg(config: ApiConfig, worker: WorkerConfig) -> Self {
        let runner = worker.ffmpeg_runner();
        Self::new(
            config,
            worker,
            Arc::new(runner),
            Arc::new(FfprobeProber),
            Arc::new(FfmpegCapabilityProbe::new()),
        )
    }

    pub fn worker_config(&self) -> &WorkerConfig {
        self.service.orchestrator().config()
    }
}
