//! Clip assembly worker.
//!
//! This crate provides:
//! - A content-addressed cache of normalized clips
//! - Folder scanning and random clip/audio selection
//! - Bounded parallel normalization feeding a crossfade merge
//! - Batch, video+audio and voice-over orchestration
//! - Job records with background execution and retention

pub mod clip_cache;
pub mod clip_pipeline;
pub mod config;
pub mod error;
pub mod job_store;
pub mod logging;
pub mod orchestrator;
pub mod progress;
pub mod scan;
pub mod selection;
pub mod service;

pub use clip_cache::{CacheKey, CachedClip, ClipCache};
pub use clip_pipeline::{
    ClipRequest, MergeOutcome, MergePipeline, MergeStage, NormalizeReport, ParallelNormalizer,
    SkippedClip, StageHook,
};
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use job_store::{InMemoryJobStore, JobProgress, JobStore, JobTracker};
pub use logging::JobLogger;
pub use orchestrator::BatchOrchestrator;
pub use progress::{NoopProgress, ProgressSink};
pub use scan::FolderScanner;
pub use service::{spawn_retention_sweeper, BatchService};
