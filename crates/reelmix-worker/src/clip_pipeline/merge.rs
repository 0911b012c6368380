//! Merge pipeline: normalize, load, join, encode.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use reelmix_media::{ConcatEngine, EncodeStrategy};

use super::parallel::{ClipRequest, ParallelNormalizer, SkippedClip};
use crate::error::{WorkerError, WorkerResult};

/// Position of a merge call in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStage {
    Submitted,
    Normalizing,
    Loaded,
    Transitioned,
    Encoding,
    Done,
}

impl MergeStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            MergeStage::Submitted => "submitted",
            MergeStage::Normalizing => "normalizing",
            MergeStage::Loaded => "loaded",
            MergeStage::Transitioned => "transitioned",
            MergeStage::Encoding => "encoding",
            MergeStage::Done => "done",
        }
    }
}

impl fmt::Display for MergeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Observer called on every stage change.
pub type StageHook = Arc<dyn Fn(MergeStage) + Send + Sync>;

/// What one merge call produced.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub output: PathBuf,
    pub clips_used: usize,
    pub skipped: Vec<SkippedClip>,
    pub cache_hits: usize,
    pub transition_secs: f64,
    pub total_duration: f64,
    pub strategy: EncodeStrategy,
}

/// Turns a list of trimmed sources into one crossfaded video.
#[derive(Clone)]
pub struct MergePipeline {
    normalizer: ParallelNormalizer,
    engine: ConcatEngine,
    hook: Option<StageHook>,
}

impl MergePipeline {
    pub fn new(normalizer: ParallelNormalizer, engine: ConcatEngine) -> Self {
        Self {
            normalizer,
            engine,
            hook: None,
        }
    }

    pub fn with_stage_hook(mut self, hook: StageHook) -> Self {
        self.hook = Some(hook);
        self
    }

    fn enter(&self, stage: MergeStage) {
        debug!(stage = %stage, "Merge stage");
        if let Some(hook) = &self.hook {
            hook(stage);
        }
    }

    /// Normalize `requests` and merge the survivors into `output`.
    ///
    /// Clip order in the output matches request order.
    pub async fn merge(&self, requests: Vec<ClipRequest>, output: &Path) -> WorkerResult<MergeOutcome> {
        self.enter(MergeStage::Submitted);

        self.enter(MergeStage::Normalizing);
        let report = self.normalizer.run(requests).await;
        if report.clips.is_empty() {
            return Err(WorkerError::NoUsableClips);
        }

        let loaded = self.engine.load(&report.clips).await?;
        self.enter(MergeStage::Loaded);

        let graph = self.engine.build_graph(&loaded)?;
        self.enter(MergeStage::Transitioned);

        self.enter(MergeStage::Encoding);
        let strategy = self.engine.encode(&loaded, &graph, output).await?;
        self.enter(MergeStage::Done);

        info!(
            output = %output.display(),
            clips = loaded.len(),
            skipped = report.skipped.len(),
            transition = graph.transition_secs,
            "Merge finished"
        );

        Ok(MergeOutcome {
            output: output.to_path_buf(),
            clips_used: loaded.len(),
            skipped: report.skipped,
            cache_hits: report.cache_hits,
            transition_secs: graph.transition_secs,
            total_duration: graph.total_duration,
            strategy,
        })
    }
}
