//! Bounded parallel normalization with cache lookup.

use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use reelmix_media::{ClipNormalizer, MediaError, NormalizeOutcome};
use reelmix_models::TrimSpec;

use crate::clip_cache::{CacheKey, ClipCache};

/// One clip to normalize.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipRequest {
    pub source: PathBuf,
    /// `None` means the caller never assigned a trim; such clips are skipped.
    pub trim: Option<TrimSpec>,
}

impl ClipRequest {
    pub fn new(source: impl Into<PathBuf>, trim: TrimSpec) -> Self {
        Self {
            source: source.into(),
            trim: Some(trim),
        }
    }
}

/// A request that produced no clip.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedClip {
    pub index: usize,
    pub source: PathBuf,
    pub reason: String,
}

/// Result of one parallel run.
#[derive(Debug, Clone, Default)]
pub struct NormalizeReport {
    /// Clip files in request order (normalized, cached or original)
    pub clips: Vec<PathBuf>,
    pub skipped: Vec<SkippedClip>,
    pub cache_hits: usize,
    /// Clips where the source stood in for a failed encode
    pub substituted: usize,
}

/// Where a single clip came from.
#[derive(Debug)]
enum ClipSource {
    Cached(PathBuf),
    Encoded(PathBuf),
    Original(PathBuf),
}

/// Normalizes many clips at once, at most `max_workers` at a time.
///
/// Results are slotted by request index, so output order never depends on
/// which encode finishes first.
#[derive(Clone)]
pub struct ParallelNormalizer {
    normalizer: ClipNormalizer,
    cache: ClipCache,
    semaphore: Arc<Semaphore>,
    max_workers: usize,
}

impl ParallelNormalizer {
    pub fn new(normalizer: ClipNormalizer, cache: ClipCache, max_workers: usize) -> Self {
        let max_workers = max_workers.max(1);
        Self {
            normalizer,
            cache,
            semaphore: Arc::new(Semaphore::new(max_workers)),
            max_workers,
        }
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn cache(&self) -> &ClipCache {
        &self.cache
    }

    pub async fn run(&self, requests: Vec<ClipRequest>) -> NormalizeReport {
        let total = requests.len();
        let mut report = NormalizeReport::default();
        let mut slots: Vec<Option<PathBuf>> = vec![None; total];

        if let Err(e) = self.cache.ensure_dir().await {
            warn!(error = %e, "Clip cache directory unavailable");
        }

        let mut handles = Vec::with_capacity(total);
        for (index, request) in requests.into_iter().enumerate() {
            let Some(trim) = request.trim else {
                report.skipped.push(skip(index, &request.source, "missing trim data"));
                continue;
            };
            if !request.source.exists() {
                report.skipped.push(skip(index, &request.source, "source file not found"));
                continue;
            }

            let worker = self.clone();
            let source = request.source.clone();
            let handle = tokio::spawn(async move {
                let _permit = worker
                    .semaphore
                    .acquire()
                    .await
                    .map_err(|_| MediaError::internal("normalization pool closed"))?;
                worker.process_clip(&source, trim).await
            });
            handles.push((index, request.source, handle));
        }

        let (meta, futures): (Vec<_>, Vec<_>) = handles
            .into_iter()
            .map(|(index, source, handle)| ((index, source), handle))
            .unzip();

        for ((index, source), joined) in meta.into_iter().zip(join_all(futures).await) {
            match joined {
                Ok(Ok(clip)) => {
                    let path = match clip {
                        ClipSource::Cached(path) => {
                            report.cache_hits += 1;
                            path
                        }
                        ClipSource::Encoded(path) => path,
                        ClipSource::Original(path) => {
                            report.substituted += 1;
                            path
                        }
                    };
                    slots[index] = Some(path);
                }
                Ok(Err(e)) => {
                    warn!(source = %source.display(), error = %e, "Skipping clip");
                    report.skipped.push(skip(index, &source, e.to_string()));
                }
                Err(join_err) => {
                    warn!(source = %source.display(), error = %join_err, "Normalization task panicked");
                    report.skipped.push(skip(index, &source, join_err.to_string()));
                }
            }
        }

        report.skipped.sort_by_key(|s| s.index);
        report.clips = slots.into_iter().flatten().collect();

        info!(
            requested = total,
            produced = report.clips.len(),
            skipped = report.skipped.len(),
            cache_hits = report.cache_hits,
            substituted = report.substituted,
            "Parallel normalization finished"
        );
        report
    }

    async fn process_clip(&self, source: &Path, trim: TrimSpec) -> Result<ClipSource, MediaError> {
        let window = self.normalizer.resolve(source, Some(trim)).await?;
        let key = CacheKey::derive(source, &window);

        if let Some(hit) = self.cache.lookup(&key).await {
            return Ok(ClipSource::Cached(hit.path));
        }

        let staging = self.cache.staging_path(&key);
        let exact = TrimSpec::new(window.start, Some(window.end));
        match self.normalizer.normalize(source, Some(exact), &staging).await? {
            NormalizeOutcome::Normalized { path, .. } => match self.cache.promote(&key, &path).await {
                Ok(entry) => {
                    debug!(cache_key = %key, source = %source.display(), "Cached normalized clip");
                    Ok(ClipSource::Encoded(entry.path))
                }
                Err(e) => {
                    warn!(cache_key = %key, error = %e, "Failed to promote clip into cache");
                    if fs::try_exists(&path).await.unwrap_or(false) {
                        Ok(ClipSource::Encoded(path))
                    } else {
                        Ok(ClipSource::Original(source.to_path_buf()))
                    }
                }
            },
            NormalizeOutcome::Original { path, .. } => Ok(ClipSource::Original(path)),
        }
    }
}

fn skip(index: usize, source: &Path, reason: impl Into<String>) -> SkippedClip {
    SkippedClip {
        index,
        source: source.to_path_buf(),
        reason: reason.into(),
    }
}
