//! Content-addressed cache of normalized clips.
//!
//! An entry is keyed by the source path and the trim window, so the same
//! segment of the same file is encoded once and reused across batches and
//! restarts. Entries are immutable: they are written to a temporary name in
//! the cache directory and renamed into place, so readers never observe a
//! partial file and two workers producing the same key are harmless.
//!
//! Staleness is not detected. Replacing a source file in place keeps serving
//! the old clip until the entry ages out.

use metrics::counter;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tracing::{debug, info, warn};

use reelmix_models::TrimWindow;

use crate::error::WorkerResult;

/// File extension of cache entries.
const ENTRY_EXTENSION: &str = "mp4";

/// Prefix of in-flight entries.
const STAGING_PREFIX: &str = ".staging-";

/// Staging files younger than this may still be written and are never purged.
const STAGING_MIN_AGE: Duration = Duration::from_secs(3600);

pub mod names {
    pub const CACHE_HITS_TOTAL: &str = "reelmix_clip_cache_hits_total";
    pub const CACHE_MISSES_TOTAL: &str = "reelmix_clip_cache_misses_total";
    pub const CACHE_PURGED_TOTAL: &str = "reelmix_clip_cache_purged_total";
}

/// Hex SHA-256 of `(source path, trim window)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn derive(source: &Path, window: &TrimWindow) -> Self {
        let material = format!("{}|{}", source.to_string_lossy(), window.key_fragment());
        let digest = Sha256::digest(material.as_bytes());
        Self(format!("{:x}", digest))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cache entry present on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedClip {
    pub key: CacheKey,
    pub path: PathBuf,
}

/// Flat directory of `{key}.mp4` files.
#[derive(Debug, Clone)]
pub struct ClipCache {
    root: PathBuf,
}

impl ClipCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the cache directory if missing.
    pub async fn ensure_dir(&self) -> WorkerResult<()> {
        fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the entry for `key` lives, whether or not it exists yet.
    pub fn path_for(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    /// Unique scratch path inside the cache directory for building `key`.
    ///
    /// Same directory as the final entry so that [`ClipCache::promote`] is a
    /// plain rename.
    pub fn staging_path(&self, key: &CacheKey) -> PathBuf {
        self.root.join(format!(
            "{}{}-{}.{}",
            STAGING_PREFIX,
            key,
            uuid::Uuid::new_v4().simple(),
            ENTRY_EXTENSION
        ))
    }

    /// Entry for `key` if present. Zero-length files count as absent.
    pub async fn lookup(&self, key: &CacheKey) -> Option<CachedClip> {
        let path = self.path_for(key);
        match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() && meta.len() > 0 => {
                counter!(names::CACHE_HITS_TOTAL).increment(1);
                debug!(cache_key = %key, "Clip cache hit");
                Some(CachedClip {
                    key: key.clone(),
                    path,
                })
            }
            _ => {
                counter!(names::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    pub async fn is_present(&self, key: &CacheKey) -> bool {
        matches!(fs::metadata(self.path_for(key)).await, Ok(meta) if meta.len() > 0)
    }

    /// Atomically move a finished file into the cache under `key`.
    pub async fn promote(&self, key: &CacheKey, staged: &Path) -> WorkerResult<CachedClip> {
        let path = self.path_for(key);
        fs::rename(staged, &path).await?;
        Ok(CachedClip {
            key: key.clone(),
            path,
        })
    }

    /// Delete entries (and abandoned staging files) not modified within `max_age`.
    ///
    /// Staging files are kept for at least an hour regardless of `max_age`,
    /// since a running encode may still be writing them. Returns the number
    /// of files removed. Files that cannot be inspected are left alone.
    pub async fn purge_older_than(&self, max_age: Duration) -> WorkerResult<usize> {
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let now = SystemTime::now();
        let mut removed = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cannot stat cache entry");
                    continue;
                }
            };

            let staging = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(STAGING_PREFIX));
            let min_age = if staging {
                max_age.max(STAGING_MIN_AGE)
            } else {
                max_age
            };

            let age = now.duration_since(modified).unwrap_or_default();
            if age < min_age {
                continue;
            }

            match fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to purge cache entry"),
            }
        }

        if removed > 0 {
            counter!(names::CACHE_PURGED_TOTAL).increment(removed as u64);
            info!(removed, root = %self.root.display(), "Purged stale clip cache entries");
        }
        Ok(removed)
    }
}
