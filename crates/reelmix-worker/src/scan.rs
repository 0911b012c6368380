//! Folder scanning for source media.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, warn};

use reelmix_media::MediaProber;
use reelmix_models::{MediaAsset, MediaKind};

use crate::error::{WorkerError, WorkerResult};

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "ogg", "wav", "m4a", "aac"];

/// Lists media files in a folder and probes their durations.
///
/// Files that fail to probe, or report no duration, are left out. Results are
/// sorted by file name so scans are reproducible.
#[derive(Clone)]
pub struct FolderScanner {
    prober: Arc<dyn MediaProber>,
}

impl FolderScanner {
    pub fn new(prober: Arc<dyn MediaProber>) -> Self {
        Self { prober }
    }

    pub async fn scan_videos(&self, folder: &Path) -> WorkerResult<Vec<MediaAsset>> {
        self.scan(folder, MediaKind::Video).await
    }

    pub async fn scan_audio(&self, folder: &Path) -> WorkerResult<Vec<MediaAsset>> {
        self.scan(folder, MediaKind::Audio).await
    }

    async fn scan(&self, folder: &Path, kind: MediaKind) -> WorkerResult<Vec<MediaAsset>> {
        let candidates = list_files(folder, extensions_for(kind)).await?;
        let mut assets = Vec::with_capacity(candidates.len());

        for path in candidates {
            let info = match self.prober.probe(&path).await {
                Ok(info) => info,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable media file");
                    continue;
                }
            };
            if info.duration.is_nan() || info.duration <= 0.0 {
                warn!(path = %path.display(), "Skipping media file without duration");
                continue;
            }
            assets.push(match kind {
                MediaKind::Video => MediaAsset::video(path, info.duration),
                MediaKind::Audio => MediaAsset::audio(path, info.duration),
            });
        }

        assets.sort_by(|a, b| a.name.cmp(&b.name));
        debug!(folder = %folder.display(), count = assets.len(), kind = ?kind, "Folder scanned");
        Ok(assets)
    }
}

fn extensions_for(kind: MediaKind) -> &'static [&'static str] {
    match kind {
        MediaKind::Video => VIDEO_EXTENSIONS,
        MediaKind::Audio => AUDIO_EXTENSIONS,
    }
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|x| x.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

async fn list_files(folder: &Path, extensions: &[&str]) -> WorkerResult<Vec<PathBuf>> {
    if !fs::metadata(folder).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(WorkerError::FolderNotFound(folder.to_path_buf()));
    }

    let mut entries = fs::read_dir(folder).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false)
            && has_extension(&path, extensions)
        {
            files.push(path);
        }
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reelmix_media::testing::FakeProber;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_scan_videos_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        for name in ["b.mp4", "a.MOV", "c.webm", "notes.txt", "broken.mp4"] {
            fs::write(dir.path().join(name), b"x").await.unwrap();
        }
        let prober = FakeProber::default()
            .with_video(dir.path().join("b.mp4"), 8.0)
            .with_video(dir.path().join("a.MOV"), 12.0)
            .with_video(dir.path().join("c.webm"), 0.0)
            .with_broken(dir.path().join("broken.mp4"));

        let scanner = FolderScanner::new(Arc::new(prober));
        let videos = scanner.scan_videos(dir.path()).await.unwrap();

        let names: Vec<_> = videos.iter().map(|v| v.name.as_str()).collect();
        assert_eq!(names, vec!["a.MOV", "b.mp4"]);
        assert_eq!(videos[0].duration, 12.0);
        assert_eq!(videos[0].kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_scan_audio() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("voice.mp3"), b"x").await.unwrap();
        fs::write(dir.path().join("clip.mp4"), b"x").await.unwrap();
        let prober = FakeProber::default().with_audio(dir.path().join("voice.mp3"), 30.0);

        let scanner = FolderScanner::new(Arc::new(prober));
        let audio = scanner.scan_audio(dir.path()).await.unwrap();
        assert_eq!(audio.len(), 1);
        assert_eq!(audio[0].kind, MediaKind::Audio);
    }

    #[tokio::test]
    async fn test_missing_folder() {
        let dir = TempDir::new().unwrap();
        let scanner = FolderScanner::new(Arc::new(FakeProber::default()));
        let err = scanner
            .scan_videos(&dir.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::FolderNotFound(_)));
    }
}
