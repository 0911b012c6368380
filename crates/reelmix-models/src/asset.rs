//! Scanned media assets.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Kind of media a scanned file holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Video,
    Audio,
}

/// A source file discovered by a folder scan.
///
/// Assets are read-only inputs: nothing in the pipeline mutates or deletes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MediaAsset {
    /// File name without directory
    pub name: String,
    /// Absolute or caller-relative path
    pub path: PathBuf,
    /// Duration in seconds (always > 0 for scanned assets)
    pub duration: f64,
    /// Whether the asset is a video or audio-only file
    pub kind: MediaKind,
}

impl MediaAsset {
    /// Create a video asset.
    pub fn video(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self::with_kind(path.into(), duration, MediaKind::Video)
    }

    /// Create an audio asset.
    pub fn audio(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self::with_kind(path.into(), duration, MediaKind::Audio)
    }

    fn with_kind(path: PathBuf, duration: f64, kind: MediaKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            duration,
            kind,
        }
    }
}
