//! Batch request payloads and their validation.
//!
//! Requests arrive with loosely typed fields (mode names as strings, optional
//! counts). `validate` turns them into fully typed parameter structs or a
//! [`RequestError`] that is surfaced to the caller immediately.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use crate::{AudioSelectionMode, TrimMode};

/// Default number of clips merged into each output
pub const DEFAULT_VIDEO_COUNT: u32 = 5;
/// Default per-clip duration in seconds
pub const DEFAULT_VIDEO_DURATION: f64 = 10.0;
/// Default number of outputs per batch
pub const DEFAULT_OUTPUT_COUNT: u32 = 1;
/// Upper bound on clips per output
pub const MAX_VIDEO_COUNT: u32 = 20;
/// Upper bound on outputs per batch
pub const MAX_OUTPUT_COUNT: u32 = 10;

/// Request validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error("Missing required parameter: {0}")]
    Missing(&'static str),

    #[error("video_count must be between 1 and {MAX_VIDEO_COUNT}")]
    VideoCount,

    #[error("video_duration must be positive")]
    VideoDuration,

    #[error("output_count must be between 1 and {MAX_OUTPUT_COUNT}")]
    OutputCount,

    #[error("{field} must be either \"{a}\" or \"{b}\"")]
    Mode {
        field: &'static str,
        a: &'static str,
        b: &'static str,
    },

    #[error("volume must be between 0 and 100")]
    Volume,
}

fn non_empty(path: &Option<PathBuf>, field: &'static str) -> Result<PathBuf, RequestError> {
    match path {
        Some(p) if !p.as_os_str().is_empty() => Ok(p.clone()),
        _ => Err(RequestError::Missing(field)),
    }
}

fn trim_mode(raw: &Option<String>, field: &'static str) -> Result<TrimMode, RequestError> {
    match raw {
        None => Ok(TrimMode::default()),
        Some(s) => s.parse().map_err(|_| RequestError::Mode {
            field,
            a: "fixed",
            b: "random",
        }),
    }
}

/// Video-only batch request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct BatchRequest {
    #[serde(default, alias = "input_folder_path")]
    pub folder_path: Option<PathBuf>,
    #[serde(default)]
    pub output_folder_path: Option<PathBuf>,
    #[serde(default)]
    pub video_count: Option<u32>,
    #[serde(default)]
    pub video_duration: Option<f64>,
    #[serde(default)]
    pub output_count: Option<u32>,
    #[serde(default, alias = "trim_mode")]
    pub video_trim_mode: Option<String>,
}

/// Validated video-only batch parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchParams {
    pub folder: PathBuf,
    pub output_folder: Option<PathBuf>,
    pub video_count: usize,
    pub video_duration: f64,
    pub output_count: usize,
    pub trim_mode: TrimMode,
}

impl BatchRequest {
    pub fn validate(&self) -> Result<BatchParams, RequestError> {
        let folder = non_empty(&self.folder_path, "folder_path")?;

        let video_count = self.video_count.unwrap_or(DEFAULT_VIDEO_COUNT);
        if !(1..=MAX_VIDEO_COUNT).contains(&video_count) {
            return Err(RequestError::VideoCount);
        }

        let video_duration = self.video_duration.unwrap_or(DEFAULT_VIDEO_DURATION);
        if !(video_duration.is_finite() && video_duration > 0.0) {
            return Err(RequestError::VideoDuration);
        }

        let output_count = self.output_count.unwrap_or(DEFAULT_OUTPUT_COUNT);
        if !(1..=MAX_OUTPUT_COUNT).contains(&output_count) {
            return Err(RequestError::OutputCount);
        }

        Ok(BatchParams {
            folder,
            output_folder: self.output_folder_path.clone(),
            video_count: video_count as usize,
            video_duration,
            output_count: output_count as usize,
            trim_mode: trim_mode(&self.video_trim_mode, "video_trim_mode")?,
        })
    }
}

/// Video + audio batch request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VideoAudioBatchRequest {
    #[serde(default)]
    pub video_folder_path: Option<PathBuf>,
    #[serde(default)]
    pub audio_folder_path: Option<PathBuf>,
    #[serde(default)]
    pub output_folder_path: Option<PathBuf>,
    #[serde(default)]
    pub audio_trim_mode: Option<String>,
    #[serde(default)]
    pub audio_selection_mode: Option<String>,
}

/// Validated video + audio batch parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoAudioParams {
    pub video_folder: PathBuf,
    pub audio_folder: PathBuf,
    pub output_folder: Option<PathBuf>,
    pub audio_trim_mode: TrimMode,
    pub audio_selection_mode: AudioSelectionMode,
}

impl VideoAudioBatchRequest {
    pub fn validate(&self) -> Result<VideoAudioParams, RequestError> {
        let video_folder = non_empty(&self.video_folder_path, "video_folder_path")?;
        let audio_folder = non_empty(&self.audio_folder_path, "audio_folder_path")?;

        let audio_selection_mode = match &self.audio_selection_mode {
            None => AudioSelectionMode::default(),
            Some(s) => s.parse().map_err(|_| RequestError::Mode {
                field: "audio_selection_mode",
                a: "unique",
                b: "random",
            })?,
        };

        Ok(VideoAudioParams {
            video_folder,
            audio_folder,
            output_folder: self.output_folder_path.clone(),
            audio_trim_mode: trim_mode(&self.audio_trim_mode, "audio_trim_mode")?,
            audio_selection_mode,
        })
    }
}

/// Voice-over request for a single video.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct VoiceAdderRequest {
    #[serde(default)]
    pub video_path: Option<PathBuf>,
    #[serde(default)]
    pub audio_path: Option<PathBuf>,
    #[serde(default)]
    pub output_folder_path: Option<PathBuf>,
    /// Original audio volume in percent; defaults to 100
    #[serde(default, alias = "original_audio_volume")]
    pub original_volume: Option<f64>,
}

/// Validated voice-over parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub video: PathBuf,
    pub voice: PathBuf,
    pub output_folder: Option<PathBuf>,
    pub volume_percent: f64,
}

impl VoiceAdderRequest {
    pub fn validate(&self) -> Result<VoiceParams, RequestError> {
        let video = non_empty(&self.video_path, "video_path")?;
        let voice = non_empty(&self.audio_path, "audio_path")?;
        let volume_percent = self.original_volume.unwrap_or(100.0);
        if !(0.0..=100.0).contains(&volume_percent) {
            return Err(RequestError::Volume);
        }
        Ok(VoiceParams {
            video,
            voice,
            output_folder: self.output_folder_path.clone(),
            volume_percent,
        })
    }
}
