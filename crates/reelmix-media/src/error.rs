//! Error types for media operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("Encoder reported success but produced no output: {0}")]
    EmptyOutput(PathBuf),

    #[error("All encode attempts failed: {}", format_attempts(.attempts))]
    FallbackExhausted { attempts: Vec<(String, String)> },

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Invalid media {path}: {reason}")]
    InvalidMedia { path: PathBuf, reason: String },

    #[error("No usable clips to merge")]
    NoUsableClips,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_attempts(attempts: &[(String, String)]) -> String {
    attempts
        .iter()
        .map(|(strategy, err)| format!("{}: {}", strategy, err))
        .collect::<Vec<_>>()
        .join("; ")
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create an invalid media error.
    pub fn invalid_media(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidMedia {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the error is an encode failure (as opposed to bad input).
    pub fn is_encode_failure(&self) -> bool {
        matches!(
            self,
            Self::FfmpegFailed { .. } | Self::EmptyOutput(_) | Self::FallbackExhausted { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_message_lists_attempts() {
        let err = MediaError::FallbackExhausted {
            attempts: vec![
                ("gpu".into(), "nvenc init failed".into()),
                ("cpu".into(), "exit 1".into()),
            ],
        };
        assert_eq!(
            err.to_string(),
            "All encode attempts failed: gpu: nvenc init failed; cpu: exit 1"
        );
        assert!(err.is_encode_failure());
    }

    #[test]
    fn test_invalid_media_not_encode_failure() {
        let err = MediaError::invalid_media("a.mp4", "zero fps");
        assert!(!err.is_encode_failure());
        assert_eq!(err.to_string(), "Invalid media a.mp4: zero fps");
    }
}
