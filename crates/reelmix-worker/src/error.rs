//! Worker error types.

use std::path::PathBuf;
use thiserror::Error;

use reelmix_media::MediaError;
use reelmix_models::RequestError;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("{0}")]
    InputValidation(#[from] RequestError),

    #[error("Folder does not exist: {0}")]
    FolderNotFound(PathBuf),

    #[error("No videos found in {0}")]
    NoVideosFound(PathBuf),

    #[error("No audio files found in {0}")]
    NoAudioFound(PathBuf),

    #[error("No usable clips to merge")]
    NoUsableClips,

    #[error("Every output failed to encode: {0}")]
    AllOutputsFailed(String),

    #[error("Media error: {0}")]
    Media(MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MediaError> for WorkerError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::NoUsableClips => Self::NoUsableClips,
            other => Self::Media(other),
        }
    }
}

impl WorkerError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Errors that end the whole batch rather than one output iteration.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            WorkerError::NoUsableClips
                | WorkerError::NoVideosFound(_)
                | WorkerError::NoAudioFound(_)
                | WorkerError::FolderNotFound(_)
                | WorkerError::InputValidation(_)
        )
    }
}
