//! Batch job records for progress tracking and polling.
//!
//! A record is created when a request is accepted, mutated in place by the
//! single worker that owns the job, and read by any number of pollers.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{JobId, JobKind};

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is actively being processed
    #[default]
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Error,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Error => "error",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Error)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status record of one accepted batch.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BatchJob {
    /// Unique job identifier
    pub id: JobId,
    /// Pipeline this job runs
    pub kind: JobKind,
    /// Current job status
    pub status: JobStatus,
    /// Progress percentage (0-100), never decreases while processing
    pub progress: f64,
    /// Current stage description
    pub message: Option<String>,
    /// Output file names produced so far
    pub outputs: Vec<String>,
    /// Error message if the job failed
    pub error: Option<String>,
    /// Folder the outputs are written to
    pub output_folder: PathBuf,
    /// When the job was accepted
    pub created_at: DateTime<Utc>,
    /// When the record was last updated
    pub updated_at: DateTime<Utc>,
}

impl BatchJob {
    /// Create a new record in the `processing` state.
    pub fn new(id: JobId, kind: JobKind, output_folder: impl Into<PathBuf>) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind,
            status: JobStatus::Processing,
            progress: 0.0,
            message: None,
            outputs: Vec::new(),
            error: None,
            output_folder: output_folder.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Check if the job is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Update progress and stage message.
    ///
    /// Progress is clamped to 0..=100 and never moves backwards. NaN is ignored. Updates after a
    /// terminal state are ignored.
    pub fn set_progress(&mut self, progress: f64, message: Option<String>) {
        if self.is_terminal() {
            return;
        }
        if !progress.is_nan() {
            self.progress = self.progress.max(progress.clamp(0.0, 100.0));
        }
        if message.is_some() {
            self.message = message;
        }
        self.updated_at = Utc::now();
    }

    /// Record a finished output file.
    pub fn push_output(&mut self, filename: impl Into<String>) {
        let filename = filename.into();
        if !self.outputs.contains(&filename) {
            self.outputs.push(filename);
        }
        self.updated_at = Utc::now();
    }

    /// Mark job as completed.
    pub fn complete(&mut self, outputs: Vec<String>) {
        for output in outputs {
            self.push_output(output);
        }
        self.status = JobStatus::Completed;
        self.progress = 100.0;
        self.message = Some("Processing completed".into());
        self.error = None;
        self.updated_at = Utc::now();
    }

    /// Mark job as failed. Outputs produced so far are kept.
    pub fn fail(&mut self, error: impl Into<String>) {
        let error = error.into();
        self.status = JobStatus::Error;
        self.progress = 0.0;
        self.message = Some(format!("Error: {}", error));
        self.error = Some(error);
        self.updated_at = Utc::now();
    }

    /// Seconds since the last update.
    pub fn idle_secs(&self) -> i64 {
        (Utc::now() - self.updated_at).num_seconds()
    }
}
