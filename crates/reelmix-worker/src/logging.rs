//! Structured job logging.

use tracing::{error, info, warn, Span};

use reelmix_models::{JobId, JobKind};

/// Logs job lifecycle events with the job id and kind attached.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    kind: JobKind,
}

impl JobLogger {
    pub fn new(job_id: &JobId, kind: JobKind) -> Self {
        Self {
            job_id: job_id.to_string(),
            kind,
        }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, kind = %self.kind, "Job started: {}", message);
    }

    pub fn log_progress(&self, percent: f64, message: &str) {
        info!(
            job_id = %self.job_id,
            kind = %self.kind,
            percent,
            "Job progress: {}", message
        );
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, kind = %self.kind, "Job warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, kind = %self.kind, "Job error: {}", message);
    }

    pub fn log_completion(&self, outputs: usize) {
        info!(
            job_id = %self.job_id,
            kind = %self.kind,
            outputs,
            "Job completed"
        );
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Span wrapping all work done for this job.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("job", job_id = %self.job_id, kind = %self.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_logger_creation() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, JobKind::Voice);
        assert_eq!(logger.job_id(), job_id.to_string());
    }

    #[test]
    fn test_logging_without_subscriber() {
        let logger = JobLogger::new(&JobId::from_string("job-7"), JobKind::Batch);
        let _guard = logger.create_span().entered();
        logger.log_start("3 outputs");
        logger.log_progress(33.33, "Merging videos...");
        logger.log_warning("clip skipped");
        logger.log_error("boom");
        logger.log_completion(3);
    }
}
