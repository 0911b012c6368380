//! Progress reporting from a running job.

/// Receives progress from a running job.
///
/// Percentages are non-decreasing over a job's life. `output_ready` fires as
/// soon as an output file is in its final place.
pub trait ProgressSink: Send + Sync {
    fn progress(&self, percent: f64, message: Option<String>);

    fn output_ready(&self, _filename: &str) {}
}

/// Sink that drops every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn progress(&self, _percent: f64, _message: Option<String>) {}
}

/// Percentage of `done` out of `total`, clamped to 100.
pub fn percent_of(done: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    done.min(total) as f64 * 100.0 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(0, 3), 0.0);
        assert!((percent_of(1, 3) - 33.33).abs() < 0.01);
        assert!((percent_of(2, 3) - 66.67).abs() < 0.01);
        assert_eq!(percent_of(3, 3), 100.0);
        assert_eq!(percent_of(5, 3), 100.0);
        assert_eq!(percent_of(0, 0), 100.0);
    }
}
