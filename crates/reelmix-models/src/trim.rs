//! Trim windows applied to a source before normalization.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced while resolving a trim against a source duration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TrimError {
    #[error("Trim start must be non-negative, got {0}")]
    NegativeStart(f64),

    #[error("Invalid trim: start {start:.3} is not before end {end:.3}")]
    Empty { start: f64, end: f64 },
}

/// Unclamped trim as requested by a caller or chosen by a trim mode.
///
/// `end == None` means "until the end of the source".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimSpec {
    pub start: f64,
    #[serde(default)]
    pub end: Option<f64>,
}

impl TrimSpec {
    pub fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// Trim covering the whole source.
    pub fn whole() -> Self {
        Self {
            start: 0.0,
            end: None,
        }
    }

    /// Resolve against the real source duration.
    ///
    /// An end past the duration (or missing) is clamped to the duration.
    /// After clamping, `start` must be strictly before `end`.
    pub fn clamp(&self, duration: f64) -> Result<TrimWindow, TrimError> {
        if self.start < 0.0 {
            return Err(TrimError::NegativeStart(self.start));
        }

        let end = match self.end {
            Some(end) if end <= duration => end,
            _ => duration,
        };

        if self.start >= end {
            return Err(TrimError::Empty {
                start: self.start,
                end,
            });
        }

        Ok(TrimWindow {
            start: self.start,
            end,
        })
    }
}

/// A resolved `[start, end)` range in seconds inside one source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrimWindow {
    pub start: f64,
    pub end: f64,
}

impl TrimWindow {
    /// Length of the window in seconds.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Stable textual form used for cache keys (millisecond precision).
    pub fn key_fragment(&self) -> String {
        format!("{:.3}|{:.3}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_clamped_to_duration() {
        let window = TrimSpec::new(2.0, Some(30.0)).clamp(12.0).unwrap();
        assert_eq!(window.start, 2.0);
        assert_eq!(window.end, 12.0);
        assert!((window.duration() - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_missing_end_uses_duration() {
        let window = TrimSpec::whole().clamp(5.0).unwrap();
        assert_eq!(window.end, 5.0);
    }

    #[test]
    fn test_end_within_duration_kept() {
        let window = TrimSpec::new(0.0, Some(6.0)).clamp(8.0).unwrap();
        assert_eq!(window.end, 6.0);
    }

    #[test]
    fn test_start_past_duration_rejected() {
        let err = TrimSpec::new(10.0, None).clamp(8.0).unwrap_err();
        assert_eq!(err, TrimError::Empty { start: 10.0, end: 8.0 });
    }

    #[test]
    fn test_start_equal_end_rejected() {
        assert!(TrimSpec::new(4.0, Some(4.0)).clamp(8.0).is_err());
    }

    #[test]
    fn test_negative_start_rejected() {
        assert!(matches!(
            TrimSpec::new(-1.0, None).clamp(8.0),
            Err(TrimError::NegativeStart(_))
        ));
    }

    #[test]
    fn test_key_fragment_is_fixed_precision() {
        let window = TrimWindow { start: 0.0, end: 6.0 };
        assert_eq!(window.key_fragment(), "0.000|6.000");
    }
}
