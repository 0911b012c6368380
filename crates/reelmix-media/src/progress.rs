//! FFmpeg progress reports.

use serde::{Deserialize, Serialize};

/// Progress block emitted by `-progress pipe:2`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Current FPS
    pub fps: f64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Output time as string (HH:MM:SS.microseconds)
    pub out_time: String,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Output time in seconds.
    pub fn out_time_secs(&self) -> f64 {
        self.out_time_ms.max(0) as f64 / 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_time_secs() {
        let progress = FfmpegProgress {
            out_time_ms: 3500,
            ..Default::default()
        };
        assert!((progress.out_time_secs() - 3.5).abs() < 0.001);
    }

    #[test]
    fn test_negative_out_time_clamped() {
        // FFmpeg reports a negative time before the first frame is muxed
        let progress = FfmpegProgress {
            out_time_ms: -9000,
            ..Default::default()
        };
        assert_eq!(progress.out_time_secs(), 0.0);
    }
}
