//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

use reelmix_media::{EncoderSettings, FfmpegRunner, DEFAULT_TRANSITION_SECS};
use reelmix_models::encoding::{DEFAULT_TARGET_FPS, DEFAULT_TARGET_HEIGHT};
use reelmix_models::QualityTier;

/// Upper bound on the default normalization fan-out.
const MAX_DEFAULT_WORKERS: usize = 8;

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
        .min(MAX_DEFAULT_WORKERS)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Root for per-iteration scratch directories
    pub temp_dir: PathBuf,
    /// Default folder for finished outputs
    pub output_dir: PathBuf,
    /// Content-addressed cache of normalized clips
    pub cache_dir: PathBuf,
    /// Cache entries older than this are purged
    pub cache_max_age: Duration,
    /// Maximum clips normalized concurrently within one merge
    pub max_normalize_workers: usize,
    /// Crossfade length between adjacent clips
    pub transition_secs: f64,
    /// Output quality tier
    pub quality: QualityTier,
    pub target_fps: u32,
    pub target_height: u32,
    /// Fixed output width; unset keeps the source aspect ratio
    pub target_width: Option<u32>,
    /// Terminal job records older than this are dropped; unset keeps them
    pub job_retention: Option<Duration>,
    /// FFmpeg processes running longer than this are killed; unset waits forever
    pub ffmpeg_timeout: Option<Duration>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            temp_dir: PathBuf::from("temp"),
            output_dir: PathBuf::from("outputs"),
            cache_dir: PathBuf::from("temp").join("clip_cache"),
            cache_max_age: Duration::from_secs(7 * 24 * 3600), // 7 days
            max_normalize_workers: default_workers(),
            transition_secs: DEFAULT_TRANSITION_SECS,
            quality: QualityTier::default(),
            target_fps: DEFAULT_TARGET_FPS,
            target_height: DEFAULT_TARGET_HEIGHT,
            target_width: None,
            job_retention: None,
            ffmpeg_timeout: None,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let temp_dir = std::env::var("REELMIX_TEMP_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.temp_dir);
        let cache_dir = std::env::var("REELMIX_CACHE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| temp_dir.join("clip_cache"));

        Self {
            output_dir: std::env::var("REELMIX_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.output_dir),
            cache_dir,
            temp_dir,
            cache_max_age: env_parse::<u64>("REELMIX_CACHE_MAX_AGE_DAYS")
                .map(|days| Duration::from_secs(days * 24 * 3600))
                .unwrap_or(defaults.cache_max_age),
            max_normalize_workers: env_parse::<usize>("REELMIX_MAX_WORKERS")
                .filter(|n| *n > 0)
                .unwrap_or(defaults.max_normalize_workers),
            transition_secs: env_parse::<f64>("REELMIX_TRANSITION_SECS")
                .filter(|s| s.is_finite() && *s >= 0.0)
                .unwrap_or(defaults.transition_secs),
            quality: env_parse("REELMIX_QUALITY").unwrap_or(defaults.quality),
            target_fps: env_parse::<u32>("REELMIX_TARGET_FPS")
                .filter(|f| *f > 0)
                .unwrap_or(defaults.target_fps),
            target_height: env_parse::<u32>("REELMIX_TARGET_HEIGHT")
                .filter(|h| *h > 0)
                .unwrap_or(defaults.target_height),
            target_width: env_parse::<u32>("REELMIX_TARGET_WIDTH").filter(|w| *w > 0),
            job_retention: env_parse::<u64>("JOB_RETENTION_SECS").map(Duration::from_secs),
            ffmpeg_timeout: env_parse::<u64>("REELMIX_FFMPEG_TIMEOUT_SECS")
                .filter(|s| *s > 0)
                .map(Duration::from_secs),
        }
    }

    /// FFmpeg runner honoring the configured timeout.
    pub fn ffmpeg_runner(&self) -> FfmpegRunner {
        match self.ffmpeg_timeout {
            Some(timeout) => FfmpegRunner::new().with_timeout(timeout),
            None => FfmpegRunner::new(),
        }
    }

    /// Encoder settings derived from this config.
    ///
    /// The CPU encoder gets the same thread ceiling as the normalization pool.
    pub fn encoder_settings(&self) -> EncoderSettings {
        EncoderSettings {
            tier: self.quality,
            target_fps: self.target_fps,
            target_width: self.target_width,
            target_height: self.target_height,
            cpu_threads: self.max_normalize_workers,
        }
    }
}
