//! Video encoding profiles.
//!
//! A profile is resolved per operation from the configured quality tier and
//! whether the hardware encoder is available. Profiles are never persisted.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::QualityTier;

/// Default CPU video codec (H.264)
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
/// NVIDIA hardware H.264 encoder
pub const NVENC_VIDEO_CODEC: &str = "h264_nvenc";
/// Default audio codec for re-encoded audio
pub const DEFAULT_AUDIO_CODEC: &str = "aac";
/// Default audio bitrate
pub const DEFAULT_AUDIO_BITRATE: &str = "192k";
/// Default output frame rate
pub const DEFAULT_TARGET_FPS: u32 = 30;
/// Default output height (aspect preserved)
pub const DEFAULT_TARGET_HEIGHT: u32 = 720;

/// Video encoding profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EncodingProfile {
    /// Video codec (e.g., "libx264", "h264_nvenc")
    pub codec: String,

    /// Encoder preset (x264 names on CPU, p1-p7 on NVENC)
    pub preset: String,

    /// Target video bitrate (e.g., "4M")
    pub bitrate: String,

    /// Constant Rate Factor, sent as -cq for NVENC
    pub crf: u8,

    /// Output frame rate
    pub target_fps: u32,

    /// Output height in pixels
    pub target_height: u32,

    /// Output width; when unset the width follows the source aspect ratio
    #[serde(default)]
    pub target_width: Option<u32>,

    /// Encoder thread count (CPU only)
    #[serde(default)]
    pub threads: Option<usize>,

    /// Whether this profile targets the hardware encoder
    #[serde(default)]
    pub hardware: bool,
}

impl Default for EncodingProfile {
    fn default() -> Self {
        Self::cpu(QualityTier::default())
    }
}

impl EncodingProfile {
    /// CPU (libx264) profile for a tier.
    pub fn cpu(tier: QualityTier) -> Self {
        let (preset, crf, bitrate) = match tier {
            QualityTier::Low => ("veryfast", 28, "2M"),
            QualityTier::Medium => ("fast", 23, "4M"),
            QualityTier::High => ("slow", 18, "8M"),
        };
        Self {
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            preset: preset.to_string(),
            bitrate: bitrate.to_string(),
            crf,
            target_fps: DEFAULT_TARGET_FPS,
            target_height: DEFAULT_TARGET_HEIGHT,
            target_width: None,
            threads: None,
            hardware: false,
        }
    }

    /// NVENC profile for a tier.
    pub fn gpu(tier: QualityTier) -> Self {
        let preset = match tier {
            QualityTier::Low => "p2",
            QualityTier::Medium => "p4",
            QualityTier::High => "p6",
        };
        Self {
            codec: NVENC_VIDEO_CODEC.to_string(),
            preset: preset.to_string(),
            hardware: true,
            ..Self::cpu(tier)
        }
    }

    /// Resolve the profile for a tier and hardware availability.
    pub fn resolve(tier: QualityTier, gpu_available: bool) -> Self {
        if gpu_available {
            Self::gpu(tier)
        } else {
            Self::cpu(tier)
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_size(mut self, width: Option<u32>, height: u32) -> Self {
        self.target_width = width;
        self.target_height = height;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Scale filter matching the target size.
    ///
    /// With only a height the width is derived from the source aspect and
    /// rounded to an even value.
    pub fn scale_filter(&self) -> String {
        match self.target_width {
            Some(w) => format!("scale={}:{}", w, self.target_height),
            None => format!("scale=-2:{}", self.target_height),
        }
    }

    /// Convert to FFmpeg video encoder arguments.
    pub fn to_ffmpeg_args(&self) -> Vec<String> {
        let mut args = vec![
            "-c:v".to_string(),
            self.codec.clone(),
            "-preset".to_string(),
            self.preset.clone(),
        ];

        // CRF is not used with NVENC, use -cq instead
        if self.hardware {
            args.extend_from_slice(&["-cq".to_string(), self.crf.to_string()]);
        } else {
            args.extend_from_slice(&["-crf".to_string(), self.crf.to_string()]);
        }

        args.extend_from_slice(&[
            "-maxrate".to_string(),
            self.bitrate.clone(),
            "-bufsize".to_string(),
            self.bitrate.clone(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ]);

        if let (false, Some(threads)) = (self.hardware, self.threads) {
            args.extend_from_slice(&["-threads".to_string(), threads.to_string()]);
        }

        args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profile() {
        let profile = EncodingProfile::default();
        assert_eq!(profile.codec, "libx264");
        assert_eq!(profile.crf, 23);
        assert_eq!(profile.target_fps, 30);
        assert_eq!(profile.target_height, 720);
    }

    #[test]
    fn test_cpu_args() {
        let args = EncodingProfile::cpu(QualityTier::High)
            .with_threads(4)
            .to_ffmpeg_args();
        assert!(args.contains(&"libx264".to_string()));
        assert!(args.contains(&"-crf".to_string()));
        assert!(args.contains(&"18".to_string()));
        assert!(args.contains(&"-threads".to_string()));
    }

    #[test]
    fn test_gpu_args() {
        let args = EncodingProfile::resolve(QualityTier::Medium, true)
            .with_threads(4)
            .to_ffmpeg_args();
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(args.contains(&"-cq".to_string())); // NVENC uses -cq instead of -crf
        assert!(!args.contains(&"-threads".to_string()));
    }

    #[test]
    fn test_scale_filter() {
        let profile = EncodingProfile::default();
        assert_eq!(profile.scale_filter(), "scale=-2:720");
        let profile = profile.with_size(Some(1280), 720);
        assert_eq!(profile.scale_filter(), "scale=1280:720");
    }
}
