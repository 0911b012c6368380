//! Hardware encoder detection.
//!
//! The FFmpeg probe answers "can this process use NVENC" once and caches the
//! answer until [`CapabilityProbe::refresh`] is called.

use async_trait::async_trait;
use std::process::Stdio;
use std::sync::RwLock;
use tokio::process::Command;
use tracing::{info, warn};

use reelmix_models::encoding::NVENC_VIDEO_CODEC;

/// Answers whether the hardware encoder path should be attempted.
#[async_trait]
pub trait CapabilityProbe: Send + Sync {
    /// Cached answer; the first call performs the detection.
    async fn gpu_available(&self) -> bool;

    /// Drop the cached answer and detect again.
    async fn refresh(&self) -> bool;
}

/// Probe that always returns a fixed answer.
#[derive(Debug, Clone, Copy)]
pub struct StaticCapability(pub bool);

#[async_trait]
impl CapabilityProbe for StaticCapability {
    async fn gpu_available(&self) -> bool {
        self.0
    }

    async fn refresh(&self) -> bool {
        self.0
    }
}

/// Detects NVENC by listing encoders and running a one-frame test encode.
///
/// A build can list `h264_nvenc` without a usable device, so the listing
/// alone is not enough.
#[derive(Debug, Default)]
pub struct FfmpegCapabilityProbe {
    cached: RwLock<Option<bool>>,
}

impl FfmpegCapabilityProbe {
    pub fn new() -> Self {
        Self::default()
    }

    async fn detect() -> bool {
        let listing = match Command::new("ffmpeg")
            .args(["-hide_banner", "-encoders"])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
        {
            Ok(output) if output.status.success() => {
                String::from_utf8_lossy(&output.stdout).into_owned()
            }
            Ok(_) | Err(_) => {
                warn!("Could not list FFmpeg encoders, assuming no hardware encoder");
                return false;
            }
        };

        if !lists_encoder(&listing, NVENC_VIDEO_CODEC) {
            info!("FFmpeg build has no {} encoder", NVENC_VIDEO_CODEC);
            return false;
        }

        let smoke = Command::new("ffmpeg")
            .args([
                "-hide_banner",
                "-v",
                "error",
                "-f",
                "lavfi",
                "-i",
                "color=c=black:s=256x256:d=0.1",
                "-frames:v",
                "1",
                "-c:v",
                NVENC_VIDEO_CODEC,
                "-f",
                "null",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        let usable = matches!(smoke, Ok(status) if status.success());
        if usable {
            info!("Hardware encoder {} available", NVENC_VIDEO_CODEC);
        } else {
            warn!("{} listed but test encode failed, using CPU encoding", NVENC_VIDEO_CODEC);
        }
        usable
    }

    fn read_cached(&self) -> Option<bool> {
        self.cached.read().ok().and_then(|guard| *guard)
    }

    fn store(&self, value: Option<bool>) {
        if let Ok(mut guard) = self.cached.write() {
            *guard = value;
        }
    }
}

#[async_trait]
impl CapabilityProbe for FfmpegCapabilityProbe {
    async fn gpu_available(&self) -> bool {
        if let Some(cached) = self.read_cached() {
            return cached;
        }
        let detected = Self::detect().await;
        self.store(Some(detected));
        detected
    }

    async fn refresh(&self) -> bool {
        self.store(None);
        self.gpu_available().await
    }
}

/// Whether `ffmpeg -encoders` output lists the named encoder.
///
/// Lines look like ` V....D h264_nvenc           NVIDIA NVENC H.264 encoder`.
fn lists_encoder(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .any(|encoder| encoder == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = "Encoders:
 V..... = Video
 ------
 V....D libx264              libx264 H.264 / AVC / MPEG-4 AVC
 V....D h264_nvenc           NVIDIA NVENC H.264 encoder (codec h264)
 A....D aac                  AAC (Advanced Audio Coding)
";

    #[test]
    fn test_lists_encoder() {
        assert!(lists_encoder(LISTING, "h264_nvenc"));
        assert!(lists_encoder(LISTING, "libx264"));
        assert!(!lists_encoder(LISTING, "hevc_nvenc"));
        // Substring of a description is not a match
        assert!(!lists_encoder(LISTING, "NVIDIA"));
    }

    #[tokio::test]
    async fn test_static_capability() {
        assert!(StaticCapability(true).gpu_available().await);
        assert!(!StaticCapability(false).refresh().await);
    }

    #[tokio::test]
    async fn test_cached_value_is_reused() {
        let probe = FfmpegCapabilityProbe::new();
        probe.store(Some(true));
        assert!(probe.gpu_available().await);
    }
}
