//! Encoder settings shared by every encode in a process.

use reelmix_models::encoding::{DEFAULT_TARGET_FPS, DEFAULT_TARGET_HEIGHT};
use reelmix_models::{EncodingProfile, QualityTier};

use crate::fallback::EncodeStrategy;

/// Target format and quality for normalized clips and merged outputs.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderSettings {
    pub tier: QualityTier,
    pub target_fps: u32,
    pub target_width: Option<u32>,
    pub target_height: u32,
    /// Thread count handed to the CPU encoder
    pub cpu_threads: usize,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            tier: QualityTier::default(),
            target_fps: DEFAULT_TARGET_FPS,
            target_width: None,
            target_height: DEFAULT_TARGET_HEIGHT,
            cpu_threads: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

impl EncoderSettings {
    /// Profile used for one attempt of the given strategy.
    ///
    /// `Copy` has no encoder settings of its own; its re-encode fallback is the
    /// CPU profile.
    pub fn profile(&self, strategy: EncodeStrategy) -> EncodingProfile {
        let base = match strategy {
            EncodeStrategy::Gpu => EncodingProfile::gpu(self.tier),
            EncodeStrategy::Cpu | EncodeStrategy::Copy => {
                EncodingProfile::cpu(self.tier).with_threads(self.cpu_threads)
            }
        };
        base.with_fps(self.target_fps)
            .with_size(self.target_width, self.target_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_per_strategy() {
        let settings = EncoderSettings {
            tier: QualityTier::High,
            target_fps: 25,
            target_width: None,
            target_height: 540,
            cpu_threads: 6,
        };

        let gpu = settings.profile(EncodeStrategy::Gpu);
        assert!(gpu.hardware);
        assert_eq!(gpu.target_fps, 25);
        assert_eq!(gpu.threads, None);

        let cpu = settings.profile(EncodeStrategy::Cpu);
        assert_eq!(cpu.codec, "libx264");
        assert_eq!(cpu.threads, Some(6));
        assert_eq!(cpu.target_height, 540);
    }
}
