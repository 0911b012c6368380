//! Per-clip normalization.
//!
//! A clip is trimmed, resampled to the target frame rate, scaled to the
//! target size and re-encoded without audio. The hardware encoder is tried
//! first when available; a clip that no encoder can produce falls back to its
//! unmodified source so one bad clip never sinks a merge.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use reelmix_models::{TrimSpec, TrimWindow};

use crate::capability::CapabilityProbe;
use crate::command::{FfmpegCommand, FfmpegExecutor};
use crate::error::{MediaError, MediaResult};
use crate::fallback::{EncodeStrategy, FallbackPolicy};
use crate::fs_utils::{ensure_output, remove_if_exists};
use crate::metrics;
use crate::probe::MediaProber;
use crate::settings::EncoderSettings;

/// Result of normalizing one clip.
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizeOutcome {
    /// A freshly encoded clip at the requested output path
    Normalized {
        path: PathBuf,
        window: TrimWindow,
        strategy: EncodeStrategy,
    },
    /// Every encode failed; the untouched source stands in for the clip
    Original { path: PathBuf, reason: String },
}

impl NormalizeOutcome {
    /// File to use downstream.
    pub fn path(&self) -> &Path {
        match self {
            NormalizeOutcome::Normalized { path, .. } | NormalizeOutcome::Original { path, .. } => {
                path
            }
        }
    }

    pub fn is_normalized(&self) -> bool {
        matches!(self, NormalizeOutcome::Normalized { .. })
    }
}

/// Trims and re-encodes clips to a uniform format.
#[derive(Clone)]
pub struct ClipNormalizer {
    executor: Arc<dyn FfmpegExecutor>,
    prober: Arc<dyn MediaProber>,
    capability: Arc<dyn CapabilityProbe>,
    settings: EncoderSettings,
}

impl ClipNormalizer {
    pub fn new(
        executor: Arc<dyn FfmpegExecutor>,
        prober: Arc<dyn MediaProber>,
        capability: Arc<dyn CapabilityProbe>,
        settings: EncoderSettings,
    ) -> Self {
        Self {
            executor,
            prober,
            capability,
            settings,
        }
    }

    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }

    /// Validate `source` and resolve the trim against its real duration.
    ///
    /// Fails with [`MediaError::InvalidMedia`] for undecodable sources and
    /// for trims that are empty after clamping.
    pub async fn resolve(&self, source: &Path, trim: Option<TrimSpec>) -> MediaResult<TrimWindow> {
        if !source.exists() {
            return Err(MediaError::FileNotFound(source.to_path_buf()));
        }

        let info = self
            .prober
            .probe(source)
            .await
            .map_err(|e| MediaError::invalid_media(source, e.to_string()))?;
        info.ensure_video(source)?;

        trim.unwrap_or_else(TrimSpec::whole)
            .clamp(info.duration)
            .map_err(|e| MediaError::invalid_media(source, e.to_string()))
    }

    /// Normalize `source` into `output`.
    ///
    /// Errors are returned only for invalid input. Encode failures yield
    /// [`NormalizeOutcome::Original`].
    pub async fn normalize(
        &self,
        source: &Path,
        trim: Option<TrimSpec>,
        output: &Path,
    ) -> MediaResult<NormalizeOutcome> {
        let window = self.resolve(source, trim).await?;
        let gpu = self.capability.gpu_available().await;

        debug!(
            source = %source.display(),
            start = window.start,
            end = window.end,
            gpu,
            "Normalizing clip"
        );

        let result = FallbackPolicy::encode(gpu)
            .run(move |strategy| self.encode_attempt(source, window, output, strategy))
            .await;

        match result {
            Ok((strategy, ())) => {
                metrics::record_clip_normalized(strategy.as_str());
                Ok(NormalizeOutcome::Normalized {
                    path: output.to_path_buf(),
                    window,
                    strategy,
                })
            }
            Err(e) => {
                let _ = remove_if_exists(output).await;
                warn!(
                    source = %source.display(),
                    error = %e,
                    "Normalization failed, using original clip"
                );
                metrics::record_clip_substituted();
                Ok(NormalizeOutcome::Original {
                    path: source.to_path_buf(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn encode_attempt(
        &self,
        source: &Path,
        window: TrimWindow,
        output: &Path,
        strategy: EncodeStrategy,
    ) -> MediaResult<()> {
        // Reset clip state left by a previous attempt
        remove_if_exists(output).await?;

        let cmd = self.build_command(source, window, output, strategy);
        self.executor.execute(&cmd).await?;
        ensure_output(output).await
    }

    /// Build the FFmpeg invocation for one attempt.
    pub fn build_command(
        &self,
        source: &Path,
        window: TrimWindow,
        output: &Path,
        strategy: EncodeStrategy,
    ) -> FfmpegCommand {
        let profile = self.settings.profile(strategy);
        let filter = format!(
            "fps={},{},setsar=1",
            profile.target_fps,
            profile.scale_filter()
        );

        FfmpegCommand::new(source, output)
            .seek(window.start)
            .duration(window.duration())
            .video_filter(filter)
            .output_args(profile.to_ffmpeg_args())
            .no_audio()
            .output_args(["-movflags", "+faststart"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::StaticCapability;
    use crate::testing::{FakeExecutor, FakeProber};
    use tempfile::TempDir;

    fn normalizer(executor: FakeExecutor, prober: FakeProber, gpu: bool) -> ClipNormalizer {
        ClipNormalizer::new(
            Arc::new(executor),
            Arc::new(prober),
            Arc::new(StaticCapability(gpu)),
            EncoderSettings {
                cpu_threads: 3,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_normalize_gpu_first() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.mp4");
        tokio::fs::write(&source, b"src").await.unwrap();
        let output = dir.path().join("a_norm.mp4");

        let executor = FakeExecutor::default();
        let n = normalizer(executor.clone(), FakeProber::video(&source, 8.0), true);

        let outcome = n
            .normalize(&source, Some(TrimSpec::new(0.0, Some(6.0))), &output)
            .await
            .unwrap();

        match outcome {
            NormalizeOutcome::Normalized { window, strategy, .. } => {
                assert_eq!(strategy, EncodeStrategy::Gpu);
                assert_eq!(window.end, 6.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(executor.calls(), 1);
        let args = executor.last_args().unwrap();
        assert!(args.contains(&"h264_nvenc".to_string()));
        assert!(args.contains(&"-an".to_string()));
    }

    #[tokio::test]
    async fn test_gpu_failure_retries_cpu_with_threads() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.mp4");
        tokio::fs::write(&source, b"src").await.unwrap();
        let output = dir.path().join("a_norm.mp4");

        let executor = FakeExecutor::default().fail_codec("h264_nvenc");
        let n = normalizer(executor.clone(), FakeProber::video(&source, 8.0), true);

        let outcome = n.normalize(&source, None, &output).await.unwrap();
        assert!(matches!(
            outcome,
            NormalizeOutcome::Normalized { strategy: EncodeStrategy::Cpu, .. }
        ));
        assert_eq!(executor.calls(), 2);
        let args = executor.last_args().unwrap();
        let threads = args.iter().position(|a| a == "-threads").unwrap();
        assert_eq!(args[threads + 1], "3");
    }

    #[tokio::test]
    async fn test_empty_output_counts_as_failure() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.mp4");
        tokio::fs::write(&source, b"src").await.unwrap();
        let output = dir.path().join("a_norm.mp4");

        let executor = FakeExecutor::default().empty_outputs();
        let n = normalizer(executor.clone(), FakeProber::video(&source, 8.0), false);

        let outcome = n.normalize(&source, None, &output).await.unwrap();
        assert!(!outcome.is_normalized());
        assert_eq!(outcome.path(), source.as_path());
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_all_encoders_fail_returns_original() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.mp4");
        tokio::fs::write(&source, b"src").await.unwrap();
        let output = dir.path().join("a_norm.mp4");

        let executor = FakeExecutor::default().fail_all();
        let n = normalizer(executor.clone(), FakeProber::video(&source, 8.0), true);

        let outcome = n.normalize(&source, None, &output).await.unwrap();
        assert!(!outcome.is_normalized());
        assert_eq!(outcome.path(), source.as_path());
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_trim_past_end_is_invalid() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("a.mp4");
        tokio::fs::write(&source, b"src").await.unwrap();

        let executor = FakeExecutor::default();
        let n = normalizer(executor.clone(), FakeProber::video(&source, 5.0), false);

        let err = n
            .normalize(&source, Some(TrimSpec::new(7.0, None)), &dir.path().join("o.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia { .. }));
        assert_eq!(executor.calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_source() {
        let dir = TempDir::new().unwrap();
        let n = normalizer(FakeExecutor::default(), FakeProber::default(), false);
        let err = n
            .normalize(&dir.path().join("gone.mp4"), None, &dir.path().join("o.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[test]
    fn test_command_shape() {
        let n = normalizer(FakeExecutor::default(), FakeProber::default(), false);
        let cmd = n.build_command(
            Path::new("in.mp4"),
            TrimWindow { start: 1.5, end: 7.5 },
            Path::new("out.mp4"),
            EncodeStrategy::Cpu,
        );
        let args = cmd.build_args();
        let vf = args.iter().position(|a| a == "-vf").unwrap();
        assert_eq!(args[vf + 1], "fps=30,scale=-2:720,setsar=1");
        let t = args.iter().position(|a| a == "-t").unwrap();
        assert_eq!(args[t + 1], "6.000");
    }
}
