//! Audio track replacement and voice-over mixing.

use std::path::Path;
use std::sync::Arc;
use tracing::info;

use reelmix_models::encoding::{DEFAULT_AUDIO_BITRATE, DEFAULT_AUDIO_CODEC};

use crate::command::{FfmpegCommand, FfmpegExecutor};
use crate::error::{MediaError, MediaResult};
use crate::fallback::{EncodeStrategy, FallbackPolicy};
use crate::fs_utils::{ensure_output, remove_if_exists};
use crate::probe::{MediaInfo, MediaProber};
use crate::settings::EncoderSettings;

/// Where the audio comes from and how it is shaped.
#[derive(Debug, Clone, Copy)]
enum AudioPlan {
    /// Replace the video's audio with `[offset, offset + video)` of the track
    Replace { offset: f64 },
    /// Keep the original audio at `volume` (0.0-1.0) and lay the voice on top
    Mix { volume: f64, keep_original: bool },
}

/// Lays separate audio under a video, copying the video stream when possible.
#[derive(Clone)]
pub struct AudioMuxer {
    executor: Arc<dyn FfmpegExecutor>,
    prober: Arc<dyn MediaProber>,
    settings: EncoderSettings,
}

impl AudioMuxer {
    pub fn new(
        executor: Arc<dyn FfmpegExecutor>,
        prober: Arc<dyn MediaProber>,
        settings: EncoderSettings,
    ) -> Self {
        Self {
            executor,
            prober,
            settings,
        }
    }

    /// Probe a video input.
    pub async fn probe_video(&self, path: &Path) -> MediaResult<MediaInfo> {
        let info = self
            .prober
            .probe(path)
            .await
            .map_err(|e| MediaError::invalid_media(path, e.to_string()))?;
        info.ensure_video(path)?;
        Ok(info)
    }

    /// Probe an audio input.
    pub async fn probe_audio(&self, path: &Path) -> MediaResult<MediaInfo> {
        let info = self
            .prober
            .probe(path)
            .await
            .map_err(|e| MediaError::invalid_media(path, e.to_string()))?;
        info.ensure_audio(path)?;
        Ok(info)
    }

    /// Replace the audio of `video` with `audio` starting at `audio_offset`.
    ///
    /// The audio is cut to the video's duration; a shorter track leaves the
    /// remainder silent.
    pub async fn replace_audio(
        &self,
        video: &Path,
        audio: &Path,
        audio_offset: f64,
        output: &Path,
    ) -> MediaResult<EncodeStrategy> {
        let video_info = self.probe_video(video).await?;
        let audio_info = self.probe_audio(audio).await?;
        let offset = audio_offset.clamp(0.0, (audio_info.duration - 0.001).max(0.0));

        self.run(
            video,
            audio,
            video_info.duration,
            AudioPlan::Replace { offset },
            output,
        )
        .await
    }

    /// Mix `voice` over the original audio of `video`.
    ///
    /// `volume_percent` scales the original track (0-100). A video without
    /// audio gets the voice as its only track.
    pub async fn mix_voice(
        &self,
        video: &Path,
        voice: &Path,
        volume_percent: f64,
        output: &Path,
    ) -> MediaResult<EncodeStrategy> {
        let video_info = self.probe_video(video).await?;
        self.probe_audio(voice).await?;

        let plan = AudioPlan::Mix {
            volume: (volume_percent / 100.0).clamp(0.0, 1.0),
            keep_original: video_info.has_audio,
        };
        self.run(video, voice, video_info.duration, plan, output).await
    }

    async fn run(
        &self,
        video: &Path,
        audio: &Path,
        duration: f64,
        plan: AudioPlan,
        output: &Path,
    ) -> MediaResult<EncodeStrategy> {
        let result = FallbackPolicy::remux()
            .run(move |strategy| async move {
                remove_if_exists(output).await?;
                let cmd = self.build_command(video, audio, duration, plan, output, strategy);
                self.executor.execute(&cmd).await?;
                ensure_output(output).await
            })
            .await;

        let strategy = match result {
            Ok((strategy, ())) => strategy,
            Err(e) => {
                let _ = remove_if_exists(output).await;
                return Err(e);
            }
        };

        info!(
            video = %video.display(),
            audio = %audio.display(),
            output = %output.display(),
            strategy = %strategy,
            "Muxed audio"
        );
        Ok(strategy)
    }

    fn build_command(
        &self,
        video: &Path,
        audio: &Path,
        duration: f64,
        plan: AudioPlan,
        output: &Path,
        strategy: EncodeStrategy,
    ) -> FfmpegCommand {
        let cmd = FfmpegCommand::new(video, output);

        let cmd = match plan {
            AudioPlan::Replace { offset } => cmd
                .add_input(audio)
                .seek(offset)
                .map("0:v:0")
                .map("1:a:0"),
            AudioPlan::Mix {
                volume,
                keep_original,
            } => {
                let voice = format!("[1:a]atrim=0:{duration:.3},asetpts=PTS-STARTPTS");
                let graph = if keep_original {
                    // amix halves each input; the trailing volume restores unity gain
                    format!(
                        "[0:a]volume={volume:.2}[orig];{voice}[voice];\
                         [orig][voice]amix=inputs=2:duration=first:dropout_transition=0,volume=2[aout]"
                    )
                } else {
                    format!("{voice}[aout]")
                };
                cmd.add_input(audio)
                    .filter_complex(graph)
                    .map("0:v:0")
                    .map("[aout]")
            }
        };

        let cmd = match strategy {
            EncodeStrategy::Copy => cmd.video_codec("copy"),
            EncodeStrategy::Gpu | EncodeStrategy::Cpu => {
                cmd.output_args(self.settings.profile(strategy).to_ffmpeg_args())
            }
        };

        cmd.audio_codec(DEFAULT_AUDIO_CODEC)
            .audio_bitrate(DEFAULT_AUDIO_BITRATE)
            .output_duration(duration)
            .output_args(["-movflags", "+faststart"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeExecutor, FakeProber};
    use tempfile::TempDir;

    fn muxer(executor: FakeExecutor, prober: FakeProber) -> AudioMuxer {
        AudioMuxer::new(Arc::new(executor), Arc::new(prober), EncoderSettings::default())
    }

    fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
        args.iter()
            .position(|a| a == flag)
            .map(|i| args[i + 1].as_str())
    }

    #[tokio::test]
    async fn test_replace_audio_copies_video_and_cuts_to_length() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("merged.mp4");
        let prober = FakeProber::default()
            .with_video("v.mp4", 12.0)
            .with_audio("a.mp3", 60.0);
        let executor = FakeExecutor::default();

        let strategy = muxer(executor.clone(), prober)
            .replace_audio(Path::new("v.mp4"), Path::new("a.mp3"), 20.0, &out)
            .await
            .unwrap();

        assert_eq!(strategy, EncodeStrategy::Copy);
        let args = executor.last_args().unwrap();
        assert_eq!(arg_after(&args, "-c:v"), Some("copy"));
        assert_eq!(arg_after(&args, "-ss"), Some("20.000"));
        assert_eq!(arg_after(&args, "-t"), Some("12.000"));
        assert!(args.contains(&"1:a:0".to_string()));
    }

    #[tokio::test]
    async fn test_copy_rejected_falls_back_to_reencode() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("merged.mp4");
        let prober = FakeProber::default()
            .with_video("v.mp4", 5.0)
            .with_audio("a.mp3", 3.0);
        let executor = FakeExecutor::default().fail_codec("copy");

        let strategy = muxer(executor.clone(), prober)
            .replace_audio(Path::new("v.mp4"), Path::new("a.mp3"), 0.0, &out)
            .await
            .unwrap();

        assert_eq!(strategy, EncodeStrategy::Cpu);
        assert_eq!(executor.calls(), 2);
    }

    #[tokio::test]
    async fn test_mix_voice_scales_original() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("voice.mp4");
        let mut video = FakeProber::video_info(10.0);
        video.has_audio = true;
        let prober = FakeProber::default()
            .with_info("v.mp4", video)
            .with_audio("voice.mp3", 30.0);
        let executor = FakeExecutor::default();

        muxer(executor.clone(), prober)
            .mix_voice(Path::new("v.mp4"), Path::new("voice.mp3"), 40.0, &out)
            .await
            .unwrap();

        let args = executor.last_args().unwrap();
        let graph = arg_after(&args, "-filter_complex").unwrap();
        assert!(graph.starts_with("[0:a]volume=0.40[orig]"));
        assert!(graph.contains("atrim=0:10.000"));
        assert!(graph.contains("amix=inputs=2"));
    }

    #[tokio::test]
    async fn test_mix_voice_without_original_audio() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("voice.mp4");
        let prober = FakeProber::default()
            .with_video("v.mp4", 10.0)
            .with_audio("voice.mp3", 4.0);
        let executor = FakeExecutor::default();

        muxer(executor.clone(), prober)
            .mix_voice(Path::new("v.mp4"), Path::new("voice.mp3"), 100.0, &out)
            .await
            .unwrap();

        let args = executor.last_args().unwrap();
        let graph = arg_after(&args, "-filter_complex").unwrap();
        assert!(!graph.contains("amix"));
        assert!(graph.ends_with("[aout]"));
    }

    #[tokio::test]
    async fn test_undecodable_audio_is_invalid_media() {
        let dir = TempDir::new().unwrap();
        let prober = FakeProber::default()
            .with_video("v.mp4", 10.0)
            .with_broken("voice.mp3");

        let err = muxer(FakeExecutor::default(), prober)
            .mix_voice(
                Path::new("v.mp4"),
                Path::new("voice.mp3"),
                50.0,
                &dir.path().join("o.mp4"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidMedia { .. }));
    }
}
