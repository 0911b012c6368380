//! In-process fakes for the FFmpeg seams.
//!
//! Enabled for this crate's tests and, through the `test-util` feature, for
//! downstream crates. Nothing here spawns a process.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::command::{FfmpegCommand, FfmpegExecutor};
use crate::error::{MediaError, MediaResult};
use crate::probe::{MediaInfo, MediaProber};

const FAKE_MARKER: &str = "fake-media duration=";

#[derive(Debug, Default)]
struct ExecutorState {
    commands: Vec<Vec<String>>,
}

/// Executor that writes a small marker file instead of running FFmpeg.
///
/// The marker records the duration the command asked for (the last `-t`
/// value, or the sum of the inputs' marker durations when absent) so that
/// [`FakeProber`] can report it back.
#[derive(Debug, Clone, Default)]
pub struct FakeExecutor {
    state: Arc<Mutex<ExecutorState>>,
    fail_codecs: Vec<String>,
    fail_inputs: Vec<PathBuf>,
    fail_outputs_containing: Vec<String>,
    fail_all: bool,
    empty_outputs: bool,
}

impl FakeExecutor {
    /// Fail any command that selects this codec.
    pub fn fail_codec(mut self, codec: impl Into<String>) -> Self {
        self.fail_codecs.push(codec.into());
        self
    }

    /// Fail any command reading this input.
    pub fn fail_input(mut self, path: impl Into<PathBuf>) -> Self {
        self.fail_inputs.push(path.into());
        self
    }

    /// Fail any command whose output file name contains `fragment`.
    pub fn fail_output_containing(mut self, fragment: impl Into<String>) -> Self {
        self.fail_outputs_containing.push(fragment.into());
        self
    }

    /// Fail every command.
    pub fn fail_all(mut self) -> Self {
        self.fail_all = true;
        self
    }

    /// Report success but leave a zero-length output.
    pub fn empty_outputs(mut self) -> Self {
        self.empty_outputs = true;
        self
    }

    /// Number of commands executed (including failed ones).
    pub fn calls(&self) -> usize {
        self.lock().commands.len()
    }

    /// Arguments of every executed command, in order.
    pub fn commands(&self) -> Vec<Vec<String>> {
        self.lock().commands.clone()
    }

    pub fn last_args(&self) -> Option<Vec<String>> {
        self.lock().commands.last().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ExecutorState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn should_fail(&self, cmd: &FfmpegCommand, args: &[String]) -> bool {
        if self.fail_all {
            return true;
        }
        if args.iter().any(|a| self.fail_codecs.contains(a)) {
            return true;
        }
        if cmd
            .input_paths()
            .any(|p| self.fail_inputs.iter().any(|f| f == p))
        {
            return true;
        }
        let output_name = cmd
            .output_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.fail_outputs_containing
            .iter()
            .any(|frag| output_name.contains(frag.as_str()))
    }
}

/// Duration requested by a command's last `-t`.
fn requested_duration(args: &[String]) -> Option<f64> {
    args.windows(2)
        .filter(|w| w[0] == "-t")
        .filter_map(|w| w[1].parse::<f64>().ok())
        .last()
}

/// Duration recorded in a marker file.
pub fn marker_duration(path: &Path) -> Option<f64> {
    let content = std::fs::read_to_string(path).ok()?;
    content.strip_prefix(FAKE_MARKER)?.trim().parse().ok()
}

#[async_trait]
impl FfmpegExecutor for FakeExecutor {
    async fn execute(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        let args = cmd.build_args();
        self.lock().commands.push(args.clone());

        if self.should_fail(cmd, &args) {
            return Err(MediaError::ffmpeg_failed(
                "fake encoder failure",
                None,
                Some(1),
            ));
        }

        let output = cmd.output_path();
        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if self.empty_outputs {
            tokio::fs::write(output, b"").await?;
            return Ok(());
        }

        let duration = requested_duration(cmd.output_arguments())
            .or_else(|| requested_duration(&args))
            .unwrap_or_else(|| cmd.input_paths().filter_map(marker_duration).sum());
        tokio::fs::write(output, format!("{}{:.3}", FAKE_MARKER, duration)).await?;
        Ok(())
    }
}

/// Prober answering from a table, then from marker files.
#[derive(Debug, Clone, Default)]
pub struct FakeProber {
    known: HashMap<PathBuf, MediaInfo>,
    broken: Vec<PathBuf>,
}

impl FakeProber {
    /// 1280x720 30 fps video without audio.
    pub fn video_info(duration: f64) -> MediaInfo {
        MediaInfo {
            duration,
            width: 1280,
            height: 720,
            fps: 30.0,
            video_codec: Some("h264".into()),
            has_audio: false,
        }
    }

    pub fn audio_info(duration: f64) -> MediaInfo {
        MediaInfo {
            duration,
            has_audio: true,
            ..Default::default()
        }
    }

    pub fn video(path: impl Into<PathBuf>, duration: f64) -> Self {
        Self::default().with_video(path, duration)
    }

    pub fn with_video(self, path: impl Into<PathBuf>, duration: f64) -> Self {
        self.with_info(path, Self::video_info(duration))
    }

    pub fn with_audio(self, path: impl Into<PathBuf>, duration: f64) -> Self {
        self.with_info(path, Self::audio_info(duration))
    }

    pub fn with_info(mut self, path: impl Into<PathBuf>, info: MediaInfo) -> Self {
        self.known.insert(path.into(), info);
        self
    }

    /// Make probing this path fail.
    pub fn with_broken(mut self, path: impl Into<PathBuf>) -> Self {
        self.broken.push(path.into());
        self
    }
}

#[async_trait]
impl MediaProber for FakeProber {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        if self.broken.iter().any(|b| b == path) {
            return Err(MediaError::FfprobeFailed {
                message: format!("FFprobe failed for {}", path.display()),
                stderr: None,
            });
        }
        if let Some(info) = self.known.get(path) {
            return Ok(info.clone());
        }
        match marker_duration(path) {
            Some(duration) => Ok(Self::video_info(duration)),
            None => Err(MediaError::FileNotFound(path.to_path_buf())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_fake_executor_writes_marker() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("o.mp4");
        let cmd = FfmpegCommand::new("in.mp4", &out).duration(4.5);

        let executor = FakeExecutor::default();
        executor.execute(&cmd).await.unwrap();

        assert_eq!(marker_duration(&out), Some(4.5));
        let info = FakeProber::default().probe(&out).await.unwrap();
        assert_eq!(info.duration, 4.5);
    }
}
