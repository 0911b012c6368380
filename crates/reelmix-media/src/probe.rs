//! FFprobe media information.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use crate::command::check_ffprobe;
use crate::error::{MediaError, MediaResult};

/// Media file information.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels (0 without a video stream)
    pub width: u32,
    /// Height in pixels (0 without a video stream)
    pub height: u32,
    /// Frame rate (fps), 0 without a video stream
    pub fps: f64,
    /// Video codec name, if any
    pub video_codec: Option<String>,
    /// Whether an audio stream is present
    pub has_audio: bool,
}

impl MediaInfo {
    pub fn has_video(&self) -> bool {
        self.video_codec.is_some()
    }

    /// Reject sources the normalizer cannot decode into frames.
    pub fn ensure_video(&self, path: &Path) -> MediaResult<()> {
        if !self.has_video() {
            return Err(MediaError::invalid_media(path, "no video stream"));
        }
        if self.duration <= 0.0 {
            return Err(MediaError::invalid_media(path, "duration is zero"));
        }
        if self.fps <= 0.0 {
            return Err(MediaError::invalid_media(path, "frame rate is zero"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(MediaError::invalid_media(path, "frame size is zero"));
        }
        Ok(())
    }

    /// Reject files with no decodable audio.
    pub fn ensure_audio(&self, path: &Path) -> MediaResult<()> {
        if !self.has_audio {
            return Err(MediaError::invalid_media(path, "no audio stream"));
        }
        if self.duration <= 0.0 {
            return Err(MediaError::invalid_media(path, "duration is zero"));
        }
        Ok(())
    }
}

/// Reads stream information from a media file.
#[async_trait]
pub trait MediaProber: Send + Sync {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo>;
}

/// [`MediaProber`] backed by the `ffprobe` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeProber;

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe(&self, path: &Path) -> MediaResult<MediaInfo> {
        probe_media(path).await
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    duration: Option<String>,
}

/// Probe a media file for information.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    check_ffprobe()?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: format!("FFprobe failed for {}", path.display()),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(media_info_from(&probe))
}

fn media_info_from(probe: &FfprobeOutput) -> MediaInfo {
    let video = probe.streams.iter().find(|s| s.codec_type == "video");
    let has_audio = probe.streams.iter().any(|s| s.codec_type == "audio");

    // Container duration first; some muxers only carry it per stream
    let duration = probe
        .format
        .duration
        .as_deref()
        .and_then(|d| d.parse::<f64>().ok())
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref()?.parse::<f64>().ok())
                .reduce(f64::max)
        })
        .unwrap_or(0.0);

    let Some(video) = video else {
        return MediaInfo {
            duration,
            has_audio,
            ..Default::default()
        };
    };

    let fps = video
        .avg_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .filter(|fps| *fps > 0.0)
        .or_else(|| video.r_frame_rate.as_deref().and_then(parse_frame_rate))
        .unwrap_or(0.0);

    MediaInfo {
        duration,
        width: video.width.unwrap_or(0),
        height: video.height.unwrap_or(0),
        fps,
        video_codec: Some(video.codec_name.clone().unwrap_or_default()),
        has_audio,
    }
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_media_info_from_video_json() {
        let json = r#"{
            "format": {"duration": "12.480000"},
            "streams": [
                {"codec_type": "video", "codec_name": "h264", "width": 1920, "height": 1080,
                 "avg_frame_rate": "30/1", "r_frame_rate": "30/1"},
                {"codec_type": "audio", "codec_name": "aac"}
            ]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let info = media_info_from(&probe);
        assert!((info.duration - 12.48).abs() < 0.001);
        assert_eq!((info.width, info.height), (1920, 1080));
        assert!(info.has_video());
        assert!(info.has_audio);
        assert!(info.ensure_video(Path::new("a.mp4")).is_ok());
    }

    #[test]
    fn test_media_info_from_audio_json() {
        let json = r#"{
            "format": {},
            "streams": [{"codec_type": "audio", "codec_name": "mp3", "duration": "42.5"}]
        }"#;
        let probe: FfprobeOutput = serde_json::from_str(json).unwrap();
        let info = media_info_from(&probe);
        assert!(!info.has_video());
        assert_eq!(info.duration, 42.5);
        assert!(info.ensure_audio(Path::new("a.mp3")).is_ok());
        assert!(matches!(
            info.ensure_video(Path::new("a.mp3")),
            Err(MediaError::InvalidMedia { .. })
        ));
    }

    #[test]
    fn test_zero_fps_rejected() {
        let info = MediaInfo {
            duration: 5.0,
            width: 640,
            height: 360,
            fps: 0.0,
            video_codec: Some("h264".into()),
            has_audio: false,
        };
        let err = info.ensure_video(Path::new("broken.mp4")).unwrap_err();
        assert!(err.to_string().contains("frame rate is zero"));
    }
}
