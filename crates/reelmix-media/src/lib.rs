#![deny(unreachable_patterns)]
//! FFmpeg CLI wrapper for clip assembly.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building over one or more inputs
//! - Progress and diagnostics parsing from `-progress pipe:2`
//! - FFprobe stream inspection and hardware encoder detection
//! - Per-clip normalization with GPU to CPU fallback
//! - Crossfade concatenation and audio muxing

pub mod capability;
pub mod command;
pub mod error;
pub mod fallback;
pub mod fs_utils;
pub mod metrics;
pub mod mux;
pub mod normalize;
pub mod probe;
pub mod progress;
pub mod settings;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transition;

pub use capability::{CapabilityProbe, FfmpegCapabilityProbe, StaticCapability};
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegExecutor, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fallback::{EncodeStrategy, FallbackPolicy};
pub use fs_utils::move_file;
pub use mux::AudioMuxer;
pub use normalize::{ClipNormalizer, NormalizeOutcome};
pub use probe::{probe_media, FfprobeProber, MediaInfo, MediaProber};
pub use progress::FfmpegProgress;
pub use settings::EncoderSettings;
pub use transition::{ConcatEngine, LoadedClip, TransitionGraph, DEFAULT_TRANSITION_SECS};
