//! Crossfade concatenation of normalized clips.
//!
//! Clips are placed on a common canvas, then joined with a chain of `xfade`
//! filters so that the tail of each clip overlaps the head of the next. The
//! final stream is encoded once, hardware first, without audio.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::capability::CapabilityProbe;
use crate::command::{FfmpegCommand, FfmpegExecutor};
use crate::error::{MediaError, MediaResult};
use crate::fallback::{EncodeStrategy, FallbackPolicy};
use crate::fs_utils::{ensure_output, remove_if_exists};
use crate::metrics;
use crate::probe::MediaProber;
use crate::settings::EncoderSettings;

/// Default crossfade length in seconds.
pub const DEFAULT_TRANSITION_SECS: f64 = 0.3;

/// Label of the final video stream in the filter graph.
const OUTPUT_LABEL: &str = "vout";

/// A clip that probed successfully and can take part in the merge.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedClip {
    pub path: PathBuf,
    pub duration: f64,
    pub width: u32,
    pub height: u32,
}

/// Filter graph joining a list of loaded clips.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionGraph {
    pub filter: String,
    /// Crossfade actually applied (clamped to half the shortest clip)
    pub transition_secs: f64,
    /// Length of the merged stream
    pub total_duration: f64,
    pub canvas: (u32, u32),
}

/// Loads, joins and encodes clips into one output.
#[derive(Clone)]
pub struct ConcatEngine {
    executor: Arc<dyn FfmpegExecutor>,
    prober: Arc<dyn MediaProber>,
    capability: Arc<dyn CapabilityProbe>,
    settings: EncoderSettings,
    transition_secs: f64,
}

impl ConcatEngine {
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
            transition_secs: DEFAULT_TRANSITION_SECS,
        }
    }

    pub fn with_transition(mut self, secs: f64) -> Self {
        self.transition_secs = secs.max(0.0);
        self
    }

    /// Probe clips in order, skipping the ones that cannot be read.
    pub async fn load(&self, clips: &[PathBuf]) -> MediaResult<Vec<LoadedClip>> {
        let mut loaded = Vec::with_capacity(clips.len());

        for path in clips {
            let probed = self
                .prober
                .probe(path)
                .await
                .and_then(|info| info.ensure_video(path).map(|_| info));
            match probed {
                Ok(info) => loaded.push(LoadedClip {
                    path: path.clone(),
                    duration: info.duration,
                    width: info.width,
                    height: info.height,
                }),
                Err(e) => warn!(clip = %path.display(), error = %e, "Skipping clip that failed to load"),
            }
        }

        if loaded.is_empty() {
            return Err(MediaError::NoUsableClips);
        }
        Ok(loaded)
    }

    /// Build the crossfade graph for `clips` (must be non-empty).
    pub fn build_graph(&self, clips: &[LoadedClip]) -> MediaResult<TransitionGraph> {
        if clips.is_empty() {
            return Err(MediaError::NoUsableClips);
        }

        let canvas = self.canvas(clips);
        let fps = self.settings.target_fps;
        let mut filter = String::new();

        for idx in 0..clips.len() {
            let _ = write!(
                filter,
                "[{idx}:v]fps={fps},scale={w}:{h}:force_original_aspect_ratio=decrease,\
                 pad={w}:{h}:(ow-iw)/2:(oh-ih)/2,setsar=1,format=yuv420p,settb=AVTB[v{idx}];",
                w = canvas.0,
                h = canvas.1,
            );
        }

        let shortest = clips
            .iter()
            .map(|c| c.duration)
            .fold(f64::INFINITY, f64::min);
        let transition = self.transition_secs.min(shortest / 2.0).max(0.0);
        let total: f64 = clips.iter().map(|c| c.duration).sum::<f64>()
            - transition * (clips.len() - 1) as f64;

        if clips.len() == 1 {
            let _ = write!(filter, "[v0]null[{OUTPUT_LABEL}]");
        } else if transition <= 0.0 {
            for idx in 0..clips.len() {
                let _ = write!(filter, "[v{idx}]");
            }
            let _ = write!(filter, "concat=n={}:v=1:a=0[{OUTPUT_LABEL}]", clips.len());
        } else {
            // offset_k = sum of the first k durations minus k overlaps
            let mut elapsed = clips[0].duration;
            let mut prev = "v0".to_string();
            for idx in 1..clips.len() {
                let offset = elapsed - transition * idx as f64;
                let label = if idx == clips.len() - 1 {
                    OUTPUT_LABEL.to_string()
                } else {
                    format!("x{idx}")
                };
                let _ = write!(
                    filter,
                    "[{prev}][v{idx}]xfade=transition=fade:duration={transition:.3}:offset={offset:.3}[{label}]"
                );
                if idx != clips.len() - 1 {
                    filter.push(';');
                }
                elapsed += clips[idx].duration;
                prev = label;
            }
        }

        Ok(TransitionGraph {
            filter,
            transition_secs: transition,
            total_duration: total,
            canvas,
        })
    }

    /// Encode the graph into `output`, GPU first.
    ///
    /// Failure here is fatal for this output.
    pub async fn encode(
        &self,
        clips: &[LoadedClip],
        graph: &TransitionGraph,
        output: &Path,
    ) -> MediaResult<EncodeStrategy> {
        let gpu = self.capability.gpu_available().await;

        let result = FallbackPolicy::encode(gpu)
            .run(move |strategy| async move {
                remove_if_exists(output).await?;
                let cmd = self.build_command(clips, graph, output, strategy);
                self.executor.execute(&cmd).await?;
                ensure_output(output).await
            })
            .await;

        match result {
            Ok((strategy, ())) => {
                metrics::record_merge(true);
                info!(
                    output = %output.display(),
                    clips = clips.len(),
                    duration = graph.total_duration,
                    strategy = %strategy,
                    "Merged clips"
                );
                Ok(strategy)
            }
            Err(e) => {
                metrics::record_merge(false);
                let _ = remove_if_exists(output).await;
                Err(e)
            }
        }
    }

    /// Load, join and encode in one call.
    pub async fn concat(&self, clips: &[PathBuf], output: &Path) -> MediaResult<TransitionGraph> {
        let loaded = self.load(clips).await?;
        let graph = self.build_graph(&loaded)?;
        self.encode(&loaded, &graph, output).await?;
        Ok(graph)
    }

    pub fn build_command(
        &self,
        clips: &[LoadedClip],
        graph: &TransitionGraph,
        output: &Path,
        strategy: EncodeStrategy,
    ) -> FfmpegCommand {
        let profile = self.settings.profile(strategy);
        FfmpegCommand::with_inputs(clips.iter().map(|c| c.path.as_path()), output)
            .filter_complex(graph.filter.clone())
            .map(format!("[{OUTPUT_LABEL}]"))
            .output_args(profile.to_ffmpeg_args())
            .no_audio()
            .output_duration(graph.total_duration)
            .output_args(["-movflags", "+faststart"])
    }

    /// Common frame size for every clip.
    ///
    /// An explicit target width wins. Otherwise the canvas is as wide as the
    /// widest clip once scaled to the target height.
    fn canvas(&self, clips: &[LoadedClip]) -> (u32, u32) {
        let height = self.settings.target_height;
        if let Some(width) = self.settings.target_width {
            return (width, height);
        }
        let widest = clips
            .iter()
            .filter(|c| c.height > 0)
            .map(|c| (c.width as f64 * height as f64 / c.height as f64).round() as u32)
            .max()
            .unwrap_or(height * 16 / 9);
        (widest + widest % 2, height)
    }
}
