//! Batch orchestration.
//!
//! Drives the three job kinds end to end: folder scan, clip selection, merge
//! or mux, and moving finished files into the output folder. Every iteration
//! works inside its own temporary directory, removed on drop whether the
//! iteration succeeded or not.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use reelmix_media::{
    move_file, AudioMuxer, CapabilityProbe, ClipNormalizer, ConcatEngine, FfmpegExecutor,
    MediaProber,
};
use reelmix_models::{BatchParams, VideoAudioParams, VoiceParams};

use crate::clip_cache::ClipCache;
use crate::clip_pipeline::{ClipRequest, MergePipeline, ParallelNormalizer};
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::progress::{percent_of, ProgressSink};
use crate::scan::FolderScanner;
use crate::selection::{assign_trim, audio_offset, select_clips, AudioPicker};

/// Name of the merge result inside an iteration's temp directory.
const MERGED_FILENAME: &str = "merged.mp4";

/// Runs batch, video+audio and voice-over jobs.
pub struct BatchOrchestrator {
    config: WorkerConfig,
    scanner: FolderScanner,
    pipeline: MergePipeline,
    muxer: AudioMuxer,
    cache: ClipCache,
    rng: Mutex<StdRng>,
}

impl BatchOrchestrator {
    pub fn new(
        config: WorkerConfig,
        executor: Arc<dyn FfmpegExecutor>,
        prober: Arc<dyn MediaProber>,
        capability: Arc<dyn CapabilityProbe>,
    ) -> Self {
        let settings = config.encoder_settings();
        let cache = ClipCache::new(&config.cache_dir);

        let normalizer = ClipNormalizer::new(
            executor.clone(),
            prober.clone(),
            capability.clone(),
            settings.clone(),
        );
        let parallel =
            ParallelNormalizer::new(normalizer, cache.clone(), config.max_normalize_workers);
        let engine = ConcatEngine::new(executor.clone(), prober.clone(), capability, settings.clone())
            .with_transition(config.transition_secs);

        Self {
            scanner: FolderScanner::new(prober.clone()),
            pipeline: MergePipeline::new(parallel, engine),
            muxer: AudioMuxer::new(executor, prober, settings),
            cache,
            rng: Mutex::new(StdRng::from_os_rng()),
            config,
        }
    }

    /// Make clip and audio selection deterministic.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn scanner(&self) -> &FolderScanner {
        &self.scanner
    }

    pub fn cache(&self) -> &ClipCache {
        &self.cache
    }

    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut guard = match self.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }

    async fn scratch_dir(&self) -> WorkerResult<TempDir> {
        fs::create_dir_all(&self.config.temp_dir).await?;
        Ok(tempfile::Builder::new()
            .prefix("reelmix_")
            .tempdir_in(&self.config.temp_dir)?)
    }

    /// Move a finished file into `output_folder` under `filename`.
    async fn publish(
        &self,
        produced: &Path,
        output_folder: &Path,
        filename: String,
        sink: &dyn ProgressSink,
    ) -> WorkerResult<String> {
        move_file(produced, output_folder.join(&filename)).await?;
        sink.output_ready(&filename);
        Ok(filename)
    }

    /// Produce `output_count` merged videos from random picks of `folder`.
    ///
    /// Returns output file names in the order they were produced.
    pub async fn process_batch(
        &self,
        params: &BatchParams,
        output_folder: &Path,
        sink: &dyn ProgressSink,
    ) -> WorkerResult<Vec<String>> {
        sink.progress(0.0, Some("Scanning for videos...".to_string()));
        let videos = self.scanner.scan_videos(&params.folder).await?;
        if videos.is_empty() {
            return Err(WorkerError::NoVideosFound(params.folder.clone()));
        }
        fs::create_dir_all(output_folder).await?;

        let total = params.output_count;
        let mut outputs = Vec::with_capacity(total);
        let mut last_error: Option<WorkerError> = None;

        for i in 0..total {
            let pct = percent_of(i, total);
            sink.progress(pct, Some(format!("Processing output {} of {}...", i + 1, total)));

            let requests = self.with_rng(|rng| {
                select_clips(&videos, params.video_count, rng)
                    .iter()
                    .map(|asset| {
                        let trim = assign_trim(asset, params.video_duration, params.trim_mode, rng);
                        ClipRequest::new(asset.path.clone(), trim)
                    })
                    .collect::<Vec<_>>()
            });

            let scratch = self.scratch_dir().await?;
            let merged = scratch.path().join(MERGED_FILENAME);

            sink.progress(pct, Some("Merging videos...".to_string()));
            match self.pipeline.merge(requests, &merged).await {
                Ok(outcome) => {
                    sink.progress(pct, Some("Finalizing output...".to_string()));
                    let name = format!("output_{}_{}.mp4", i + 1, Uuid::new_v4().simple());
                    let name = self.publish(&outcome.output, output_folder, name, sink).await?;
                    info!(
                        output = %name,
                        clips = outcome.clips_used,
                        skipped = outcome.skipped.len(),
                        cache_hits = outcome.cache_hits,
                        "Batch output ready"
                    );
                    outputs.push(name);
                }
                Err(e) if e.is_batch_fatal() => return Err(e),
                Err(e) => {
                    warn!(iteration = i + 1, error = %e, "Output failed, continuing with next");
                    last_error = Some(e);
                }
            }
        }

        if outputs.is_empty() {
            let reason = last_error.map(|e| e.to_string()).unwrap_or_default();
            return Err(WorkerError::AllOutputsFailed(reason));
        }
        Ok(outputs)
    }

    /// Lay one audio track under every video of `video_folder`.
    pub async fn process_video_audio_batch(
        &self,
        params: &VideoAudioParams,
        output_folder: &Path,
        sink: &dyn ProgressSink,
    ) -> WorkerResult<Vec<String>> {
        sink.progress(0.0, Some("Scanning for videos...".to_string()));
        let videos = self.scanner.scan_videos(&params.video_folder).await?;
        if videos.is_empty() {
            return Err(WorkerError::NoVideosFound(params.video_folder.clone()));
        }

        sink.progress(0.0, Some("Scanning for audio files...".to_string()));
        let audio = self.scanner.scan_audio(&params.audio_folder).await?;
        if audio.is_empty() {
            return Err(WorkerError::NoAudioFound(params.audio_folder.clone()));
        }
        fs::create_dir_all(output_folder).await?;

        let mut picker = AudioPicker::new(audio, params.audio_selection_mode);
        let total = videos.len();
        let mut outputs = Vec::with_capacity(total);

        for (i, video) in videos.iter().enumerate() {
            sink.progress(
                percent_of(i, total),
                Some(format!("Processing video {} of {}...", i + 1, total)),
            );

            let picked = self.with_rng(|rng| {
                picker.pick(rng).map(|track| {
                    let offset =
                        audio_offset(track.duration, video.duration, params.audio_trim_mode, rng);
                    (track.path.clone(), offset)
                })
            });
            let Some((track, offset)) = picked else {
                break;
            };

            let name = format!("merged_{}_{}.mp4", i + 1, Uuid::new_v4().simple());
            let result = async {
                let scratch = self.scratch_dir().await?;
                let muxed = scratch.path().join(MERGED_FILENAME);
                let strategy = self
                    .muxer
                    .replace_audio(&video.path, &track, offset, &muxed)
                    .await?;
                let name = self.publish(&muxed, output_folder, name, sink).await?;
                Ok::<_, WorkerError>((name, strategy))
            }
            .await;

            match result {
                Ok((name, strategy)) => {
                    info!(
                        video = %video.name,
                        audio = %track.display(),
                        offset,
                        strategy = %strategy,
                        "Video/audio pair ready"
                    );
                    outputs.push(name);
                }
                Err(e) => {
                    warn!(video = %video.name, audio = %track.display(), error = %e, "Skipping video/audio pair");
                }
            }
        }

        Ok(outputs)
    }

    /// Mix a voice track over one video.
    ///
    /// Returns the path of the finished file.
    pub async fn process_voice_adder(
        &self,
        params: &VoiceParams,
        output_folder: &Path,
        sink: &dyn ProgressSink,
    ) -> WorkerResult<PathBuf> {
        sink.progress(10.0, Some("Adding voice to video...".to_string()));
        fs::create_dir_all(output_folder).await?;

        let scratch = self.scratch_dir().await?;
        let mixed = scratch.path().join(MERGED_FILENAME);
        let strategy = self
            .muxer
            .mix_voice(&params.video, &params.voice, params.volume_percent, &mixed)
            .await?;

        sink.progress(90.0, Some("Finalizing output...".to_string()));
        let name = format!("voice_{}.mp4", Uuid::new_v4().simple());
        let name = self.publish(&mixed, output_folder, name, sink).await?;
        info!(output = %name, strategy = %strategy, volume = params.volume_percent, "Voice-over ready");
        Ok(output_folder.join(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip_cache::CacheKey;
    use crate::progress::NoopProgress;
    use reelmix_media::testing::{marker_duration, FakeExecutor, FakeProber};
    use reelmix_media::StaticCapability;
    use reelmix_models::{AudioSelectionMode, TrimMode, TrimWindow};
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct RecordingSink {
        events: StdMutex<Vec<(f64, Option<String>)>>,
        outputs: StdMutex<Vec<String>>,
    }

    impl ProgressSink for RecordingSink {
        fn progress(&self, percent: f64, message: Option<String>) {
            self.events.lock().unwrap().push((percent, message));
        }

        fn output_ready(&self, filename: &str) {
            self.outputs.lock().unwrap().push(filename.to_string());
        }
    }

    struct Env {
        dir: TempDir,
        videos: PathBuf,
        audio: PathBuf,
        out: PathBuf,
    }

    impl Env {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let videos = dir.path().join("videos");
            let audio = dir.path().join("audio");
            let out = dir.path().join("out");
            std::fs::create_dir_all(&videos).unwrap();
            std::fs::create_dir_all(&audio).unwrap();
            Self {
                dir,
                videos,
                audio,
                out,
            }
        }

        fn config(&self) -> WorkerConfig {
            WorkerConfig {
                temp_dir: self.dir.path().join("temp"),
                output_dir: self.out.clone(),
                cache_dir: self.dir.path().join("cache"),
                max_normalize_workers: 2,
                ..Default::default()
            }
        }

        fn add_video(&self, prober: FakeProber, name: &str, duration: f64) -> FakeProber {
            let path = self.videos.join(name);
            std::fs::write(&path, b"src").unwrap();
            prober.with_video(path, duration)
        }

        fn add_audio(&self, prober: FakeProber, name: &str, duration: f64) -> FakeProber {
            let path = self.audio.join(name);
            std::fs::write(&path, b"src").unwrap();
            prober.with_audio(path, duration)
        }

        fn orchestrator(&self, executor: &FakeExecutor, prober: FakeProber) -> BatchOrchestrator {
            BatchOrchestrator::new(
                self.config(),
                Arc::new(executor.clone()),
                Arc::new(prober),
                Arc::new(StaticCapability(false)),
            )
            .with_seed(9)
        }
    }

    fn batch(folder: &Path, count: usize, duration: f64, outputs: usize) -> BatchParams {
        BatchParams {
            folder: folder.to_path_buf(),
            output_folder: None,
            video_count: count,
            video_duration: duration,
            output_count: outputs,
            trim_mode: TrimMode::Fixed,
        }
    }

    fn arg_after(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find(|w| w[0] == flag).map(|w| w[1].clone())
    }

    #[tokio::test]
    async fn test_batch_end_to_end() {
        let env = Env::new();
        let mut prober = FakeProber::default();
        for (name, d) in [("a.mp4", 8.0), ("b.mp4", 12.0), ("c.mp4", 5.0)] {
            prober = env.add_video(prober, name, d);
        }
        let executor = FakeExecutor::default();
        let orchestrator = env.orchestrator(&executor, prober);
        let sink = RecordingSink::default();

        let outputs = orchestrator
            .process_batch(&batch(&env.videos, 2, 6.0, 1), &env.out, &sink)
            .await
            .unwrap();

        assert_eq!(outputs.len(), 1);
        assert!(outputs[0].starts_with("output_1_") && outputs[0].ends_with(".mp4"));
        assert_eq!(*sink.outputs.lock().unwrap(), outputs);

        // two normalizations then one crossfade merge
        let commands = executor.commands();
        assert_eq!(commands.len(), 3);
        for args in &commands[..2] {
            let t: f64 = arg_after(args, "-t").unwrap().parse().unwrap();
            assert!(t <= 6.0);
        }
        let merge = &commands[2];
        assert!(arg_after(merge, "-filter_complex").unwrap().contains("xfade=transition=fade"));

        let merged = marker_duration(&env.out.join(&outputs[0])).unwrap();
        assert!(merged > 5.0 && merged <= 11.7 + 1e-6);

        let events = sink.events.lock().unwrap();
        assert_eq!(events[0].1.as_deref(), Some("Scanning for videos..."));
        assert!(events.windows(2).all(|w| w[0].0 <= w[1].0));

        // scratch directories are gone
        let leftovers = std::fs::read_dir(env.dir.path().join("temp")).unwrap().count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_batch_reports_fractional_progress_per_output() {
        let env = Env::new();
        let mut prober = FakeProber::default();
        for (name, d) in [("a.mp4", 8.0), ("b.mp4", 12.0)] {
            prober = env.add_video(prober, name, d);
        }
        let orchestrator = env.orchestrator(&FakeExecutor::default(), prober);
        let sink = RecordingSink::default();

        let outputs = orchestrator
            .process_batch(&batch(&env.videos, 2, 4.0, 3), &env.out, &sink)
            .await
            .unwrap();
        assert_eq!(outputs.len(), 3);

        let events = sink.events.lock().unwrap();
        let second = events
            .iter()
            .find(|(_, m)| m.as_deref() == Some("Processing output 2 of 3..."))
            .unwrap();
        assert!((second.0 - 100.0 / 3.0).abs() < 1e-9);

        let merging = events
            .iter()
            .filter(|(_, m)| m.as_deref() == Some("Merging videos..."))
            .count();
        assert_eq!(merging, 3);
        assert!(events
            .iter()
            .all(|(_, m)| m.as_deref() != Some("Preparing videos for merging...")));
    }

    #[tokio::test]
    async fn test_batch_tolerates_a_broken_source() {
        let env = Env::new();
        let mut prober = FakeProber::default();
        for i in 0..5 {
            prober = env.add_video(prober, &format!("{i}.mp4"), 8.0);
        }
        // only the normalization of 2.mp4 fails; its source stands in for the clip
        let key = CacheKey::derive(&env.videos.join("2.mp4"), &TrimWindow { start: 0.0, end: 4.0 });
        let executor = FakeExecutor::default().fail_output_containing(key.to_string());
        let orchestrator = env.orchestrator(&executor, prober);

        let outputs = orchestrator
            .process_batch(&batch(&env.videos, 5, 4.0, 1), &env.out, &NoopProgress)
            .await
            .unwrap();
        assert_eq!(outputs.len(), 1);

        let merge = executor.last_args().unwrap();
        assert_eq!(merge.iter().filter(|a| *a == "-i").count(), 5);
        assert!(merge.contains(&env.videos.join("2.mp4").to_string_lossy().into_owned()));
    }

    #[tokio::test]
    async fn test_empty_folder() {
        let env = Env::new();
        let orchestrator = env.orchestrator(&FakeExecutor::default(), FakeProber::default());
        let err = orchestrator
            .process_batch(&batch(&env.videos, 2, 6.0, 1), &env.out, &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NoVideosFound(_)));
    }

    #[tokio::test]
    async fn test_every_output_failing() {
        let env = Env::new();
        let prober = env.add_video(FakeProber::default(), "a.mp4", 8.0);
        let executor = FakeExecutor::default().fail_output_containing("merged");
        let orchestrator = env.orchestrator(&executor, prober);

        let err = orchestrator
            .process_batch(&batch(&env.videos, 1, 6.0, 2), &env.out, &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::AllOutputsFailed(_)));
    }

    #[tokio::test]
    async fn test_video_audio_batch_unique_pairs() {
        let env = Env::new();
        let mut prober = FakeProber::default();
        for i in 0..3 {
            prober = env.add_video(prober, &format!("v{i}.mp4"), 10.0);
        }
        for i in 0..3 {
            prober = env.add_audio(prober, &format!("a{i}.mp3"), 30.0);
        }
        let executor = FakeExecutor::default();
        let orchestrator = env.orchestrator(&executor, prober);

        let params = VideoAudioParams {
            video_folder: env.videos.clone(),
            audio_folder: env.audio.clone(),
            output_folder: None,
            audio_trim_mode: TrimMode::Fixed,
            audio_selection_mode: AudioSelectionMode::Unique,
        };
        let outputs = orchestrator
            .process_video_audio_batch(&params, &env.out, &NoopProgress)
            .await
            .unwrap();

        assert_eq!(outputs.len(), 3);
        assert!(outputs.iter().all(|o| o.starts_with("merged_")));

        let audio_inputs: std::collections::HashSet<_> = executor
            .commands()
            .iter()
            .filter_map(|args| {
                args.windows(2)
                    .filter(|w| w[0] == "-i")
                    .map(|w| w[1].clone())
                    .find(|p| p.ends_with(".mp3"))
            })
            .collect();
        assert_eq!(audio_inputs.len(), 3);
    }

    #[tokio::test]
    async fn test_video_audio_pair_io_failure_is_skipped() {
        let env = Env::new();
        let mut prober = FakeProber::default();
        prober = env.add_video(prober, "v0.mp4", 10.0);
        prober = env.add_video(prober, "v1.mp4", 10.0);
        prober = env.add_audio(prober, "a0.mp3", 30.0);
        // Scratch directories cannot be created under a plain file
        std::fs::write(env.dir.path().join("temp"), b"not a dir").unwrap();
        let orchestrator = env.orchestrator(&FakeExecutor::default(), prober);

        let params = VideoAudioParams {
            video_folder: env.videos.clone(),
            audio_folder: env.audio.clone(),
            output_folder: None,
            audio_trim_mode: TrimMode::Fixed,
            audio_selection_mode: AudioSelectionMode::Random,
        };
        let sink = RecordingSink::default();
        let outputs = orchestrator
            .process_video_audio_batch(&params, &env.out, &sink)
            .await
            .unwrap();

        assert!(outputs.is_empty());
        let events = sink.events.lock().unwrap();
        assert!(events
            .iter()
            .any(|(_, m)| m.as_deref() == Some("Processing video 2 of 2...")));
    }

    #[tokio::test]
    async fn test_video_audio_batch_without_audio() {
        let env = Env::new();
        let prober = env.add_video(FakeProber::default(), "v.mp4", 10.0);
        let orchestrator = env.orchestrator(&FakeExecutor::default(), prober);

        let params = VideoAudioParams {
            video_folder: env.videos.clone(),
            audio_folder: env.audio.clone(),
            output_folder: None,
            audio_trim_mode: TrimMode::Random,
            audio_selection_mode: AudioSelectionMode::Random,
        };
        let err = orchestrator
            .process_video_audio_batch(&params, &env.out, &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::NoAudioFound(_)));
    }

    #[tokio::test]
    async fn test_voice_adder() {
        let env = Env::new();
        let prober = env.add_video(FakeProber::default(), "v.mp4", 10.0);
        let prober = env.add_audio(prober, "voice.mp3", 4.0);
        let orchestrator = env.orchestrator(&FakeExecutor::default(), prober);

        let params = VoiceParams {
            video: env.videos.join("v.mp4"),
            voice: env.audio.join("voice.mp3"),
            output_folder: None,
            volume_percent: 40.0,
        };
        let output = orchestrator
            .process_voice_adder(&params, &env.out, &NoopProgress)
            .await
            .unwrap();

        assert!(output.exists());
        let name = output.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("voice_"));
    }

    #[tokio::test]
    async fn test_voice_adder_rejects_missing_voice() {
        let env = Env::new();
        let prober = env.add_video(FakeProber::default(), "v.mp4", 10.0);
        let orchestrator = env.orchestrator(&FakeExecutor::default(), prober);

        let params = VoiceParams {
            video: env.videos.join("v.mp4"),
            voice: env.audio.join("missing.mp3"),
            output_folder: None,
            volume_percent: 100.0,
        };
        let err = orchestrator
            .process_voice_adder(&params, &env.out, &NoopProgress)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            WorkerError::Media(reelmix_media::MediaError::InvalidMedia { .. })
        ));
    }
}
