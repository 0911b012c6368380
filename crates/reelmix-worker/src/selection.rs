//! Clip sampling, trim assignment and audio pairing.
//!
//! Everything here is pure over an injected RNG so batches are reproducible
//! under a fixed seed.

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use reelmix_models::{AudioSelectionMode, MediaAsset, TrimMode, TrimSpec};

/// Sample up to `count` assets without replacement, in random order.
///
/// A pool smaller than `count` is used whole.
pub fn select_clips<R: Rng + ?Sized>(
    pool: &[MediaAsset],
    count: usize,
    rng: &mut R,
) -> Vec<MediaAsset> {
    let mut picked = pool.to_vec();
    picked.shuffle(rng);
    picked.truncate(count);
    picked
}

/// Trim window of at most `target` seconds inside `asset`.
///
/// `Fixed` starts at zero. `Random` draws a uniform start in
/// `[0, duration - target]` when the asset is longer than `target`, and uses
/// the whole asset otherwise.
pub fn assign_trim<R: Rng + ?Sized>(
    asset: &MediaAsset,
    target: f64,
    mode: TrimMode,
    rng: &mut R,
) -> TrimSpec {
    let duration = asset.duration;
    if duration <= target {
        return TrimSpec::new(0.0, Some(duration));
    }

    match mode {
        TrimMode::Fixed => TrimSpec::new(0.0, Some(target)),
        TrimMode::Random => {
            let start = rng.random_range(0.0..=duration - target);
            TrimSpec::new(start, Some(start + target))
        }
    }
}

/// Start offset into an audio track that will be cut to `video_duration`.
pub fn audio_offset<R: Rng + ?Sized>(
    audio_duration: f64,
    video_duration: f64,
    mode: TrimMode,
    rng: &mut R,
) -> f64 {
    match mode {
        TrimMode::Random if audio_duration > video_duration => {
            rng.random_range(0.0..=audio_duration - video_duration)
        }
        _ => 0.0,
    }
}

/// Hands out audio tracks for successive videos.
///
/// In `Unique` mode every track is used once before any is reused; the pool
/// refills when it runs dry. `Random` draws independently each time.
#[derive(Debug, Clone)]
pub struct AudioPicker {
    tracks: Vec<MediaAsset>,
    remaining: Vec<usize>,
    mode: AudioSelectionMode,
}

impl AudioPicker {
    pub fn new(tracks: Vec<MediaAsset>, mode: AudioSelectionMode) -> Self {
        Self {
            tracks,
            remaining: Vec::new(),
            mode,
        }
    }

    /// Next track, or `None` for an empty pool.
    pub fn pick<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<&MediaAsset> {
        if self.tracks.is_empty() {
            return None;
        }

        match self.mode {
            AudioSelectionMode::Random => self.tracks.choose(rng),
            AudioSelectionMode::Unique => {
                if self.remaining.is_empty() {
                    self.remaining = (0..self.tracks.len()).collect();
                }
                let slot = rng.random_range(0..self.remaining.len());
                let index = self.remaining.swap_remove(slot);
                self.tracks.get(index)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn asset(name: &str, duration: f64) -> MediaAsset {
        MediaAsset::video(format!("/videos/{name}"), duration)
    }

    #[test]
    fn test_select_without_replacement() {
        let pool: Vec<_> = (0..6).map(|i| asset(&format!("{i}.mp4"), 10.0)).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let picked = select_clips(&pool, 4, &mut rng);
        assert_eq!(picked.len(), 4);
        let names: HashSet<_> = picked.iter().map(|a| a.name.clone()).collect();
        assert_eq!(names.len(), 4);

        assert_eq!(select_clips(&pool, 10, &mut rng).len(), 6);
    }

    #[test]
    fn test_fixed_trim() {
        let mut rng = StdRng::seed_from_u64(1);
        let long = assign_trim(&asset("a", 12.0), 6.0, TrimMode::Fixed, &mut rng);
        assert_eq!((long.start, long.end), (0.0, Some(6.0)));

        let short = assign_trim(&asset("b", 5.0), 6.0, TrimMode::Fixed, &mut rng);
        assert_eq!((short.start, short.end), (0.0, Some(5.0)));
    }

    #[test]
    fn test_random_trim_stays_inside() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let spec = assign_trim(&asset("a", 12.0), 6.0, TrimMode::Random, &mut rng);
            let end = spec.end.unwrap();
            assert!(spec.start >= 0.0 && spec.start <= 6.0);
            assert!((end - spec.start - 6.0).abs() < 1e-9);
            assert!(end <= 12.0);
        }

        let whole = assign_trim(&asset("b", 4.0), 6.0, TrimMode::Random, &mut rng);
        assert_eq!((whole.start, whole.end), (0.0, Some(4.0)));
    }

    #[test]
    fn test_audio_offset() {
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(audio_offset(60.0, 20.0, TrimMode::Fixed, &mut rng), 0.0);
        assert_eq!(audio_offset(10.0, 20.0, TrimMode::Random, &mut rng), 0.0);
        for _ in 0..100 {
            let offset = audio_offset(60.0, 20.0, TrimMode::Random, &mut rng);
            assert!((0.0..=40.0).contains(&offset));
        }
    }

    #[test]
    fn test_unique_audio_uses_every_track_before_repeating() {
        let tracks: Vec<_> = (0..3)
            .map(|i| MediaAsset::audio(format!("/audio/{i}.mp3"), 30.0))
            .collect();
        let mut picker = AudioPicker::new(tracks, AudioSelectionMode::Unique);
        let mut rng = StdRng::seed_from_u64(11);

        for _round in 0..3 {
            let seen: HashSet<_> = (0..3)
                .map(|_| picker.pick(&mut rng).unwrap().name.clone())
                .collect();
            assert_eq!(seen.len(), 3);
        }
    }

    #[test]
    fn test_random_audio_and_empty_pool() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut empty = AudioPicker::new(Vec::new(), AudioSelectionMode::Unique);
        assert!(empty.pick(&mut rng).is_none());

        let mut picker = AudioPicker::new(
            vec![MediaAsset::audio("/audio/only.mp3", 5.0)],
            AudioSelectionMode::Random,
        );
        for _ in 0..5 {
            assert_eq!(picker.pick(&mut rng).unwrap().name, "only.mp3");
        }
    }
}
