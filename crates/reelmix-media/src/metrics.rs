//! Media pipeline metrics.

use metrics::counter;

/// Metric names as constants for consistency.
pub mod names {
    pub const CLIPS_NORMALIZED_TOTAL: &str = "reelmix_clips_normalized_total";
    pub const CLIPS_SUBSTITUTED_TOTAL: &str = "reelmix_clips_substituted_total";
    pub const ENCODE_FALLBACKS_TOTAL: &str = "reelmix_encode_fallbacks_total";
    pub const MERGES_TOTAL: &str = "reelmix_merges_total";
}

/// Record an encode attempt that failed and handed over to the next strategy.
pub fn record_encode_fallback(from_strategy: &str) {
    let labels = [("from", from_strategy.to_string())];
    counter!(names::ENCODE_FALLBACKS_TOTAL, &labels).increment(1);
}

/// Record a normalized clip and the strategy that produced it.
pub fn record_clip_normalized(strategy: &str) {
    let labels = [("strategy", strategy.to_string())];
    counter!(names::CLIPS_NORMALIZED_TOTAL, &labels).increment(1);
}

/// Record a clip whose source was used unmodified after every encode failed.
pub fn record_clip_substituted() {
    counter!(names::CLIPS_SUBSTITUTED_TOTAL).increment(1);
}

/// Record a concatenation attempt.
pub fn record_merge(success: bool) {
    let labels = [("result", if success { "ok" } else { "error" }.to_string())];
    counter!(names::MERGES_TOTAL, &labels).increment(1);
}
