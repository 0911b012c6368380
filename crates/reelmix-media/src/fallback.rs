//! Ordered fallback over encode strategies.

use std::fmt;
use std::future::Future;
use tracing::warn;

use crate::error::{MediaError, MediaResult};
use crate::metrics;

/// How an output stream is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodeStrategy {
    /// Hardware encoder (NVENC)
    Gpu,
    /// Software encoder (libx264)
    Cpu,
    /// Stream copy without re-encoding
    Copy,
}

impl EncodeStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EncodeStrategy::Gpu => "gpu",
            EncodeStrategy::Cpu => "cpu",
            EncodeStrategy::Copy => "copy",
        }
    }
}

impl fmt::Display for EncodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Strategies tried in order; the first success wins.
///
/// When every strategy fails the error lists each attempt's failure.
#[derive(Debug, Clone)]
pub struct FallbackPolicy<S> {
    strategies: Vec<S>,
}

impl FallbackPolicy<EncodeStrategy> {
    /// GPU then CPU when the hardware encoder is available, CPU otherwise.
    pub fn encode(gpu_available: bool) -> Self {
        if gpu_available {
            Self::new(vec![EncodeStrategy::Gpu, EncodeStrategy::Cpu])
        } else {
            Self::new(vec![EncodeStrategy::Cpu])
        }
    }

    /// Stream copy first, CPU re-encode if the copy is rejected.
    pub fn remux() -> Self {
        Self::new(vec![EncodeStrategy::Copy, EncodeStrategy::Cpu])
    }
}

impl<S> FallbackPolicy<S>
where
    S: Copy + fmt::Display,
{
    pub fn new(strategies: Vec<S>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &[S] {
        &self.strategies
    }

    /// Run `attempt` for each strategy until one succeeds.
    pub async fn run<T, F, Fut>(&self, mut attempt: F) -> MediaResult<(S, T)>
    where
        F: FnMut(S) -> Fut,
        Fut: Future<Output = MediaResult<T>>,
    {
        let mut failures = Vec::with_capacity(self.strategies.len());

        for (idx, &strategy) in self.strategies.iter().enumerate() {
            match attempt(strategy).await {
                Ok(value) => return Ok((strategy, value)),
                Err(e) => {
                    let has_next = idx + 1 < self.strategies.len();
                    warn!(
                        strategy = %strategy,
                        error = %e,
                        "Encode attempt failed{}",
                        if has_next { ", falling back" } else { "" }
                    );
                    if has_next {
                        metrics::record_encode_fallback(&strategy.to_string());
                    }
                    failures.push((strategy.to_string(), e.to_string()));
                }
            }
        }

        Err(MediaError::FallbackExhausted { attempts: failures })
    }
}
