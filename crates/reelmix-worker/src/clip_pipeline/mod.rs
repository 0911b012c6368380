//! Clip pipeline: parallel normalization followed by crossfade merge.
//!
//! One merge call walks
//! `Submitted -> Normalizing -> Loaded -> Transitioned -> Encoding -> Done`.
//! Failures inside `Normalizing` drop single clips; failures at `Loaded` or
//! `Encoding` end the call.

mod merge;
mod parallel;

pub use merge::{MergeOutcome, MergePipeline, MergeStage, StageHook};
pub use parallel::{ClipRequest, NormalizeReport, ParallelNormalizer, SkippedClip};
