//! Shared data models for the reelmix batch assembler.
//!
//! This crate provides Serde-serializable types for:
//! - Scanned media assets and trim windows
//! - Trim, selection and quality modes
//! - Encoding profiles resolved per operation
//! - Batch job records and request payloads

pub mod asset;
pub mod encoding;
pub mod job;
pub mod job_status;
pub mod mode;
pub mod request;
pub mod trim;

// Re-export common types
pub use asset::{MediaAsset, MediaKind};
pub use encoding::EncodingProfile;
pub use job::{JobId, JobKind};
pub use job_status::{BatchJob, JobStatus};
pub use mode::{AudioSelectionMode, QualityTier, TrimMode};
pub use request::{
    BatchParams, BatchRequest, RequestError, VideoAudioBatchRequest, VideoAudioParams,
    VoiceAdderRequest, VoiceParams,
};
pub use trim::{TrimError, TrimSpec, TrimWindow};
