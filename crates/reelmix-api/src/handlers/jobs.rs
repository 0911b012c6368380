//! Job submission and status handlers.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use reelmix_models::{BatchJob, BatchRequest, JobId, VideoAudioBatchRequest, VoiceAdderRequest};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Response for an accepted job.
#[derive(Serialize)]
pub struct SubmitResponse {
    pub batch_id: String,
    pub message: String,
}

impl From<BatchJob> for SubmitResponse {
    fn from(job: BatchJob) -> Self {
        Self {
            batch_id: job.id.to_string(),
            message: "Processing started".to_string(),
        }
    }
}

pub async fn process_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let job = state.service.submit_batch(&request)?;
    Ok(Json(job.into()))
}

pub async fn process_video_audio_batch(
    State(state): State<AppState>,
    Json(request): Json<VideoAudioBatchRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let job = state.service.submit_video_audio(&request)?;
    Ok(Json(job.into()))
}

pub async fn process_voice_adder(
    State(state): State<AppState>,
    Json(request): Json<VoiceAdderRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let job = state.service.submit_voice(&request)?;
    Ok(Json(job.into()))
}

/// Current status record of a job.
pub async fn get_status(
    State(state): State<AppState>,
    Path(batch_id): Path<String>,
) -> ApiResult<Json<BatchJob>> {
    state
        .jobs
        .get(&JobId::from_string(batch_id))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Batch not found"))
}
