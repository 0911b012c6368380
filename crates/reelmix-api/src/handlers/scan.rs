//! Folder scan handlers.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use reelmix_models::MediaAsset;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    #[serde(default)]
    pub folder_path: Option<PathBuf>,
}

impl ScanRequest {
    fn folder(&self) -> ApiResult<&PathBuf> {
        self.folder_path
            .as_ref()
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or_else(|| ApiError::bad_request("Missing folder_path"))
    }
}

#[derive(Serialize)]
pub struct VideoScanResponse {
    pub videos: Vec<MediaAsset>,
}

#[derive(Serialize)]
pub struct AudioScanResponse {
    pub audios: Vec<MediaAsset>,
}

/// List the videos in a folder.
pub async fn scan_folder(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<VideoScanResponse>> {
    let folder = request.folder()?;
    let videos = state
        .service
        .orchestrator()
        .scanner()
        .scan_videos(folder)
        .await?;
    Ok(Json(VideoScanResponse { videos }))
}

/// List the audio files in a folder.
pub async fn scan_audio_folder(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Json<AudioScanResponse>> {
    let folder = request.folder()?;
    let audios = state
        .service
        .orchestrator()
        .scanner()
        .scan_audio(folder)
        .await?;
    Ok(Json(AudioScanResponse { audios }))
}
