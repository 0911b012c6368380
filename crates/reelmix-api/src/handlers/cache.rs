//! Clip cache maintenance.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct PurgeRequest {
    /// Entries older than this many days are removed; defaults to the configured age
    #[serde(default)]
    pub max_age_days: Option<f64>,
}

#[derive(Serialize)]
pub struct PurgeResponse {
    pub removed: usize,
}

pub async fn purge_cache(
    State(state): State<AppState>,
    body: Option<Json<PurgeRequest>>,
) -> ApiResult<Json<PurgeResponse>> {
    let request = body.map(|Json(r)| r).unwrap_or_default();
    let max_age = match request.max_age_days {
        Some(days) if days.is_finite() && days >= 0.0 => Duration::from_secs_f64(days * 86_400.0),
        Some(_) => return Err(ApiError::bad_request("max_age_days must be non-negative")),
        None => state.worker_config().cache_max_age,
    };

    let removed = state
        .service
        .orchestrator()
        .cache()
        .purge_older_than(max_age)
        .await?;
    info!(removed, max_age_secs = max_age.as_secs(), "Clip cache purged on request");
    Ok(Json(PurgeResponse { removed }))
}
