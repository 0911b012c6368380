//! Output download handler.

use axum::body::Body;
use axum::extract::{Path, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::Response;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use reelmix_models::{JobId, JobStatus};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// A bare file name: no separators, no parent references.
fn is_safe_filename(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Stream a finished output file as an attachment.
pub async fn download_output(
    State(state): State<AppState>,
    Path((batch_id, filename)): Path<(String, String)>,
    request: Request,
) -> ApiResult<Response> {
    if !is_safe_filename(&filename) {
        return Err(ApiError::bad_request("Invalid filename"));
    }

    let job = state
        .jobs
        .get(&JobId::from_string(batch_id))
        .ok_or_else(|| ApiError::not_found("Batch not found"))?;
    if job.status != JobStatus::Completed {
        return Err(ApiError::bad_request("Batch not completed"));
    }

    let path = job.output_folder.join(&filename);
    if !tokio::fs::metadata(&path).await.map(|m| m.is_file()).unwrap_or(false) {
        return Err(ApiError::not_found("File not found"));
    }

    debug!(batch_id = %job.id, file = %filename, "Serving output");
    let response = ServeFile::new(&path)
        .oneshot(request)
        .await
        .map_err(|e| ApiError::internal(e.to_string()))?;

    let mut response = response.map(Body::new);
    if let Ok(disposition) = HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename)) {
        response
            .headers_mut()
            .insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok(response)
}
