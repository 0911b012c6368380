//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::handlers::{
    download_output, get_status, health, process_batch, process_video_audio_batch,
    process_voice_adder, purge_cache, ready, scan_audio_folder, scan_folder,
};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_logging};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let scan_routes = Router::new()
        .route("/scan-folder", post(scan_folder))
        .route("/scan-audio-folder", post(scan_audio_folder));

    let job_routes = Router::new()
        .route("/process-batch", post(process_batch))
        .route("/process-video-audio-batch", post(process_video_audio_batch))
        .route("/process-voice-adder", post(process_voice_adder))
        .route("/status/:batch_id", get(get_status))
        .route("/download/:batch_id/:filename", get(download_output));

    let api_routes = Router::new()
        .merge(scan_routes)
        .merge(job_routes)
        .route("/cache/purge", post(purge_cache));

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
