//! Axum API server binary.

use std::net::SocketAddr;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reelmix_api::{create_router, metrics, ApiConfig, AppState};
use reelmix_media::{check_ffmpeg, check_ffprobe};
use reelmix_worker::{spawn_retention_sweeper, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env().add_directive("reelmix=info".parse()?);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting reelmix-api");

    let config = ApiConfig::from_env();
    let worker = WorkerConfig::from_env();
    info!("API config: host={}, port={}", config.host, config.port);
    info!(
        output_dir = %worker.output_dir.display(),
        cache_dir = %worker.cache_dir.display(),
        workers = worker.max_normalize_workers,
        "Worker config loaded"
    );

    match check_ffmpeg() {
        Ok(path) => info!("Using ffmpeg at {}", path.display()),
        Err(e) => warn!("ffmpeg not available: {}", e),
    }
    if let Err(e) = check_ffprobe() {
        warn!("ffprobe not available: {}", e);
    }

    let state = AppState::with_ffmpeg(config.clone(), worker.clone());

    // Startup cache sweep
    let cache = state.service.orchestrator().cache().clone();
    let max_age = worker.cache_max_age;
    tokio::spawn(async move {
        match cache.purge_older_than(max_age).await {
            Ok(removed) => info!(removed, "Startup clip cache purge finished"),
            Err(e) => warn!("Startup clip cache purge failed: {}", e),
        }
    });

    if let Some(retention) = worker.job_retention {
        info!(retention_secs = retention.as_secs(), "Job record retention enabled");
        spawn_retention_sweeper(state.jobs.clone(), retention);
    }

    let metrics_enabled = std::env::var("METRICS_ENABLED")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(true);

    let metrics_handle = if metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics().context("failed to install Prometheus recorder")?)
    } else {
        None
    };

    let app = create_router(state, metrics_handle);

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .context("invalid bind address")?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Received shutdown signal");
}
