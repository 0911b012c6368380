//! Axum HTTP API server.
//!
//! This crate provides:
//! - Folder scan endpoints for video and audio sources
//! - Job submission and status polling for the three job kinds
//! - Download of finished outputs and clip cache maintenance
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
