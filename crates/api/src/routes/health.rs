use assetter_pipeline::JobStats;
use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Health check response payload.
#[derive(Serialize)]
pub struct HealthResponse {
    /// Overall service status.
    pub status: &'static str,
    /// Crate version from Cargo.toml.
    pub version: &'static str,
    /// Jobs in the in-memory table, by state.
    pub jobs: JobCounts,
    /// Number of catalogued models.
    pub catalog_size: usize,
}

#[derive(Serialize)]
pub struct JobCounts {
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl From<JobStats> for JobCounts {
    fn from(stats: JobStats) -> Self {
        Self {
            processing: stats.processing,
            completed: stats.completed,
            failed: stats.failed,
        }
    }
}

/// GET /health -- returns service health and job counts.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let jobs = state.orchestrator.stats().await.into();
    let catalog_size = state.orchestrator.catalog_size().await;

    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        jobs,
        catalog_size,
    })
}

/// Mount health check routes at the root.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
