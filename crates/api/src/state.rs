use std::sync::Arc;

use assetter_pipeline::JobOrchestrator;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Job table, background generation and catalog access.
    pub orchestrator: Arc<JobOrchestrator>,
}
