//! Handlers for the completed-model catalog.

use assetter_storage::ModelRecord;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

use crate::error::AppResult;
use crate::state::AppState;

/// GET /api/models
///
/// All catalogued models, newest first.
pub async fn list_models(State(state): State<AppState>) -> Json<Vec<ModelRecord>> {
    Json(state.orchestrator.list_completed_models().await)
}

/// GET /api/models/{id}
pub async fn get_model(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<ModelRecord>> {
    let Path(id) = path?;
    Ok(Json(state.orchestrator.get_model(&id).await?))
}

/// DELETE /api/models/{id}
///
/// Removes the catalog entry only; the artifact stays downloadable.
pub async fn delete_model(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<StatusCode> {
    let Path(id) = path?;
    state.orchestrator.remove_model(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
