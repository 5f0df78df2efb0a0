use axum::routing::get;
use axum::Router;

use crate::handlers::models;
use crate::state::AppState;

/// Catalog routes, nested under `/api`.
///
/// ```text
/// GET    /models            list_models
/// GET    /models/{id}       get_model
/// DELETE /models/{id}       delete_model
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/models", get(models::list_models))
        .route(
            "/models/{id}",
            get(models::get_model).delete(models::delete_model),
        )
}
