use axum::routing::{get, post};
use axum::Router;

use crate::handlers::jobs;
use crate::state::AppState;

/// Job routes, mounted at the root.
///
/// ```text
/// POST   /upload            upload
/// GET    /status/{id}       get_status
/// GET    /download/{id}     download
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/upload", post(jobs::upload))
        .route("/status/{id}", get(jobs::get_status))
        .route("/download/{id}", get(jobs::download))
}
