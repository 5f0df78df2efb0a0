//! Handlers for image upload, job status polling and artifact download.

use assetter_core::job::{Job, JobStatus};
use assetter_core::naming::{download_url, MODEL_CONTENT_TYPE, MODEL_FILE_EXTENSION};
use assetter_core::types::JobId;
use assetter_core::upload::validate_image_filename;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Multipart field carrying the source image.
const IMAGE_FIELD: &str = "image";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub job_id: JobId,
    pub status: JobStatus,
}

/// Client view of a job.
#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub id: JobId,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<Job> for JobStatusResponse {
    fn from(job: Job) -> Self {
        let model_url = (job.status == JobStatus::Completed).then(|| download_url(&job.id));
        Self {
            id: job.id,
            status: job.status,
            model_url,
            error: job.error,
        }
    }
}

// ── Upload ───────────────────────────────────────────────────────────

/// POST /upload
///
/// Accept one JPG or PNG in the `image` multipart field and start a
/// generation job. Responds as soon as the job is registered; the client
/// polls `/status/{id}` for the outcome.
pub async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<UploadResponse>> {
    let mut multipart = multipart?;
    let mut image = None;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field
            .file_name()
            .ok_or_else(|| AppError::BadRequest("Failed to get file: missing filename".into()))?
            .to_string();
        validate_image_filename(&filename)?;

        let data = field.bytes().await?;
        tracing::debug!(filename = %filename, bytes = data.len(), "Received image upload");
        image = Some(data.to_vec());
        break;
    }

    let image = image.ok_or_else(|| {
        AppError::BadRequest(format!("Failed to get file: missing '{IMAGE_FIELD}' field"))
    })?;

    let job_id = state.orchestrator.submit(image).await?;
    tracing::info!(job_id = %job_id, "Job accepted");

    Ok(Json(UploadResponse {
        job_id,
        status: JobStatus::Processing,
    }))
}

// ── Status ───────────────────────────────────────────────────────────

/// GET /status/{id}
pub async fn get_status(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<Json<JobStatusResponse>> {
    let Path(id) = path?;
    let id = JobId::parse(&id)?;
    let job = state.orchestrator.status(&id).await?;
    Ok(Json(job.into()))
}

// ── Download ─────────────────────────────────────────────────────────

/// GET /download/{id}
///
/// Stream the binary glTF of a completed job as an attachment.
pub async fn download(
    State(state): State<AppState>,
    path: Result<Path<String>, PathRejection>,
) -> AppResult<impl IntoResponse> {
    let Path(id) = path?;
    let id = JobId::parse(&id)?;
    let model = state.orchestrator.fetch(&id).await?;

    let disposition = format!("attachment; filename=\"{id}.{MODEL_FILE_EXTENSION}\"");
    Ok((
        StatusCode::OK,
        [
            (CONTENT_TYPE, MODEL_CONTENT_TYPE.to_string()),
            (CONTENT_DISPOSITION, disposition),
        ],
        model,
    ))
}
