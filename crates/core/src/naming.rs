//! Naming conventions for generated artifacts.

use crate::types::JobId;

/// File extension of stored artifacts (binary glTF).
pub const MODEL_FILE_EXTENSION: &str = "glb";

/// MIME type served for downloaded artifacts.
pub const MODEL_CONTENT_TYPE: &str = "model/gltf-binary";

/// Blob store path of the artifact produced by a job.
///
/// ```
/// use assetter_core::naming::artifact_path;
/// use assetter_core::types::JobId;
///
/// let id = JobId::parse("job_42").unwrap();
/// assert_eq!(artifact_path(&id), "job_42.glb");
/// ```
pub fn artifact_path(id: &JobId) -> String {
    format!("{id}.{MODEL_FILE_EXTENSION}")
}

/// Public URL from which a completed job's artifact can be downloaded.
pub fn download_url(id: &JobId) -> String {
    format!("/download/{id}")
}
