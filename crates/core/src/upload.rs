//! Upload validation rules for source images.

use crate::error::CoreError;

/// Image extensions accepted by the upload endpoint (lowercase, no dot).
pub const ALLOWED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];

/// Default maximum upload size (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Message returned when the uploaded file is not a JPG or PNG.
pub const UNSUPPORTED_IMAGE_MESSAGE: &str = "Only JPG and PNG files are allowed";

/// Validate an uploaded file name and return its lowercase extension.
///
/// Only the extension is checked; content sniffing is left to the provider.
pub fn validate_image_filename(filename: &str) -> Result<String, CoreError> {
    let ext = std::path::Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    if ALLOWED_IMAGE_EXTENSIONS.contains(&ext.as_str()) {
        Ok(ext)
    } else {
        Err(CoreError::Validation(UNSUPPORTED_IMAGE_MESSAGE.into()))
    }
}
