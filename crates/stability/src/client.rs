//! HTTP client for the Stability AI 3D endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use crate::config::StabilityConfig;

/// First four bytes of every binary glTF (`.glb`) file.
pub const GLTF_MAGIC: &[u8; 4] = b"glTF";

/// Bytes of an unexpected body echoed back in [`GenerationError::Format`].
const PREVIEW_LEN: usize = 100;

/// Turns a source image into a binary 3D model.
///
/// One call is one attempt; implementations do not retry.
#[async_trait]
pub trait ModelGenerator: Send + Sync {
    async fn generate(&self, image: Vec<u8>) -> Result<Vec<u8>, GenerationError>;
}

/// Errors from the generation provider.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The provider answered 404, usually because the endpoint was retired.
    #[error("API endpoint not found (404). The endpoint {url} may not exist or may have been deprecated. Response: {body}")]
    EndpointNotFound { url: String, body: String },

    /// The provider returned any other non-2xx status.
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// A 2xx response whose body is not binary glTF.
    #[error("unexpected response format: expected glTF binary data, got: {preview}")]
    Format { preview: String },
}

/// [`ModelGenerator`] backed by the Stability AI REST API.
pub struct StabilityClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl StabilityClient {
    /// Build a client whose requests are bounded by `config.timeout_secs`.
    pub fn new(config: StabilityConfig) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, config))
    }

    /// Reuse an existing [`reqwest::Client`]. The caller owns its timeout.
    pub fn with_client(client: reqwest::Client, config: StabilityConfig) -> Self {
        Self {
            client,
            api_url: config.api_url,
            api_key: config.api_key,
        }
    }

    // ---- private helpers ----

    /// Map a non-success status to the matching error, consuming the body.
    async fn status_error(&self, response: reqwest::Response) -> GenerationError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        if status == StatusCode::NOT_FOUND {
            GenerationError::EndpointNotFound {
                url: self.api_url.clone(),
                body,
            }
        } else {
            GenerationError::Api {
                status: status.as_u16(),
                body,
            }
        }
    }
}

#[async_trait]
impl ModelGenerator for StabilityClient {
    async fn generate(&self, image: Vec<u8>) -> Result<Vec<u8>, GenerationError> {
        let image_len = image.len();
        let part = Part::bytes(image)
            .file_name("image.png")
            .mime_str("image/png")?;
        let form = Form::new().part("image", part);

        tracing::debug!(url = %self.api_url, image_bytes = image_len, "Requesting 3D generation");

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(self.status_error(response).await);
        }

        let body = response.bytes().await?.to_vec();
        validate_model_payload(&body)?;

        tracing::info!(bytes = body.len(), "Received 3D model");
        Ok(body)
    }
}

/// Check that `body` starts with the binary glTF magic marker.
pub fn validate_model_payload(body: &[u8]) -> Result<(), GenerationError> {
    if body.starts_with(GLTF_MAGIC) {
        return Ok(());
    }
    let preview = String::from_utf8_lossy(&body[..body.len().min(PREVIEW_LEN)]).into_owned();
    Err(GenerationError::Format { preview })
}
