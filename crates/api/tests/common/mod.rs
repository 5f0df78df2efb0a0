#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use assetter_events::EventBus;
use assetter_pipeline::JobOrchestrator;
use assetter_stability::{GenerationError, ModelGenerator};
use assetter_storage::{LocalBlobStore, ModelCatalog};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use tokio::sync::Semaphore;
use tower::ServiceExt;

use assetter_api::config::ServerConfig;
use assetter_api::router::build_app_router;
use assetter_api::state::AppState;

/// Binary glTF payload returned by [`MockGenerator`].
pub const MOCK_MODEL: &[u8] = b"glTF\x02\x00\x00\x00mock-model-body";

/// Multipart boundary used by [`multipart_body`].
const BOUNDARY: &str = "assetter-test-boundary";

/// Upload limit used by the test router.
pub const TEST_MAX_UPLOAD_BYTES: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Generator doubles
// ---------------------------------------------------------------------------

/// Stand-in for the generation provider.
///
/// When built with [`MockGenerator::gated`], every call blocks until the test
/// adds a permit to the semaphore, which keeps jobs in `processing` for as
/// long as the test needs.
pub struct MockGenerator {
    failure: Option<String>,
    gate: Option<Arc<Semaphore>>,
}

impl MockGenerator {
    pub fn succeeding() -> Self {
        Self {
            failure: None,
            gate: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(message.to_string()),
            gate: None,
        }
    }

    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            failure: None,
            gate: Some(gate),
        }
    }
}

#[async_trait]
impl ModelGenerator for MockGenerator {
    async fn generate(&self, _image: Vec<u8>) -> Result<Vec<u8>, GenerationError> {
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match &self.failure {
            Some(message) => Err(GenerationError::Api {
                status: 500,
                body: message.clone(),
            }),
            None => Ok(MOCK_MODEL.to_vec()),
        }
    }
}

// ---------------------------------------------------------------------------
// Test application
// ---------------------------------------------------------------------------

/// Build a test `ServerConfig` rooted in `base`.
///
/// Uses `http://localhost:8000` as CORS origin (matching the dev default)
/// and a 30-second request timeout.
pub fn test_config(base: &std::path::Path) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:8000".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        data_dir: base.join("data"),
        uploads_dir: base.join("uploads"),
        static_dir: base.join("static"),
        max_upload_bytes: TEST_MAX_UPLOAD_BYTES,
    }
}

/// A fully wired application backed by a temporary directory.
pub struct TestApp {
    pub router: Router,
    pub orchestrator: Arc<JobOrchestrator>,
    pub config: ServerConfig,
    _dir: tempfile::TempDir,
}

impl TestApp {
    /// Fresh router handle for one request.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Build the full application router with all middleware layers, using the
/// given generator.
///
/// Goes through [`build_app_router`] so integration tests exercise the same
/// middleware stack (CORS, request ID, timeout, tracing, body limit, panic
/// recovery) that production uses.
pub async fn build_test_app(generator: MockGenerator) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path());

    std::fs::create_dir_all(&config.static_dir).unwrap();
    std::fs::write(
        config.static_dir.join("index.html"),
        "<!doctype html><title>assetter</title>",
    )
    .unwrap();

    let blobs = LocalBlobStore::new(&config.uploads_dir).await.unwrap();
    let catalog = ModelCatalog::open(&config.data_dir).await.unwrap();
    let orchestrator = JobOrchestrator::new(
        Arc::new(generator),
        Arc::new(blobs),
        Arc::new(catalog),
        Arc::new(EventBus::default()),
    );

    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
    };
    let router = build_app_router(state, &config);

    TestApp {
        router,
        orchestrator,
        config,
        _dir: dir,
    }
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, Body::empty()).await
}

pub async fn delete(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Body::empty()).await
}

pub async fn send(app: Router, method: Method, uri: &str, body: Body) -> Response<Body> {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(body)
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Encode a single file part as `multipart/form-data`.
pub fn multipart_body(field: &str, filename: &str, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// POST a single file to `uri` as multipart form data.
pub async fn post_file(
    app: Router,
    uri: &str,
    field: &str,
    filename: &str,
    data: &[u8],
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(field, filename, data)))
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Upload a valid PNG and return the new job id.
pub async fn upload_png(app: Router) -> String {
    let response = post_file(app, "/upload", "image", "photo.png", b"\x89PNG fake").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    json["job_id"].as_str().unwrap().to_string()
}

/// Poll `/status/{id}` until the job leaves `processing`.
pub async fn wait_for_terminal(test: &TestApp, job_id: &str) -> serde_json::Value {
    let uri = format!("/status/{job_id}");
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let json = body_json(get(test.app(), &uri).await).await;
            if json["status"] != "processing" {
                return json;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("job did not finish in time")
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    response
        .into_body()
        .collect()
        .await
        .unwrap()
        .to_bytes()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
