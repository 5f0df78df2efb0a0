use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use assetter_events::{EventBus, EventLogger};
use assetter_pipeline::JobOrchestrator;
use assetter_stability::{StabilityClient, StabilityConfig};
use assetter_storage::{LocalBlobStore, ModelCatalog};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use assetter_api::config::ServerConfig;
use assetter_api::router::build_app_router;
use assetter_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "assetter_api=debug,assetter_pipeline=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let stability_config = StabilityConfig::from_env();
    tracing::info!(api_url = %stability_config.api_url, "Loaded generation provider configuration");

    // --- Storage ---
    let blobs = LocalBlobStore::new(&config.uploads_dir)
        .await
        .expect("Failed to create uploads directory");
    tracing::info!(path = %config.uploads_dir.display(), "Blob store ready");

    let catalog = ModelCatalog::open(&config.data_dir)
        .await
        .expect("Failed to open model catalog");

    // --- Generation client ---
    let generator =
        StabilityClient::new(stability_config).expect("Failed to build generation client");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));
    tracing::info!("Event bus and logger started");

    // --- Orchestrator ---
    let orchestrator = JobOrchestrator::new(
        Arc::new(generator),
        Arc::new(blobs),
        Arc::new(catalog),
        Arc::clone(&event_bus),
    );

    // --- App state ---
    let state = AppState {
        orchestrator: Arc::clone(&orchestrator),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Let in-flight generation jobs finish so their artifacts are saved.
    let drained = orchestrator
        .shutdown(Duration::from_secs(config.shutdown_timeout_secs))
        .await;
    tracing::info!(drained, "Job orchestrator shut down");

    // Dropping the last bus handles closes the channel and stops the logger.
    drop(orchestrator);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;
    tracing::info!("Event logger stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
