use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::services::{
    convert, download_artifact, health, list_formats, operator_download_artifact,
};
use super::state::AppState;
use crate::artifacts::ArtifactStore;
use crate::config::{Config, EngineKind};
use crate::dispatch::{DispatchController, Fetcher};
use crate::handlers::{ConvertHandler, LibraryHandler, MagickHandler};
use crate::registry::RouteRegistry;

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub async fn run(address: SocketAddr) -> Result<(), AnyError> {
    info!("Loading configuration");
    let config = Config::load().map_err(|e| format!("Failed to load config: {e}"))?;

    info!(path = %config.server.ledger_path.display(), "Opening artifact store");
    let store = Arc::new(
        ArtifactStore::open(&config.server.ledger_path)
            .map_err(|e| format!("Failed to open artifact store: {e}"))?,
    );

    tokio::fs::create_dir_all(&config.server.work_dir).await?;

    let engine: Arc<dyn ConvertHandler> = match config.engine.kind {
        EngineKind::Magick => Arc::new(MagickHandler::new(
            &config.engine.magick_binary,
            &config.server.work_dir,
        )),
        EngineKind::Library => Arc::new(LibraryHandler::new(&config.server.work_dir)),
    };
    info!(engine = ?config.engine.kind, "Engine selected");

    // A duplicate route pair is a fatal configuration error.
    let registry = Arc::new(
        RouteRegistry::with_defaults(engine)
            .map_err(|e| format!("Failed to build route registry: {e}"))?,
    );
    info!(routes = registry.len(), "Route registry built");

    let fetcher = Fetcher::new(config.fetch.to_fetch_config())
        .map_err(|e| format!("Failed to build fetcher: {e}"))?;

    let dispatcher = DispatchController::new(
        registry.clone(),
        store.clone(),
        fetcher,
        config.server.work_dir.clone(),
        config.retention.artifact_ttl(),
        config.engine.handler_timeout(),
    );

    let state = AppState::new(config, registry, store, dispatcher);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "ConvertBox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Route table over a prepared state. Shared with the integration tests so
/// they exercise the same wiring the server runs.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/convert/{from}/to/{to}", post(convert))
        .route("/artifacts/{hash}", get(download_artifact))
        .route("/formats", get(list_formats))
        .route("/health", get(health))
        .route("/operators/artifacts/{hash}", get(operator_download_artifact))
        .route("/operators/health", get(health))
        .with_state(state)
        // Automatically decompress gzip/deflate/brotli request bodies
        .layer(RequestDecompressionLayer::new())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
