use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{
    services::{health, heartbeat, languages, set_enabled, translate},
    state::AppState,
};
use crate::config::Config;
use crate::gateway::TranslationGateway;
use crate::observability::Metrics;
use crate::provider::ProviderDescriptor;
use crate::provider::http::{HostClient, HostClientFactory};
use crate::provider::languages::load_languages;
use crate::worker::{LifecycleController, WorkerConfig, WorkerDeps};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Routes served to the host application
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/enabled", put(set_enabled))
        .route("/heartbeat", get(heartbeat))
        .route("/translate", post(translate))
        .route("/languages", get(languages))
        .route("/health", get(health))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
}

/// Load the model, wire the worker and serve until a shutdown signal.
///
/// The worker stays disabled until the host sends an enabled notification.
pub async fn run(config: Config, address: SocketAddr) -> Result<(), AnyError> {
    let languages = load_languages(&config.provider.languages_file)
        .map_err(|e| format!("Failed to load languages: {}", e))?;

    let gateway = TranslationGateway::from_config(&config)
        .map_err(|e| format!("Failed to load model: {}", e))?;

    let host = Arc::new(
        HostClient::new(config.host.clone())
            .map_err(|e| format!("Failed to build host client: {}", e))?,
    );

    let deps = WorkerDeps {
        gateway: Arc::new(gateway),
        sources: Arc::new(HostClientFactory::new(config.host.clone())),
        metrics: Arc::new(Metrics::new()),
    };

    let descriptor = ProviderDescriptor {
        id: config.provider.id.clone(),
        name: config.provider.name.clone(),
        task_type: config.provider.task_type_id.clone(),
        languages,
    };

    let lifecycle = Arc::new(LifecycleController::new(
        WorkerConfig::from_config(&config),
        deps.clone(),
        host.clone(),
        descriptor,
    ));

    let state = AppState::new(config, deps, lifecycle.clone(), host);
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "transbox listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    lifecycle.shutdown().await;
    info!("Polling worker drained, exiting");

    Ok(())
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
