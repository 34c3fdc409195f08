//! Plugin HTTP server

use std::net::SocketAddr;
use std::sync::Arc;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tracing::info;

use crate::auth::{require_token, AuthToken};
use crate::error::Error;
use crate::handler::{getparams, HandlerSettings};
use crate::store::SecretStore;
use crate::PluginConfig;

/// Shared state for handlers
#[derive(Clone)]
pub struct AppState {
    /// Secret reader
    pub store: Arc<dyn SecretStore>,
    /// Handler settings fixed at startup
    pub settings: Arc<HandlerSettings>,
}

impl AppState {
    /// Build state from a store and settings
    pub fn new(store: Arc<dyn SecretStore>, settings: HandlerSettings) -> Self {
        Self {
            store,
            settings: Arc::new(settings),
        }
    }
}

/// Build the plugin router
///
/// Only the generator route sits behind the token gate; `/healthz` stays open
/// for kubelet health checks.
pub fn plugin_routes(state: AppState, token: AuthToken) -> Router {
    let generator = Router::new()
        .route(crate::GETPARAMS_PATH, post(getparams))
        .route_layer(middleware::from_fn_with_state(token, require_token));

    Router::new()
        .merge(generator)
        .route("/healthz", get(|| async { "ok" }))
        .with_state(state)
}

/// Bind `config.listen_addr` and serve until SIGINT or SIGTERM
pub async fn start_server(
    config: &PluginConfig,
    store: Arc<dyn SecretStore>,
) -> Result<(), Error> {
    let state = AppState::new(store, config.handler_settings());
    let app = plugin_routes(state, config.token.clone());

    serve(config.listen_addr, app).await
}

async fn serve(addr: SocketAddr, app: Router) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        tracing::error!(error = %e, addr = %addr, "Failed to bind plugin port");
        Error::Server(e)
    })?;
    info!(addr = %addr, "ApplicationSet secrets plugin started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("ApplicationSet secrets plugin stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received, draining requests");
}
