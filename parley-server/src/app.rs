use crate::config::RelayConfig;
use crate::signaling::{SignalingGateway, ws_handler};
use anyhow::Context;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub rooms: usize,
}

async fn health(State(gateway): State<SignalingGateway>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        rooms: gateway.directory().room_count(),
    })
}

pub fn router(gateway: SignalingGateway) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(cors)
        .with_state(gateway)
}

/// Binds `config.bind_addr` and serves until Ctrl-C.
pub async fn serve(config: RelayConfig) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    let gateway = SignalingGateway::new(config);

    serve_with_listener(listener, gateway, shutdown_signal()).await
}

pub async fn serve_with_listener<F>(
    listener: TcpListener,
    gateway: SignalingGateway,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    info!("Relay listening on {}", addr);

    axum::serve(listener, router(gateway))
        .with_graceful_shutdown(shutdown)
        .await
        .context("relay server error")?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
