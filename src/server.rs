use axum::{response::IntoResponse, Json, Router};

use crate::config::ServerConfig;
use crate::models::HealthResponse;

/// Liveness probe. Never touches downstream services.
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse::healthy())
}

/// Binds the configured address and serves `app` until the process exits.
/// Bind failures are returned so the binary can exit non-zero.
pub async fn serve(name: &str, config: &ServerConfig, app: Router) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(service = name, "listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
