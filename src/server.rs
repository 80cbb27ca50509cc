//! HTTP transport for the orchestrator.
//!
//! Routes:
//!   POST /execute   {"command": "..."} → response envelope
//!   GET  /health    liveness probe
//!   GET  /tools     registered tool definitions

use crate::orchestrator::Orchestrator;
use crate::tools::ToolDefinition;
use crate::types::{HealthStatus, ResponseEnvelope};
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind HTTP listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    #[error("HTTP server error: {0}")]
    Serve(#[from] std::io::Error),
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub command: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Build the router; exposed separately so tests can drive it in-process.
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/execute", post(execute_handler))
        .route("/health", get(health_handler))
        .route("/tools", get(tools_handler))
        .layer(CorsLayer::permissive())
        .with_state(orchestrator)
}

/// Serve until `shutdown` is cancelled.
pub async fn serve(
    orchestrator: Arc<Orchestrator>,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!(%addr, "HTTP server ready to accept connections");

    axum::serve(listener, router(orchestrator))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(ServerError::Serve)
}

async fn execute_handler(
    State(orchestrator): State<Arc<Orchestrator>>,
    Json(payload): Json<ExecuteRequest>,
) -> Result<Json<ResponseEnvelope>, (StatusCode, Json<ErrorResponse>)> {
    if payload.command.trim().is_empty() {
        error!("Rejecting /execute request due to empty command");
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "command cannot be empty".to_string(),
            }),
        ));
    }

    Ok(Json(orchestrator.execute(&payload.command).await))
}

async fn health_handler(State(orchestrator): State<Arc<Orchestrator>>) -> Json<HealthStatus> {
    Json(orchestrator.health())
}

async fn tools_handler(
    State(orchestrator): State<Arc<Orchestrator>>,
) -> Json<Vec<ToolDefinition>> {
    Json(orchestrator.tools().to_vec())
}
