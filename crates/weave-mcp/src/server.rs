//! Axum router for the gateway's HTTP surface.
//! Routes: `POST /mcp` (tool calls), `GET /mcp` (status), `GET /mcp/manifest` (tool list), `GET /health` (liveness).

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use weave_meta::{Environment, GatewayConfig};

use crate::dispatch::{DispatchReply, Dispatcher};
use crate::tools;
use crate::{Error, Result};

/// Name reported by the status and health endpoints.
pub const SERVICE_NAME: &str = "weave-mcp";

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The `call_tool` dispatcher.
    pub dispatcher: Arc<Dispatcher>,
    /// Production hides the status endpoint.
    pub environment: Environment,
    /// Memory API base URL, reported by the status endpoint.
    pub memory_api: String,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>, environment: Environment, memory_api: impl Into<String>) -> Self {
        Self {
            dispatcher,
            environment,
            memory_api: memory_api.into(),
        }
    }

    pub fn from_config(config: &GatewayConfig) -> Result<Self> {
        let dispatcher = Dispatcher::from_config(config)?;
        Ok(Self::new(
            Arc::new(dispatcher),
            config.runtime.environment,
            config.backend.base_url.clone(),
        ))
    }
}

/// Builds the axum `Router` with all gateway routes.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/mcp", post(handle_call).get(handle_status))
        .route("/mcp/manifest", get(handle_manifest))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
        .with_state(state)
}

async fn handle_call(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let reply = state.dispatcher.handle(&body, authorization(&headers)).await;
    reply_response(reply)
}

/// The caller's `Authorization` header, passed through unchanged.
///
/// Any UTF-8 value is accepted, including non-ASCII credentials. Bytes that
/// are not UTF-8 cannot be forwarded and are dropped with a warning.
fn authorization(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?;
    match std::str::from_utf8(value.as_bytes()) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(error = %e, "Dropping Authorization header that is not valid UTF-8");
            None
        }
    }
}

async fn handle_status(State(state): State<AppState>) -> Response {
    if state.environment.is_production() {
        return (StatusCode::NOT_FOUND, Json(json!({"error": "Not Found"}))).into_response();
    }

    let tools_available: Vec<&str> = tools::TOOLS.iter().map(|tool| tool.name).collect();
    Json(json!({
        "service": SERVICE_NAME,
        "status": "ok",
        "environment": state.environment.to_string(),
        "tools_available": tools_available,
        "memory_api": state.memory_api,
    }))
    .into_response()
}

async fn handle_manifest() -> impl IntoResponse {
    Json(json!({ "tools": tools::manifest() }))
}

async fn handle_health() -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": SERVICE_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn reply_response(reply: DispatchReply) -> Response {
    let status = StatusCode::from_u16(reply.http_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(reply.response)).into_response()
}

/// Answers a panicking handler with an `InternalError` envelope.
fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unexpected failure".to_string()
    };

    tracing::error!(panic = %detail, "Request handler panicked");
    reply_response(DispatchReply::internal(detail))
}

/// Bind `addr` and serve until SIGINT or SIGTERM.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;

    tracing::info!("Weave MCP gateway ready");
    tracing::info!("   Tool calls: POST http://{}/mcp", addr);
    tracing::info!("   Manifest:   GET  http://{}/mcp/manifest", addr);
    tracing::info!("   Memory API: {}", state.memory_api);

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(Error::Serve)?;

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received SIGINT, shutting down...");
        }
        _ = terminate() => {
            tracing::info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{SignalKind, signal};
    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to install SIGTERM handler");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
