//! Axum app: shared state and router (§4.9 Request Surface).

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use weave_engine::ExecutionEngine;

/// Everything the `/execute` handler needs, built once at startup and
/// shared read-only across concurrent requests (§5): each request owns its
/// own [`weave_engine::Context`] internally, the engine and its registry are
/// the only state that crosses request boundaries.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ExecutionEngine>,
    /// §5: wall-clock timeout per request, default 300s.
    pub request_timeout: Duration,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(crate::execute::execute_handler))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Unconditional liveness probe (§6.1): never touches the engine or gateway,
/// so it stays up even while a downstream provider is unreachable.
async fn healthz() -> (StatusCode, Json<serde_json::Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
