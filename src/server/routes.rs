//! Axum route handlers for the UI agent HTTP server.
//!
//! # Routes
//!
//! - `GET  /health`                      - Liveness probe, includes MCP readiness
//! - `GET  /.well-known/agent-card.json` - Agent card
//! - `POST /a2a/tasks/send`              - Run a `render_ui` task

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::a2a::types::{AgentCard, TaskRequest, TaskResponse, TaskState};
use crate::a2a::TaskService;
use crate::agents::TaskError;

/// Service name reported by `/health`.
pub const SERVICE_NAME: &str = "freesail-ui-agent";

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub tasks: Arc<TaskService>,
}

impl AppState {
    pub fn new(tasks: Arc<TaskService>) -> Self {
        Self { tasks }
    }
}

/// Build the axum router with all routes.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/.well-known/agent-card.json", get(agent_card_handler))
        .route("/a2a/tasks/send", post(send_task_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// GET /health - liveness probe.
async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "version": crate::VERSION,
        "service": SERVICE_NAME,
        "mcp_ready": state.tasks.is_ready(),
    }))
}

/// GET /.well-known/agent-card.json
async fn agent_card_handler(State(state): State<AppState>) -> Json<AgentCard> {
    Json(state.tasks.card().clone())
}

/// POST /a2a/tasks/send - run one task to completion.
///
/// Request:  `{ "task_id": "...", "skill_id": "render_ui", "input": {"session_id", "instruction"} }`
/// Response: `TaskResponse`; 200 when completed, 500 when the run failed.
/// Rejected before running: 400 (bad body, unknown skill, missing input),
/// 503 (MCP connection not ready).
async fn send_task_handler(
    State(state): State<AppState>,
    payload: Result<Json<TaskRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<TaskResponse>), (StatusCode, Json<Value>)> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected task body");
        error_response(StatusCode::BAD_REQUEST, rejection.body_text())
    })?;

    match state.tasks.handle(request).await {
        Ok(response) => {
            let status = match response.status {
                TaskState::Completed => StatusCode::OK,
                TaskState::Failed => StatusCode::INTERNAL_SERVER_ERROR,
            };
            Ok((status, Json(response)))
        }
        Err(e) => {
            let status = match &e {
                TaskError::ConnectionNotReady => StatusCode::SERVICE_UNAVAILABLE,
                e if e.is_client_error() => StatusCode::BAD_REQUEST,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!(status = status.as_u16(), error = %e, "task rejected");
            Err(error_response(status, e.to_string()))
        }
    }
}

fn error_response(status: StatusCode, detail: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": detail.into() })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
