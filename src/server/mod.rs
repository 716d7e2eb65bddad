//! HTTP 接口（axum）
//!
//! - `GET /api/dashboard`：三源快照
//! - `POST /api/assistant`：`{input}` -> `{reply, actions}`
//! - `GET /health`

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::actions::ActionRecord;
use crate::assistant::AssistantEngine;
use crate::dashboard::{ContextSnapshot, SnapshotProvider};

pub struct AppState {
    pub snapshots: SnapshotProvider,
    pub engine: AssistantEngine,
}

#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    #[serde(default)]
    pub input: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AssistantResponse {
    pub reply: String,
    pub actions: Vec<ActionRecord>,
}

type ApiError = (StatusCode, Json<Value>);

fn api_error(status: StatusCode, message: &str) -> ApiError {
    (status, Json(json!({ "error": message })))
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/dashboard", get(api_dashboard))
        .route("/api/assistant", post(api_assistant))
        .route("/health", get(|| async { "OK" }))
        .with_state(state)
}

async fn api_dashboard(State(state): State<Arc<AppState>>) -> Json<ContextSnapshot> {
    Json(state.snapshots.get_snapshot().await)
}

/// 请求体无法解析、缺少 input、input 不是字符串或为空白时一律 400；其余原样交给模型
async fn api_assistant(
    State(state): State<Arc<AppState>>,
    body: Option<Json<AssistantRequest>>,
) -> Result<Json<AssistantResponse>, ApiError> {
    let input = body
        .and_then(|Json(req)| req.input)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Missing input"))?;

    let snapshot = state.snapshots.get_snapshot().await;
    match state.engine.run(&input, &snapshot).await {
        Ok(outcome) => Ok(Json(AssistantResponse {
            reply: outcome.message,
            actions: outcome.actions,
        })),
        Err(e) => {
            tracing::error!(error = %e, "assistant run failed");
            let message = e.to_string();
            let message = if message.trim().is_empty() {
                "Assistant failed"
            } else {
                message.as_str()
            };
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, message))
        }
    }
}
