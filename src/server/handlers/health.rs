use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({ "status": "healthy" }))
}

/// Embedding round-trip check against the configured backend.
pub async fn llm_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let healthy = state.llm.health_check().await.unwrap_or(false);
    Json(json!({
        "status": if healthy { "success" } else { "error" },
        "llm_backend": if healthy { "valid" } else { "invalid" },
    }))
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "operations": state.metrics.snapshot(),
        "indexed_chunks": state.index.len().await,
    }))
}
