use std::path::PathBuf;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Domain errors for the retrieval and composition pipeline.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("embedding backend unavailable: {0}")]
    EmbeddingUnavailable(String),
    #[error("completion backend unavailable: {0}")]
    CompletionUnavailable(String),
    #[error("cannot build an index from zero chunks")]
    EmptyCorpus,
    #[error("no persisted index at {0}")]
    IndexNotFound(PathBuf),
    #[error("index snapshot could not be decoded: {0}")]
    CorruptSnapshot(String),
    #[error("persistence failed: {0}")]
    Persistence(#[from] std::io::Error),
    #[error("ingest failed for source {source_id}: {reason}")]
    SourceIngest { source_id: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("service unavailable")]
    ServiceUnavailable,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<AdvisorError> for ApiError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::EmbeddingUnavailable(_) | AdvisorError::CompletionUnavailable(_) => {
                ApiError::ServiceUnavailable
            }
            AdvisorError::IndexNotFound(path) => {
                ApiError::NotFound(format!("index at {}", path.display()))
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::ServiceUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service unavailable".to_string(),
            ),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
