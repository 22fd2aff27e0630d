use std::future::Future;
use std::time::Duration;

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use thiserror::Error;

/// Failure taxonomy of the retrieval engine.
///
/// Most variants are recovered locally by the component that observes them
/// and only show up as flags on the returned value; `Config` is the one fatal
/// kind and is raised once at startup or session creation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("embedding index returned no chunks")]
    EmptyIndex,
    #[error("web search unavailable: {0}")]
    WebSearchUnavailable(String),
    #[error("conversation memory unavailable: {0}")]
    MemoryUnavailable(String),
    #[error("malformed score input: {0}")]
    MalformedScoreInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("collaborator failed: {0}")]
    Collaborator(String),
    #[error("{0} timed out after {1} ms")]
    Timeout(&'static str, u64),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Internal(err.to_string())
    }

    pub fn storage<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Storage(err.to_string())
    }

    pub fn collaborator<E: std::fmt::Display>(err: E) -> Self {
        EngineError::Collaborator(err.to_string())
    }

    pub fn web<E: std::fmt::Display>(err: E) -> Self {
        EngineError::WebSearchUnavailable(err.to_string())
    }

    pub fn memory<E: std::fmt::Display>(err: E) -> Self {
        EngineError::MemoryUnavailable(err.to_string())
    }

    pub fn config(message: impl Into<String>) -> Self {
        EngineError::Config(message.into())
    }
}

/// Run a collaborator call under a deadline; elapsing maps to `Timeout`.
pub async fn with_deadline<T, F>(
    label: &'static str,
    limit: Duration,
    fut: F,
) -> Result<T, EngineError>
where
    F: Future<Output = Result<T, EngineError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(EngineError::Timeout(label, limit.as_millis() as u64)),
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("upstream failure: {0}")]
    BadGateway(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn internal<E: std::fmt::Display>(err: E) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Config(msg) => ApiError::BadRequest(msg),
            EngineError::Collaborator(msg) => ApiError::BadGateway(msg),
            EngineError::Timeout(..) => ApiError::BadGateway(err.to_string()),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
        };

        let body = Json(json!({ "error": message }));
        (status, body).into_response()
    }
}
