use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use super::sessions::require_session;
use crate::core::errors::ApiError;
use crate::memory::ExportFormat;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TopicsQuery {
    pub n: Option<usize>,
}

#[derive(Debug, Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    pub format: ExportFormat,
}

pub async fn memory_stats(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &session_id).await?;
    let stats = session.read().await.stats();
    Ok(Json(stats))
}

pub async fn memory_topics(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<TopicsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &session_id).await?;
    let topics = session.read().await.top_topics(params.n.unwrap_or(5));
    Ok(Json(json!({"topics": topics})))
}

pub async fn memory_export(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Query(params): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let session = require_session(&state, &session_id).await?;
    let body = session.read().await.export(params.format)?;
    let content_type = match params.format {
        ExportFormat::Json => "application/json",
        ExportFormat::Text => "text/plain; charset=utf-8",
    };
    Ok(([(header::CONTENT_TYPE, content_type)], body).into_response())
}

pub async fn memory_clear(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let session = require_session(&state, &session_id).await?;
    session.write().await.clear().await?;
    tracing::info!(session = %session_id, "Session memory cleared");
    Ok(Json(json!({"status": "cleared"})))
}
