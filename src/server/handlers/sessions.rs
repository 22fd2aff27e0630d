use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::memory::SessionMemory;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Resume a persisted session instead of starting a fresh one.
    pub session_id: Option<String>,
}

pub async fn create_session(
    State(state): State<Arc<AppState>>,
    payload: Option<Json<CreateSessionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    let session = state.sessions.open(payload.session_id).await?;
    let (turns, warning) = {
        let store = session.read().await;
        (store.len(), store.load_warning().map(str::to_string))
    };

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "session_id": session.id,
            "created_at": session.created_at.to_rfc3339(),
            "turns": turns,
            "memory_unavailable": warning.is_some(),
            "warning": warning,
        })),
    ))
}

pub async fn close_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    if !state.sessions.close(&session_id).await {
        return Err(ApiError::NotFound(format!("Session '{}' not found", session_id)));
    }
    Ok(Json(json!({"status": "closed", "session_id": session_id})))
}

pub(crate) async fn require_session(
    state: &AppState,
    session_id: &str,
) -> Result<Arc<SessionMemory>, ApiError> {
    state
        .sessions
        .get(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Session '{}' not found", session_id)))
}
