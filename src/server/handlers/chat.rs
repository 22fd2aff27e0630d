use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use super::sessions::require_session;
use crate::core::errors::ApiError;
use crate::pipeline::AnswerRequest;
use crate::state::AppState;

fn validate(request: &AnswerRequest) -> Result<(), ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    if request.k == Some(0) {
        return Err(ApiError::BadRequest("k must be at least 1".to_string()));
    }
    Ok(())
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&request)?;
    let session = require_session(&state, &session_id).await?;
    let outcome = state.pipeline.answer(Some(session.as_ref()), &request).await?;
    Ok(Json(outcome))
}

/// Everything up to the assembled prompt, without calling the model.
pub async fn prepare(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    Json(request): Json<AnswerRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate(&request)?;
    let session = require_session(&state, &session_id).await?;
    let prepared = state.pipeline.prepare(Some(session.as_ref()), &request).await;
    Ok(Json(prepared))
}
