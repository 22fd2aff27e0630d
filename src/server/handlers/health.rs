use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (index_ok, indexed_chunks) = match state.index.count().await {
        Ok(count) => (true, count),
        Err(err) => {
            tracing::warn!("Index health check failed: {}", err);
            (false, 0)
        }
    };

    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "index_available": index_ok,
        "indexed_chunks": indexed_chunks,
        "llm_model": state.pipeline.llm_name(),
        "active_sessions": state.sessions.session_ids().await.len(),
        "started_at": state.started_at.to_rfc3339(),
    }))
}
