use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::rag::RetrievalMethod;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct RetrieveRequest {
    pub query: String,
    pub k: Option<usize>,
    #[serde(default)]
    pub method: RetrievalMethod,
}

/// Retrieval plus quality diagnostics; no web search, no memory.
pub async fn retrieve(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RetrieveRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".to_string()));
    }
    let retriever = state.pipeline.retriever();
    let k = request.k.unwrap_or_else(|| retriever.default_k()).max(1);
    let result = retriever
        .retrieve_with(request.query.trim(), k, request.method)
        .await;
    let report = retriever.scorer().report(&result.chunks);

    Ok(Json(json!({
        "result": result,
        "quality": report,
        "needs_supplement": report.needs_supplement(state.config.scoring.threshold),
        "recommendations": report.recommendations(),
    })))
}
