//! Question answering endpoint.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::AppState;

/// Request body for a question.
#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    pub answer: String,
}

/// Answer a question over the indexed documents.
///
/// Uses the system prompt current at the time of the request.
/// POST /query
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> ApiResult<Json<QueryResponse>> {
    let prompts = state.prompts.snapshot().await;
    let answer = state.agent.chat(&request.query, &prompts.system_prompt).await?;
    Ok(Json(QueryResponse { answer }))
}
