//! Prompt settings endpoints.

use axum::{extract::State, Json};

use lectern_core::config::{Prompts, PromptsUpdate};

use crate::error::ApiResult;
use crate::state::AppState;

/// Current prompts.
/// GET /settings
pub async fn get_settings(State(state): State<AppState>) -> ApiResult<Json<Prompts>> {
    Ok(Json(state.prompts.snapshot().await))
}

/// Update one or both prompts. Omitted fields keep their value.
/// PUT /settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(update): Json<PromptsUpdate>,
) -> ApiResult<Json<Prompts>> {
    Ok(Json(state.prompts.update(update).await?))
}
