//! Storage inspection and reset.

use axum::{extract::State, Json};
use serde::Serialize;

use lectern_core::size::human_size;
use lectern_core::traits::TableInfo;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DatabaseResponse {
    pub backend: String,
    /// Human-readable size, `unknown` when the backend cannot tell.
    pub size: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    pub vector_count: u64,
    pub tables: Vec<TableSummary>,
}

#[derive(Debug, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub size: String,
    pub indexes: Vec<String>,
    /// Comma-separated index list, or `No index`.
    pub index_summary: String,
}

impl From<TableInfo> for TableSummary {
    fn from(table: TableInfo) -> Self {
        let index_summary = if table.indexes.is_empty() {
            "No index".to_string()
        } else {
            table.indexes.join(", ")
        };
        Self {
            name: table.name,
            size: table.size,
            indexes: table.indexes,
            index_summary,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub message: String,
    pub deleted: u64,
}

/// Storage usage and table listing.
/// GET /database
pub async fn database_info(State(state): State<AppState>) -> ApiResult<Json<DatabaseResponse>> {
    let stats = state.index.stats().await?;
    Ok(Json(DatabaseResponse {
        backend: stats.backend,
        size: stats
            .size_bytes
            .map(human_size)
            .unwrap_or_else(|| "unknown".to_string()),
        size_bytes: stats.size_bytes,
        vector_count: stats.vector_count,
        tables: stats.tables.into_iter().map(Into::into).collect(),
    }))
}

/// Delete every indexed vector.
/// DELETE /database
pub async fn clear_database(State(state): State<AppState>) -> ApiResult<Json<ClearResponse>> {
    let deleted = state.index.clear().await?;
    Ok(Json(ClearResponse {
        message: "All documents deleted".to_string(),
        deleted,
    }))
}
