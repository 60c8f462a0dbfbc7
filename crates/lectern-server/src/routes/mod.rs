//! Route definitions for the REST API.

mod database;
mod documents;
mod health;
mod query;
mod settings;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

/// Largest accepted upload.
pub const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Create the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Ingestion
        .route(
            "/documents",
            post(documents::upload_document).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        // Question answering
        .route("/query", post(query::query))
        // Prompt settings
        .route(
            "/settings",
            get(settings::get_settings).put(settings::update_settings),
        )
        // Storage panel
        .route(
            "/database",
            get(database::database_info).delete(database::clear_database),
        )
        .with_state(state)
}

pub use database::*;
pub use documents::*;
pub use health::*;
pub use query::*;
pub use settings::*;
