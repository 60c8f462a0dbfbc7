//! lectern-server - REST API server for lectern.
//!
//! Exposes document upload, question answering, prompt settings and the
//! storage panel over HTTP.
//!
//! # Example
//!
//! ```ignore
//! use lectern_core::LecternConfig;
//! use lectern_server::{create_server, create_state};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = LecternConfig::load()?;
//!     let app = create_server(create_state(&config).await?);
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod factory;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use factory::create_state;
pub use state::{AppState, ServiceInfo};

use axum::{middleware as axum_middleware, Router};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Create the server with all routes and middleware.
pub fn create_server(state: AppState) -> Router {
    routes::create_router(state).layer(
        ServiceBuilder::new()
            .layer(axum_middleware::from_fn(middleware::logging_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(middleware::cors_layer()),
    )
}
