// crates/server/src/lib.rs
//! Headway server library.
//!
//! This crate provides the Axum-based HTTP server that collects progress
//! updates from worker processes and serves sorted, filtered views of every
//! live task, plus the background maintenance that keeps those views fresh.

pub mod config;
pub mod error;
pub mod ingest;
pub mod maintenance;
pub mod notify;
pub mod routes;
pub mod secrets;
pub mod state;

pub use config::Config;
pub use error::*;
pub use routes::api_routes;
pub use state::AppState;

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the Axum application with all routes and middleware.
///
/// This sets up:
/// - API routes (health, progress ingest and query)
/// - CORS (allows any origin, so dashboards can poll from anywhere)
/// - Request tracing
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api_routes(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

// ============================================================================
// Integration Tests
// ============================================================================
