//! API route handlers for the headway server.

pub mod health;
pub mod progress;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined API router with all routes under /api prefix.
///
/// Routes:
/// - GET /api/health - Health check
/// - PUT /api/progress - Report progress for a task, or send a message
/// - GET /api/progress - Latest sorted/filtered view of all tasks
/// - GET /api/progress/{name} - A single task from the latest view
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", progress::router())
        .with_state(state)
}
