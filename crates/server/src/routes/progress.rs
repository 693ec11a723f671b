// crates/server/src/routes/progress.rs
//! Progress ingest and query endpoints.
//!
//! - `PUT /api/progress`          -- report progress, or send a message
//! - `GET /api/progress`          -- latest sorted/filtered view
//! - `GET /api/progress/{name}`   -- one task from the latest view
//!
//! Reads are served from the last published projection and never touch the
//! store, so they can lag writes by up to one refresh period.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use headway_core::{ProgressRecord, SortOrder};
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, ApiResult};
use crate::ingest::{ingest, IngestOutcome, UpdateQuery};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/progress", get(list_progress).put(put_progress))
        .route("/progress/{name}", get(get_progress))
}

/// Query parameters for GET /api/progress
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct ProgressListQuery {
    /// Sort: updated (default), progress
    pub sort: Option<String>,
    /// Owner tag to keep; empty keeps everything.
    pub filter: Option<String>,
}

/// Response for GET /api/progress
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSnapshot {
    pub records: Vec<ProgressRecord>,
    /// Every owner tag currently tracked, for building filter links.
    pub filters: Vec<String>,
    pub sort: SortOrder,
    pub filter: String,
    /// When the underlying projection was built.
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct MessageAck {
    pub ok: bool,
}

/// PUT /api/progress
pub async fn put_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<UpdateQuery>,
) -> ApiResult<Response> {
    match ingest(&state, query).await? {
        IngestOutcome::Updated(record) => Ok(Json(record).into_response()),
        IngestOutcome::Notified { owner } => {
            tracing::debug!(owner = %owner, "Message delivered");
            Ok(Json(MessageAck { ok: true }).into_response())
        }
    }
}

/// GET /api/progress
pub async fn list_progress(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ProgressListQuery>,
) -> ApiResult<Json<ProgressSnapshot>> {
    let sort: SortOrder = query
        .sort
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(ApiError::BadRequest)?;
    let filter = query.filter.unwrap_or_default();

    let projection = state.projection();
    Ok(Json(ProgressSnapshot {
        records: projection.query(sort, &filter),
        filters: projection.filter_tags.clone(),
        sort,
        filter,
        generated_at: projection.generated_at,
    }))
}

/// GET /api/progress/{name}
pub async fn get_progress(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<ProgressRecord>> {
    state
        .projection()
        .find(&name)
        .cloned()
        .map(Json)
        .ok_or(ApiError::TaskNotFound(name))
}
