// crates/server/src/ingest.rs
//! Write side: turn a raw update request into a store mutation or a
//! notification.
//!
//! Order of checks for progress updates: field validation (400), then the
//! secret (401), then the overshoot policy, then the store. Nothing reaches
//! the store unless every check passed.

use headway_core::{ProgressError, ProgressRecord, ProgressSample};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Raw query parameters of `PUT /api/progress`.
///
/// Numbers arrive as strings so a malformed value is reported with the
/// same JSON error shape as every other validation failure.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct UpdateQuery {
    pub name: Option<String>,
    pub current: Option<String>,
    pub total: Option<String>,
    pub comment: Option<String>,
    #[serde(alias = "Secret")]
    pub secret: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug)]
pub enum IngestOutcome {
    /// The store now holds this record.
    Updated(ProgressRecord),
    /// A message went to the owner's notifier; the store was not touched.
    Notified { owner: String },
}

fn parse_number(field: &'static str, raw: Option<&str>) -> Result<f64, ProgressError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty());
    let Some(raw) = raw else {
        return Err(ProgressError::MissingField { field });
    };
    raw.parse::<f64>()
        .map_err(|_| ProgressError::invalid(field, format!("'{raw}' is not a number")))
}

/// Validate the progress fields of a request.
pub fn parse_sample(query: &UpdateQuery) -> Result<ProgressSample, ProgressError> {
    let name = query
        .name
        .as_deref()
        .ok_or(ProgressError::MissingField { field: "name" })?;
    let current = parse_number("current", query.current.as_deref())?;
    let total = parse_number("total", query.total.as_deref())?;
    ProgressSample::new(
        name,
        current,
        total,
        query.comment.clone().unwrap_or_default(),
    )
}

fn authorize<'a>(state: &'a AppState, query: &UpdateQuery) -> ApiResult<&'a str> {
    query
        .secret
        .as_deref()
        .and_then(|secret| state.secrets.owner_for(secret))
        .ok_or(ApiError::Unauthorized)
}

/// Apply one update request.
pub async fn ingest(state: &AppState, query: UpdateQuery) -> ApiResult<IngestOutcome> {
    if let Some(message) = query.message.as_deref().filter(|m| !m.is_empty()) {
        let owner = authorize(state, &query)?.to_string();
        state.notifier.notify(&owner, message).await?;
        return Ok(IngestOutcome::Notified { owner });
    }

    let sample = parse_sample(&query)?;
    let owner = authorize(state, &query)?;
    let sample = sample.with_overshoot_policy(state.overshoot)?;
    let record = state.store.upsert(&sample, owner, state.clock.now())?;
    Ok(IngestOutcome::Updated(record))
}
