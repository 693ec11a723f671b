// crates/core/src/estimator.rs
//! Time-to-completion estimation.
//!
//! Each accepted sample blends the previous rate estimate with the
//! instantaneous "slowness" of the last step using an exponential weight.
//! The weight leans further towards history as the task progresses and as
//! `total` grows, so a single slow or fast step barely moves the estimate of
//! a large job that is nearly done.
//!
//! ```text
//! ratio     = current / total
//! decay     = (e - 1) * ratio + 1
//! weight    = exp(-1 / (total * decay))
//! slowness  = total * secs(now - last_update)
//! rate'     = rate * weight + slowness * (1 - weight)
//! remaining = (1 - ratio) * rate'
//! ```
//!
//! The first update after creation seeds `rate` from the average pace so far,
//! `elapsed * (total - current) / current`, unless `current` is still zero.

use std::f64::consts::E;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ProgressError;
use crate::record::{ProgressRecord, ProgressSample};

/// Fold `sample` into `previous` (or create a record when there is none).
///
/// `started` and `owner` are taken from `previous` when it exists; `owner`
/// is only used on creation. `last_update` never moves backwards even if
/// `now` does.
pub fn estimate(
    previous: Option<&ProgressRecord>,
    sample: &ProgressSample,
    owner: &str,
    now: DateTime<Utc>,
) -> Result<ProgressRecord, ProgressError> {
    let Some(prev) = previous else {
        return Ok(ProgressRecord {
            name: sample.name.clone(),
            current: sample.current,
            total: sample.total,
            comment: sample.comment.clone(),
            owner: owner.to_string(),
            started: now,
            last_update: now,
            last_completed: Duration::ZERO,
            rate_estimate: 0.0,
            remaining_secs: 0.0,
        });
    };

    let last_update = now.max(prev.last_update);
    let last_completed = (last_update - prev.last_update)
        .to_std()
        .unwrap_or_default();
    let since_start = (last_update - prev.started).to_std().unwrap_or_default();

    let ratio = sample.current / sample.total;
    let decay = (E - 1.0) * ratio + 1.0;
    let weight = (-1.0 / (sample.total * decay)).exp();
    let slowness = sample.total * last_completed.as_secs_f64();

    let mut rate = prev.rate_estimate;
    if rate == 0.0 && sample.current > 0.0 {
        rate = since_start.as_secs_f64() * (sample.total - sample.current) / sample.current;
    }

    let rate = rate * weight + slowness * (1.0 - weight);
    let remaining = ((1.0 - ratio) * rate).max(0.0);

    ensure_finite(&sample.name, "smoothing weight", weight)?;
    ensure_finite(&sample.name, "rate estimate", rate)?;
    ensure_finite(&sample.name, "remaining time", remaining)?;

    Ok(ProgressRecord {
        name: sample.name.clone(),
        current: sample.current,
        total: sample.total,
        comment: sample.comment.clone(),
        owner: prev.owner.clone(),
        started: prev.started,
        last_update,
        last_completed,
        rate_estimate: rate,
        remaining_secs: remaining,
    })
}

fn ensure_finite(name: &str, quantity: &'static str, value: f64) -> Result<(), ProgressError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ProgressError::NonFinite {
            name: name.to_string(),
            quantity,
        })
    }
}
