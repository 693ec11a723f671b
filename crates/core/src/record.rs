// crates/core/src/record.rs
//! Progress record and incoming sample types.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::ProgressError;
use crate::humanize::{format_duration_short, format_secs_short};

// =============================================================================
// Overshoot policy
// =============================================================================

/// What to do with a sample whose `current` exceeds its `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OvershootPolicy {
    /// Store `current = total`.
    #[default]
    Clamp,
    /// Refuse the sample.
    Reject,
    /// Store the sample as sent; the ratio may exceed 1.
    Allow,
}

impl FromStr for OvershootPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "clamp" => Ok(Self::Clamp),
            "reject" => Ok(Self::Reject),
            "allow" => Ok(Self::Allow),
            other => Err(format!(
                "unknown overshoot policy '{other}' (expected clamp, reject or allow)"
            )),
        }
    }
}

impl fmt::Display for OvershootPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Clamp => "clamp",
            Self::Reject => "reject",
            Self::Allow => "allow",
        })
    }
}

// =============================================================================
// Incoming sample
// =============================================================================

/// A validated progress report for one task.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSample {
    pub name: String,
    pub current: f64,
    pub total: f64,
    pub comment: String,
}

impl ProgressSample {
    /// Validate the raw fields of a report.
    ///
    /// `name` must be non-blank, `current` finite and non-negative, `total`
    /// finite and strictly positive.
    pub fn new(
        name: impl Into<String>,
        current: f64,
        total: f64,
        comment: impl Into<String>,
    ) -> Result<Self, ProgressError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ProgressError::MissingField { field: "name" });
        }
        if !current.is_finite() || current < 0.0 {
            return Err(ProgressError::invalid(
                "current",
                format!("{current} is not a finite, non-negative number"),
            ));
        }
        if !total.is_finite() || total <= 0.0 {
            return Err(ProgressError::invalid(
                "total",
                format!("{total} must be a finite number greater than zero"),
            ));
        }
        Ok(Self {
            name,
            current,
            total,
            comment: comment.into(),
        })
    }

    /// Apply the overshoot policy to a validated sample.
    pub fn with_overshoot_policy(mut self, policy: OvershootPolicy) -> Result<Self, ProgressError> {
        if self.current <= self.total {
            return Ok(self);
        }
        match policy {
            OvershootPolicy::Clamp => {
                tracing::debug!(
                    name = %self.name,
                    current = self.current,
                    total = self.total,
                    "Clamping overshooting progress"
                );
                self.current = self.total;
                Ok(self)
            }
            OvershootPolicy::Reject => Err(ProgressError::invalid(
                "current",
                format!("{} exceeds total {}", self.current, self.total),
            )),
            OvershootPolicy::Allow => Ok(self),
        }
    }

    pub fn ratio(&self) -> f64 {
        self.current / self.total
    }
}

// =============================================================================
// Stored record
// =============================================================================

/// Live state of one task, keyed by `name`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub name: String,
    pub current: f64,
    pub total: f64,
    pub comment: String,
    /// Owner tag of the caller that created the record. Never changes.
    pub owner: String,
    /// First time this name was seen. Never changes.
    pub started: DateTime<Utc>,
    pub last_update: DateTime<Utc>,
    /// Time between the two most recent accepted samples.
    pub last_completed: Duration,
    /// Smoothed estimate carried from one sample to the next.
    pub rate_estimate: f64,
    pub remaining_secs: f64,
}

/// Human-readable fields derived from a record's numeric state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressDisplay {
    pub remaining: String,
    pub elapsed: String,
    pub last_took: String,
}

impl ProgressRecord {
    /// `current / total`.
    pub fn ratio(&self) -> f64 {
        self.current / self.total
    }

    /// Time between the first and the latest accepted sample.
    pub fn elapsed(&self) -> Duration {
        (self.last_update - self.started).to_std().unwrap_or_default()
    }

    /// Whether a usable rate estimate exists yet.
    pub fn has_estimate(&self) -> bool {
        self.rate_estimate > 0.0 || self.ratio() >= 1.0
    }

    pub fn display(&self) -> ProgressDisplay {
        ProgressDisplay {
            remaining: if self.has_estimate() {
                format_secs_short(self.remaining_secs)
            } else {
                "unknown".to_string()
            },
            elapsed: format_duration_short(self.elapsed()),
            last_took: format_duration_short(self.last_completed),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProgressRecordView<'a> {
    name: &'a str,
    current: f64,
    total: f64,
    comment: &'a str,
    owner: &'a str,
    started: DateTime<Utc>,
    last_update: DateTime<Utc>,
    last_completed_secs: f64,
    rate_estimate: f64,
    remaining_secs: f64,
    #[serde(flatten)]
    display: ProgressDisplay,
}

impl Serialize for ProgressRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ProgressRecordView {
            name: &self.name,
            current: self.current,
            total: self.total,
            comment: &self.comment,
            owner: &self.owner,
            started: self.started,
            last_update: self.last_update,
            last_completed_secs: self.last_completed.as_secs_f64(),
            rate_estimate: self.rate_estimate,
            remaining_secs: self.remaining_secs,
            display: self.display(),
        }
        .serialize(serializer)
    }
}
