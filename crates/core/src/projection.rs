// crates/core/src/projection.rs
//! Read-side views built from a store snapshot.
//!
//! A [`Projection`] is rebuilt periodically and handed to readers as an
//! immutable value, so the two orderings and the tag list always come from
//! the same snapshot.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::ProgressRecord;

/// Ordering requested by a reader.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Most recently updated first.
    #[default]
    Updated,
    /// Highest `current / total` first.
    Progress,
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "updated" => Ok(Self::Updated),
            "progress" => Ok(Self::Progress),
            other => Err(format!(
                "unknown sort '{other}' (expected 'progress' or 'updated')"
            )),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Updated => "updated",
            Self::Progress => "progress",
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// `last_update` descending, then name ascending.
    pub by_recency: Vec<ProgressRecord>,
    /// Ratio descending, then name ascending.
    pub by_progress: Vec<ProgressRecord>,
    /// Distinct owner tags, alphabetical.
    pub filter_tags: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

impl Projection {
    pub fn empty(now: DateTime<Utc>) -> Self {
        Self {
            by_recency: Vec::new(),
            by_progress: Vec::new(),
            filter_tags: Vec::new(),
            generated_at: now,
        }
    }

    pub fn build(records: Vec<ProgressRecord>, now: DateTime<Utc>) -> Self {
        let filter_tags: Vec<String> = records
            .iter()
            .map(|r| r.owner.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut by_recency = records.clone();
        by_recency.sort_by(|a, b| {
            b.last_update
                .cmp(&a.last_update)
                .then_with(|| a.name.cmp(&b.name))
        });

        let mut by_progress = records;
        by_progress.sort_by(|a, b| {
            b.ratio()
                .total_cmp(&a.ratio())
                .then_with(|| a.name.cmp(&b.name))
        });

        Self {
            by_recency,
            by_progress,
            filter_tags,
            generated_at: now,
        }
    }

    pub fn sorted(&self, order: SortOrder) -> &[ProgressRecord] {
        match order {
            SortOrder::Updated => &self.by_recency,
            SortOrder::Progress => &self.by_progress,
        }
    }

    /// Records in the requested order whose owner equals `filter` exactly.
    /// An empty filter keeps everything.
    pub fn query(&self, order: SortOrder, filter: &str) -> Vec<ProgressRecord> {
        self.sorted(order)
            .iter()
            .filter(|r| filter.is_empty() || r.owner == filter)
            .cloned()
            .collect()
    }

    pub fn find(&self, name: &str) -> Option<&ProgressRecord> {
        self.by_recency.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.by_recency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_recency.is_empty()
    }
}
