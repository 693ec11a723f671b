// crates/core/src/store.rs
//! The shared, in-memory progress store.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::ProgressError;
use crate::estimator::estimate;
use crate::record::{ProgressRecord, ProgressSample};

/// Keyed collection of progress records behind a single lock.
///
/// Uses `std::sync::Mutex` (not `tokio::sync::Mutex`): every operation is
/// short, purely in-memory, and never held across an `.await`.
#[derive(Debug, Default)]
pub struct ProgressStore {
    records: Mutex<BTreeMap<String, ProgressRecord>>,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, ProgressRecord>> {
        // Records are only replaced wholesale, so a panic elsewhere while the
        // lock was held cannot leave a half-written record behind.
        self.records.lock().unwrap_or_else(|e: PoisonError<_>| {
            tracing::error!("Progress store mutex poisoned, recovering");
            e.into_inner()
        })
    }

    /// Merge `sample` into the record for its name, creating it if needed.
    ///
    /// `owner` is recorded only when the record is created. Nothing is stored
    /// if the estimate is refused.
    pub fn upsert(
        &self,
        sample: &ProgressSample,
        owner: &str,
        now: DateTime<Utc>,
    ) -> Result<ProgressRecord, ProgressError> {
        let mut records = self.lock();
        let previous = records.get(&sample.name);
        let created = previous.is_none();
        let record = estimate(previous, sample, owner, now)?;
        records.insert(record.name.clone(), record.clone());
        drop(records);

        if created {
            tracing::info!(name = %record.name, owner = %record.owner, "Tracking new task");
        } else {
            tracing::debug!(
                name = %record.name,
                current = record.current,
                total = record.total,
                remaining_secs = record.remaining_secs,
                "Task updated"
            );
        }
        Ok(record)
    }

    /// Point-in-time copy of every record, ordered by name.
    pub fn snapshot(&self) -> Vec<ProgressRecord> {
        self.lock().values().cloned().collect()
    }

    /// Look up a single record.
    pub fn get(&self, name: &str) -> Option<ProgressRecord> {
        self.lock().get(name).cloned()
    }

    /// Remove every record whose last update is strictly more than
    /// `stale_after` before `now`. Returns how many were removed.
    pub fn evict(&self, stale_after: Duration, now: DateTime<Utc>) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|_, record| {
            (now - record.last_update)
                .to_std()
                .map(|age| age <= stale_after)
                .unwrap_or(true)
        });
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use std::sync::Arc;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn sample(name: &str, current: f64, total: f64) -> ProgressSample {
        ProgressSample::new(name, current, total, "").unwrap()
    }

    #[test]
    fn test_upsert_creates_then_updates() {
        let store = ProgressStore::new();
        let created = store.upsert(&sample("build", 10.0, 100.0), "alice", t0()).unwrap();
        assert_eq!(created.started, t0());
        assert_eq!(created.rate_estimate, 0.0);
        assert_eq!(store.len(), 1);

        let updated = store
            .upsert(
                &sample("build", 50.0, 100.0),
                "bob",
                t0() + ChronoDuration::seconds(30),
            )
            .unwrap();
        assert_eq!(store.len(), 1);
        assert_eq!(updated.started, t0());
        assert_eq!(updated.owner, "alice");
        assert!(updated.rate_estimate > 0.0);
        assert_eq!(store.get("build"), Some(updated));
    }

    #[test]
    fn test_refused_estimate_leaves_store_unchanged() {
        let store = ProgressStore::new();
        let created = store
            .upsert(&sample("huge", 1.0, f64::MAX), "alice", t0())
            .unwrap();
        let err = store.upsert(
            &sample("huge", 2.0, f64::MAX),
            "alice",
            t0() + ChronoDuration::seconds(100),
        );
        assert!(err.is_err());
        assert_eq!(store.get("huge"), Some(created));
    }

    #[test]
    fn test_snapshot_is_ordered_by_name() {
        let store = ProgressStore::new();
        for name in ["zeta", "alpha", "mid"] {
            store.upsert(&sample(name, 1.0, 2.0), "alice", t0()).unwrap();
        }
        let names: Vec<_> = store.snapshot().into_iter().map(|r| r.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_evict_is_strict_and_preserves_survivors() {
        let store = ProgressStore::new();
        let hour = Duration::from_secs(3600);

        store.upsert(&sample("old", 1.0, 10.0), "alice", t0()).unwrap();
        store
            .upsert(&sample("edge", 1.0, 10.0), "alice", t0() + ChronoDuration::seconds(1))
            .unwrap();
        store
            .upsert(&sample("fresh", 1.0, 10.0), "alice", t0() + ChronoDuration::seconds(1800))
            .unwrap();
        let fresh = store
            .upsert(&sample("fresh", 5.0, 10.0), "alice", t0() + ChronoDuration::seconds(1900))
            .unwrap();
        assert!(fresh.rate_estimate > 0.0);

        // "edge" is exactly one hour old: kept. "old" is one second past: gone.
        let now = t0() + ChronoDuration::seconds(3601);
        let removed = store.evict(hour, now);
        assert_eq!(removed, 1);
        assert!(store.get("old").is_none());
        assert!(store.get("edge").is_some());
        assert_eq!(store.get("fresh"), Some(fresh));
    }

    #[test]
    fn test_evict_ignores_records_from_the_future() {
        let store = ProgressStore::new();
        store
            .upsert(&sample("ahead", 1.0, 10.0), "alice", t0() + ChronoDuration::hours(2))
            .unwrap();
        assert_eq!(store.evict(Duration::from_secs(60), t0()), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_evict_on_empty_store() {
        let store = ProgressStore::new();
        assert_eq!(store.evict(Duration::ZERO, t0()), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_concurrent_upserts_keep_every_name() {
        let store = Arc::new(ProgressStore::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    for step in 0..50 {
                        let s = sample(&format!("task-{worker}"), step as f64, 50.0);
                        store
                            .upsert(&s, "alice", t0() + ChronoDuration::seconds(step))
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 8);
        for record in snapshot {
            assert_eq!(record.current, 49.0);
            assert_eq!(record.started, t0());
        }
    }
}
