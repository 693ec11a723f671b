// crates/server/src/maintenance.rs
//! Background maintenance: stale-task eviction and projection refresh.
//!
//! Two independent tasks share the [`AppState`]:
//!
//! - **eviction**: every `evict_every`, drops tasks not updated within
//!   `stale_after` (first run one period after start).
//! - **refresh**: every `refresh_every`, snapshots the store and publishes a
//!   fresh [`Projection`] (first run immediately).
//!
//! Cadence comes from `tokio::time::interval`, timestamps from the state's
//! [`Clock`](headway_core::Clock), so tests can drive both without waiting.
//! Cancelling the token stops both tasks between ticks; a tick that has
//! started always finishes its eviction or publish.

use std::sync::Arc;
use std::time::Duration;

use headway_core::Projection;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::DEFAULT_STALE_AFTER_SECS;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaintenanceSettings {
    pub stale_after: Duration,
    pub evict_every: Duration,
    pub refresh_every: Duration,
}

impl Default for MaintenanceSettings {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(DEFAULT_STALE_AFTER_SECS),
            evict_every: Duration::from_secs(3600),
            refresh_every: Duration::from_secs(1),
        }
    }
}

/// Join handles for the two maintenance tasks.
pub struct MaintenanceHandle {
    evict: JoinHandle<()>,
    refresh: JoinHandle<()>,
}

impl MaintenanceHandle {
    /// Wait for both tasks to stop. Call after cancelling their token.
    pub async fn join(self) {
        for (task, handle) in [("eviction", self.evict), ("refresh", self.refresh)] {
            if let Err(e) = handle.await {
                warn!(task, error = %e, "Maintenance task ended abnormally");
            }
        }
    }
}

/// Spawn the eviction and refresh tasks.
pub fn start(
    state: Arc<AppState>,
    settings: MaintenanceSettings,
    cancel: CancellationToken,
) -> MaintenanceHandle {
    let evict = tokio::spawn(run_eviction(
        Arc::clone(&state),
        settings.stale_after,
        settings.evict_every,
        cancel.clone(),
    ));
    let refresh = tokio::spawn(run_refresh(state, settings.refresh_every, cancel));

    info!(
        stale_after_secs = settings.stale_after.as_secs(),
        evict_every_secs = settings.evict_every.as_secs(),
        refresh_every_ms = settings.refresh_every.as_millis() as u64,
        "Maintenance started with 2 background tasks"
    );

    MaintenanceHandle { evict, refresh }
}

/// Remove stale tasks now. Returns how many were removed.
pub fn evict_stale(state: &AppState, stale_after: Duration) -> usize {
    let removed = state.store.evict(stale_after, state.clock.now());
    if removed > 0 {
        info!(removed, remaining = state.store.len(), "Evicted stale tasks");
    } else {
        debug!("No stale tasks to evict");
    }
    removed
}

/// Rebuild and publish the projection now.
///
/// Only the snapshot copy happens under the store lock; sorting and tag
/// extraction run on the copy.
pub fn refresh_projection(state: &AppState) -> Arc<Projection> {
    let records = state.store.snapshot();
    let projection = Projection::build(records, state.clock.now());
    state.publish(projection);
    state.projection()
}

fn ticker(first: Instant, period: Duration) -> tokio::time::Interval {
    let mut interval = tokio::time::interval_at(first, period.max(Duration::from_millis(1)));
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    interval
}

async fn run_eviction(
    state: Arc<AppState>,
    stale_after: Duration,
    every: Duration,
    cancel: CancellationToken,
) {
    let mut interval = ticker(Instant::now() + every, every);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                evict_stale(&state, stale_after);
            }
        }
    }
    debug!("Eviction task stopped");
}

async fn run_refresh(state: Arc<AppState>, every: Duration, cancel: CancellationToken) {
    let mut interval = ticker(Instant::now(), every);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                refresh_projection(&state);
            }
        }
    }
    debug!("Refresh task stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::LogNotifier;
    use crate::secrets::SecretRegistry;
    use chrono::{DateTime, TimeZone, Utc};
    use headway_core::{ManualClock, OvershootPolicy, ProgressSample};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn test_state(clock: Arc<ManualClock>) -> Arc<AppState> {
        AppState::with_parts(
            SecretRegistry::new(),
            clock,
            Arc::new(LogNotifier),
            OvershootPolicy::Clamp,
        )
    }

    fn upsert(state: &AppState, name: &str, current: f64, owner: &str) {
        let sample = ProgressSample::new(name, current, 100.0, "").unwrap();
        state.store.upsert(&sample, owner, state.clock.now()).unwrap();
    }

    fn settings() -> MaintenanceSettings {
        MaintenanceSettings {
            stale_after: Duration::from_secs(3600),
            evict_every: Duration::from_secs(60),
            refresh_every: Duration::from_secs(1),
        }
    }

    #[test]
    fn test_refresh_projection_publishes_snapshot() {
        let clock = Arc::new(ManualClock::new(t0()));
        let state = test_state(clock.clone());
        upsert(&state, "b", 80.0, "bob");
        upsert(&state, "a", 20.0, "alice");

        clock.advance(chrono::Duration::seconds(3));
        let projection = refresh_projection(&state);
        assert_eq!(projection.len(), 2);
        assert_eq!(projection.by_progress[0].name, "b");
        assert_eq!(projection.filter_tags, vec!["alice", "bob"]);
        assert_eq!(projection.generated_at, t0() + chrono::Duration::seconds(3));
        assert_eq!(state.projection(), projection);
    }

    #[test]
    fn test_evict_stale_uses_state_clock() {
        let clock = Arc::new(ManualClock::new(t0()));
        let state = test_state(clock.clone());
        upsert(&state, "old", 1.0, "alice");
        clock.advance(chrono::Duration::minutes(30));
        upsert(&state, "new", 1.0, "alice");

        clock.advance(chrono::Duration::minutes(31));
        assert_eq!(evict_stale(&state, Duration::from_secs(3600)), 1);
        assert!(state.store.get("old").is_none());
        assert!(state.store.get("new").is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_runs_at_start_and_every_period() {
        let clock = Arc::new(ManualClock::new(t0()));
        let state = test_state(clock.clone());
        upsert(&state, "first", 1.0, "alice");

        let cancel = CancellationToken::new();
        let handle = start(Arc::clone(&state), settings(), cancel.clone());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(state.projection().len(), 1);

        upsert(&state, "second", 1.0, "bob");
        assert_eq!(state.projection().len(), 1, "readers see the last publish only");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(state.projection().len(), 2);

        cancel.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_runs_every_period() {
        let clock = Arc::new(ManualClock::new(t0()));
        let state = test_state(clock.clone());
        upsert(&state, "stale", 1.0, "alice");
        clock.advance(chrono::Duration::hours(2));
        upsert(&state, "fresh", 1.0, "alice");

        let cancel = CancellationToken::new();
        let handle = start(Arc::clone(&state), settings(), cancel.clone());

        // Eviction waits one full period before its first run.
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(state.store.len(), 2);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(state.store.len(), 1);
        assert!(state.store.get("fresh").is_some());

        // The next refresh drops it from the published view too.
        tokio::time::sleep(Duration::from_secs(1)).await;
        let projection = state.projection();
        assert_eq!(projection.len(), 1);
        assert!(projection.find("stale").is_none());

        cancel.cancel();
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_both_tasks() {
        let clock = Arc::new(ManualClock::new(t0()));
        let state = test_state(clock.clone());

        let cancel = CancellationToken::new();
        let handle = start(Arc::clone(&state), settings(), cancel.clone());
        tokio::time::sleep(Duration::from_millis(10)).await;

        cancel.cancel();
        handle.join().await;

        // Nothing publishes or evicts any more.
        upsert(&state, "late", 1.0, "alice");
        clock.advance(chrono::Duration::hours(5));
        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(state.projection().is_empty());
        assert_eq!(state.store.len(), 1);
    }
}
