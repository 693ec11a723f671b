// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use headway_core::{Clock, OvershootPolicy, Projection, ProgressStore, SystemClock};
use tokio::sync::watch;

use crate::notify::{LogNotifier, Notifier};
use crate::secrets::SecretRegistry;

/// Shared application state accessible from all route handlers and the
/// maintenance tasks.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Live progress records. Written by ingest and eviction only.
    pub store: Arc<ProgressStore>,
    /// Source of timestamps for estimation, eviction and projections.
    pub clock: Arc<dyn Clock>,
    /// Secrets allowed to push updates, mapped to their owner tag.
    pub secrets: SecretRegistry,
    /// Where "message" updates go.
    pub notifier: Arc<dyn Notifier>,
    /// Handling of samples with `current > total`.
    pub overshoot: OvershootPolicy,
    /// Latest published projection. The refresh task is the only sender;
    /// readers only ever `borrow()`.
    projection_tx: watch::Sender<Arc<Projection>>,
}

impl AppState {
    /// Create a state with the wall clock, a logging notifier and the
    /// default overshoot policy.
    pub fn new(secrets: SecretRegistry) -> Arc<Self> {
        Self::with_parts(
            secrets,
            Arc::new(SystemClock),
            Arc::new(LogNotifier),
            OvershootPolicy::default(),
        )
    }

    /// Create with explicit collaborators (for testing and for `main`).
    pub fn with_parts(
        secrets: SecretRegistry,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        overshoot: OvershootPolicy,
    ) -> Arc<Self> {
        let (projection_tx, _) = watch::channel(Arc::new(Projection::empty(clock.now())));
        Arc::new(Self {
            start_time: Instant::now(),
            store: Arc::new(ProgressStore::new()),
            clock,
            secrets,
            notifier,
            overshoot,
            projection_tx,
        })
    }

    /// The most recently published projection.
    pub fn projection(&self) -> Arc<Projection> {
        self.projection_tx.borrow().clone()
    }

    /// Replace the published projection in one step.
    pub(crate) fn publish(&self, projection: Projection) {
        self.projection_tx.send_replace(Arc::new(projection));
    }

    /// Watch for newly published projections.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Projection>> {
        self.projection_tx.subscribe()
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
