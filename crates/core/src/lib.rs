// crates/core/src/lib.rs
//! Progress tracking core: records, ETA estimation, the shared store and
//! the sorted/filtered projections built from it.

pub mod clock;
pub mod error;
pub mod estimator;
pub mod humanize;
pub mod projection;
pub mod record;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::*;
pub use estimator::estimate;
pub use humanize::format_duration_short;
pub use projection::{Projection, SortOrder};
pub use record::{OvershootPolicy, ProgressDisplay, ProgressRecord, ProgressSample};
pub use store::ProgressStore;
