//! Discrete-event scheduling
//!
//! - `types`: the `ScheduledEvent` record and its ordering
//! - `scheduler`: the min-heap that hands events out in time order

pub mod scheduler;
pub mod types;

pub use scheduler::{EventScheduler, SchedulerError, SchedulerSummary};
pub use types::{EventKind, ScheduledEvent};
