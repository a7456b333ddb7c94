//! Construction-time configuration for the Smart Scheduler.
//!
//! Everything here is supplied once, at startup, and treated as immutable
//! for the lifetime of the scheduler (see `SPEC_FULL.md` section 6).

use crate::model::{TimeSlot, WorkingHours};
use std::time::Duration;

/// The grace window between "fire immediately" and "delegate to recovery".
pub const DEFAULT_GRACE_SECONDS: u64 = 30;

/// Working hours, the slot pool, and the per-day cap the Calendar Planner
/// and Task Scheduler consult on every decision, plus the recovery grace
/// window the Smart Scheduler uses to distinguish an immediate fire from a
/// catch-up.
#[derive(Clone, Debug, PartialEq)]
pub struct SchedulerConfig {
    pub working_hours: Vec<WorkingHours>,
    pub slot_pool: Vec<TimeSlot>,
    pub max_per_day: u32,
    pub grace: Duration,
}

impl SchedulerConfig {
    /// Build a config with the default 30-second recovery grace.
    #[must_use]
    pub fn new(working_hours: Vec<WorkingHours>, slot_pool: Vec<TimeSlot>, max_per_day: u32) -> Self {
        Self {
            working_hours,
            slot_pool,
            max_per_day,
            grace: Duration::from_secs(DEFAULT_GRACE_SECONDS),
        }
    }

    /// Override the recovery grace window. Tunable but fixed for a given
    /// deployment.
    #[must_use]
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }
}
