//! Error types raised at the Controller boundary.
//!
//! The pure components (Calendar Planner, Task Scheduler, Recovery Service)
//! and the Smart Scheduler never raise: "impossible to schedule" is always
//! `None` or an empty `Vec`. The Controller is the only layer that surfaces
//! an error, and only for commands that reference an id with no matching
//! record.

use thiserror::Error;

/// Errors the Controller surfaces to its caller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// `mark_done`/`retry_occurrence` were given an id with no occurrence.
    #[error("unknown occurrence: {0}")]
    UnknownOccurrence(String),
    /// A task-scoped command was given an id with no task definition.
    #[error("unknown task: {0}")]
    UnknownTask(String),
}
