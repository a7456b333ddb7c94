//! The Controller: a flat command surface over the Smart Scheduler.
//!
//! Performs validation only — it is the single layer in the core that
//! raises an error, and only for commands that reference an id with no
//! matching record (`SPEC_FULL.md` section 7).

use crate::error::ControllerError;
use crate::model::{TaskDefinition, TaskOccurrence};
use crate::notifier::Notifier;
use crate::repository::Repository;
use crate::smart_scheduler::SmartScheduler;
use std::sync::Arc;

/// Wraps a [`SmartScheduler`] and its [`Repository`] behind the command
/// surface listed in `SPEC_FULL.md` section 6.
pub struct Controller<R: Repository, N: Notifier> {
    repo: Arc<R>,
    scheduler: Arc<SmartScheduler<R, N>>,
}

impl<R: Repository + 'static, N: Notifier + 'static> Controller<R, N> {
    #[must_use]
    pub fn new(repo: Arc<R>, scheduler: Arc<SmartScheduler<R, N>>) -> Self {
        Self { repo, scheduler }
    }

    /// Resume and schedule everything; run recovery.
    pub fn start(&self) {
        self.scheduler.start();
    }

    /// Cancel all timers; freeze scheduling.
    pub fn pause(&self) {
        self.scheduler.pause();
    }

    /// Equivalent to `start`.
    pub fn resume(&self) {
        self.start();
    }

    /// Treat an occurrence as completed now; trigger retry/recurrence chain.
    ///
    /// # Errors
    /// `ControllerError::UnknownOccurrence` if `occurrence_id` has no record.
    pub fn mark_done(&self, occurrence_id: &str) -> Result<(), ControllerError> {
        let occ = self
            .repo
            .get_occurrence(occurrence_id)
            .ok_or_else(|| ControllerError::UnknownOccurrence(occurrence_id.to_string()))?;
        self.scheduler.mark_done(&occ);
        Ok(())
    }

    /// Force a retry attempt. Returns `None` if retries are exhausted or no
    /// slot is found within the 14-day search window.
    ///
    /// # Errors
    /// `ControllerError::UnknownOccurrence` if `occurrence_id` has no record.
    pub fn retry_occurrence(
        &self,
        occurrence_id: &str,
    ) -> Result<Option<TaskOccurrence>, ControllerError> {
        let occ = self
            .repo
            .get_occurrence(occurrence_id)
            .ok_or_else(|| ControllerError::UnknownOccurrence(occurrence_id.to_string()))?;
        Ok(self.scheduler.retry_occurrence(&occ))
    }

    /// A snapshot of currently armed occurrences.
    #[must_use]
    pub fn get_scheduled_occurrences(&self) -> Vec<TaskOccurrence> {
        self.scheduler.scheduled_occurrences()
    }

    /// Run the recovery sweep on demand.
    pub fn recover_missed_tasks(&self) {
        self.scheduler.run_recovery_sweep();
    }

    /// Register a new task definition (or overwrite by id), then plan and
    /// arm its first occurrence.
    pub fn add_task(&self, task: TaskDefinition) {
        self.repo.add_task(task.clone());
        self.scheduler.plan_initial_occurrence(&task);
    }

    /// Look up a task definition.
    #[must_use]
    pub fn get_task(&self, task_id: &str) -> Option<TaskDefinition> {
        self.repo.get_task(task_id)
    }

    /// All known task definitions.
    #[must_use]
    pub fn list_tasks(&self) -> Vec<TaskDefinition> {
        self.repo.list_tasks()
    }

    /// All known occurrences, scheduled or not.
    #[must_use]
    pub fn list_occurrences(&self) -> Vec<TaskOccurrence> {
        self.repo.list_occurrences()
    }

    /// Delete a task and cascade-delete its occurrences and executions.
    ///
    /// # Errors
    /// `ControllerError::UnknownTask` if `task_id` has no record.
    pub fn remove_task(&self, task_id: &str) -> Result<(), ControllerError> {
        self.repo
            .get_task(task_id)
            .ok_or_else(|| ControllerError::UnknownTask(task_id.to_string()))?;
        self.repo.delete_task_and_related(task_id);
        Ok(())
    }
}
