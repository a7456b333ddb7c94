//! The Task Scheduler: pure due/retry/recurrence decisions.
//!
//! Nothing here mutates an existing record; every operation that produces a
//! follow-up occurrence returns a brand new one with a fresh id.

use crate::calendar;
use crate::model::{ExecutionState, TaskDefinition, TaskExecution, TaskOccurrence, TimeSlot, WorkingHours};
use chrono::{Duration, NaiveDateTime};
use uuid::Uuid;

/// `occ.scheduled_for <= now`.
#[must_use]
pub fn is_due(occ: &TaskOccurrence, now: NaiveDateTime) -> bool {
    occ.scheduled_for <= now
}

/// `occ.scheduled_for < now` and no execution with state `done` exists for it.
#[must_use]
pub fn is_missed(occ: &TaskOccurrence, now: NaiveDateTime, executions: &[TaskExecution]) -> bool {
    occ.scheduled_for < now
        && !executions
            .iter()
            .any(|e| e.occurrence_id == occ.id && e.state == ExecutionState::Done)
}

/// `execution.retries_remaining > 0`.
#[must_use]
pub fn should_retry(execution: &TaskExecution) -> bool {
    execution.retries_remaining > 0
}

/// Compute the next occurrence for `task`, honoring a pinned-time hint first
/// and otherwise searching the calendar for the next slot after
/// `from_time + task.recurrence`. Returns `None` if the task is one-shot or
/// no slot turns up within the 14-day search window.
#[must_use]
pub fn get_next_occurrence(
    task: &TaskDefinition,
    from_time: NaiveDateTime,
    scheduled_occurrences: &[TaskOccurrence],
    working_hours: &[WorkingHours],
    slot_pool: &[TimeSlot],
    max_per_day: u32,
) -> Option<TaskOccurrence> {
    if let Some(pinned) = task.pinned_time {
        if calendar::is_pinned_time_valid(pinned, scheduled_occurrences, working_hours, max_per_day) {
            return Some(TaskOccurrence::new_pinned(
                Uuid::new_v4().to_string(),
                task.id.clone(),
                pinned,
            ));
        }
    }

    let recurrence = task.recurrence?;
    let target = from_time + Duration::from_std(recurrence).ok()?;
    let after = (target - Duration::seconds(1)).max(from_time);

    let candidate = calendar::next_available_slot(
        after,
        slot_pool,
        scheduled_occurrences,
        working_hours,
        max_per_day,
        Some(task.priority),
    )?;

    Some(TaskOccurrence::new_slotted(
        Uuid::new_v4().to_string(),
        task.id.clone(),
        candidate.when,
        Some(candidate.slot_name),
    ))
}

/// Find the next valid slot for a retry of `occurrence`, given the number of
/// retries still available. Returns `None` once retries are exhausted or no
/// slot is found in the 14-day window. Never mutates `occurrence`; the
/// caller is responsible for tracking `retries_remaining` in the execution
/// record.
#[must_use]
pub fn reschedule_retry(
    occurrence: &TaskOccurrence,
    retries_remaining: u32,
    now: NaiveDateTime,
    scheduled_occurrences: &[TaskOccurrence],
    working_hours: &[WorkingHours],
    slot_pool: &[TimeSlot],
    max_per_day: u32,
) -> Option<TaskOccurrence> {
    if retries_remaining == 0 {
        return None;
    }
    let candidate = calendar::next_available_slot(
        now,
        slot_pool,
        scheduled_occurrences,
        working_hours,
        max_per_day,
        None,
    )?;
    Some(TaskOccurrence::new_slotted(
        Uuid::new_v4().to_string(),
        occurrence.task_id.clone(),
        candidate.when,
        Some(candidate.slot_name),
    ))
}
