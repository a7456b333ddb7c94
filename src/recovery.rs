//! The Recovery Service: computes catch-up occurrences for tasks missed
//! while the host process was not running (or was paused).

use crate::model::{ExecutionState, TaskDefinition, TaskExecution, TaskOccurrence, TimeSlot, WorkingHours};
use crate::task_scheduler;
use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Compute catch-up occurrences for every missed, non-pinned occurrence in
/// `occurrences_by_id`. At most one follow-up occurrence is produced per
/// missed occurrence: a retry if one is available, otherwise the task's
/// next recurrence, otherwise nothing.
///
/// Deterministic regardless of the backing map's iteration order: input
/// occurrences are sorted by `(scheduled_for, id)` before processing.
#[must_use]
pub fn recover_missed_occurrences(
    executions: &[TaskExecution],
    occurrences_by_id: &HashMap<String, TaskOccurrence>,
    tasks_by_id: &HashMap<String, TaskDefinition>,
    now: NaiveDateTime,
    scheduled_occurrences: &[TaskOccurrence],
    working_hours: &[WorkingHours],
    slot_pool: &[TimeSlot],
    max_per_day: u32,
) -> Vec<TaskOccurrence> {
    let mut ordered: Vec<&TaskOccurrence> = occurrences_by_id.values().collect();
    ordered.sort_by(|a, b| a.scheduled_for.cmp(&b.scheduled_for).then_with(|| a.id.cmp(&b.id)));

    let mut produced = Vec::new();

    for occ in ordered {
        if occ.pinned_time.is_some() {
            continue;
        }
        if !task_scheduler::is_missed(occ, now, executions) {
            continue;
        }
        let Some(task) = tasks_by_id.get(&occ.task_id) else {
            continue;
        };

        let current_execution = executions
            .iter()
            .filter(|e| e.occurrence_id == occ.id)
            .max_by_key(|e| e.last_event_time())
            .cloned()
            .unwrap_or(TaskExecution {
                id: String::new(),
                occurrence_id: occ.id.clone(),
                state: ExecutionState::Pending,
                retries_remaining: task.retry_policy.max_retries,
                history: vec![],
            });

        if task_scheduler::should_retry(&current_execution) {
            if let Some(retried) = task_scheduler::reschedule_retry(
                occ,
                current_execution.retries_remaining,
                now,
                scheduled_occurrences,
                working_hours,
                slot_pool,
                max_per_day,
            ) {
                produced.push(retried);
                continue;
            }
        }

        if task.recurrence.is_some() {
            if let Some(next) = task_scheduler::get_next_occurrence(
                task,
                now,
                scheduled_occurrences,
                working_hours,
                slot_pool,
                max_per_day,
            ) {
                produced.push(next);
            }
        }
    }

    produced
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Priority, RetryPolicy, TaskDefinition};
    use chrono::{NaiveDate, NaiveTime, Weekday};

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, 0)
            .unwrap()
    }

    fn business_hours() -> Vec<WorkingHours> {
        [Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu, Weekday::Fri]
            .into_iter()
            .map(|day| WorkingHours {
                day,
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
                allowed_slots: vec!["morning".into(), "evening".into()],
            })
            .collect()
    }

    fn slot_pool() -> Vec<TimeSlot> {
        vec![
            TimeSlot {
                name: "morning".into(),
                start: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            },
            TimeSlot {
                name: "evening".into(),
                start: NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
                end: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            },
        ]
    }

    fn task_with_retry(max_retries: u32, recurrence: Option<std::time::Duration>) -> TaskDefinition {
        TaskDefinition {
            id: "t1".into(),
            title: "Water the plants".into(),
            description: None,
            link: None,
            created_at: dt(2025, 1, 1, 0, 0),
            recurrence,
            priority: Priority::Medium,
            preferred_slots: vec!["morning".into()],
            retry_policy: RetryPolicy { max_retries },
            pinned_time: None,
        }
    }

    #[test]
    fn missed_beyond_grace_produces_one_retry_occurrence() {
        let now = dt(2025, 1, 13, 10, 0);
        let occ = TaskOccurrence::new_slotted(
            "o4".into(),
            "t1".into(),
            dt(2025, 1, 13, 9, 0),
            Some("morning".into()),
        );
        let mut occurrences_by_id = HashMap::new();
        occurrences_by_id.insert(occ.id.clone(), occ.clone());
        let mut tasks_by_id = HashMap::new();
        tasks_by_id.insert("t1".into(), task_with_retry(1, None));

        let produced = recover_missed_occurrences(
            &[],
            &occurrences_by_id,
            &tasks_by_id,
            now,
            &[occ],
            &business_hours(),
            &slot_pool(),
            5,
        );

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].task_id, "t1");
        assert_eq!(produced[0].scheduled_for, dt(2025, 1, 13, 20, 0));
    }

    #[test]
    fn pinned_occurrences_are_never_recovered() {
        let now = dt(2025, 1, 14, 9, 0);
        let occ = TaskOccurrence::new_pinned("o5".into(), "t1".into(), dt(2025, 1, 13, 9, 0));
        let mut occurrences_by_id = HashMap::new();
        occurrences_by_id.insert(occ.id.clone(), occ.clone());
        let mut tasks_by_id = HashMap::new();
        tasks_by_id.insert("t1".into(), task_with_retry(3, None));

        let produced = recover_missed_occurrences(
            &[],
            &occurrences_by_id,
            &tasks_by_id,
            now,
            &[occ],
            &business_hours(),
            &slot_pool(),
            5,
        );

        assert!(produced.is_empty());
    }

    #[test]
    fn exhausted_retries_fall_through_to_recurrence() {
        let now = dt(2025, 1, 13, 10, 0);
        let occ = TaskOccurrence::new_slotted(
            "o1".into(),
            "t1".into(),
            dt(2025, 1, 13, 9, 0),
            Some("morning".into()),
        );
        let exec = TaskExecution {
            id: "e1".into(),
            occurrence_id: "o1".into(),
            state: ExecutionState::Pending,
            retries_remaining: 0,
            history: vec![],
        };
        let mut occurrences_by_id = HashMap::new();
        occurrences_by_id.insert(occ.id.clone(), occ.clone());
        let mut tasks_by_id = HashMap::new();
        tasks_by_id.insert(
            "t1".into(),
            task_with_retry(1, Some(std::time::Duration::from_secs(86_400))),
        );

        let produced = recover_missed_occurrences(
            &[exec],
            &occurrences_by_id,
            &tasks_by_id,
            now,
            &[occ],
            &business_hours(),
            &slot_pool(),
            5,
        );

        assert_eq!(produced.len(), 1);
        assert_eq!(produced[0].scheduled_for.date(), dt(2025, 1, 14, 0, 0).date());
    }

    #[test]
    fn done_occurrences_are_skipped() {
        let now = dt(2025, 1, 13, 10, 0);
        let occ = TaskOccurrence::new_slotted(
            "o1".into(),
            "t1".into(),
            dt(2025, 1, 13, 9, 0),
            Some("morning".into()),
        );
        let exec = TaskExecution {
            id: "e1".into(),
            occurrence_id: "o1".into(),
            state: ExecutionState::Done,
            retries_remaining: 0,
            history: vec![],
        };
        let mut occurrences_by_id = HashMap::new();
        occurrences_by_id.insert(occ.id.clone(), occ.clone());
        let mut tasks_by_id = HashMap::new();
        tasks_by_id.insert("t1".into(), task_with_retry(1, None));

        let produced = recover_missed_occurrences(
            &[exec],
            &occurrences_by_id,
            &tasks_by_id,
            now,
            &[occ],
            &business_hours(),
            &slot_pool(),
            5,
        );

        assert!(produced.is_empty());
    }

    #[test]
    fn dangling_task_reference_is_skipped() {
        let now = dt(2025, 1, 13, 10, 0);
        let occ = TaskOccurrence::new_slotted(
            "o1".into(),
            "ghost-task".into(),
            dt(2025, 1, 13, 9, 0),
            Some("morning".into()),
        );
        let mut occurrences_by_id = HashMap::new();
        occurrences_by_id.insert(occ.id.clone(), occ.clone());
        let tasks_by_id = HashMap::new();

        let produced = recover_missed_occurrences(
            &[],
            &occurrences_by_id,
            &tasks_by_id,
            now,
            &[occ],
            &business_hours(),
            &slot_pool(),
            5,
        );

        assert!(produced.is_empty());
    }
}
