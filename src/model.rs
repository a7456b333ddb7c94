//! Immutable domain records shared by every scheduling component.
//!
//! Nothing in this module mutates in place: a changed task, occurrence, or
//! execution is a new value, never a field write on an old one.

use chrono::{NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Relative importance of a task, used to break same-day slot ties.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    /// Lower rank schedules earlier when two candidates tie on the same day.
    #[must_use]
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// Bounds how many times a missed occurrence may be rescheduled.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct RetryPolicy {
    pub max_retries: u32,
}

/// A user-authored task template. Never mutated after creation; edits are
/// expressed by deleting and re-inserting under the same id.
#[derive(Serialize, Deserialize, Clone, PartialEq, Debug)]
pub struct TaskDefinition {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub created_at: NaiveDateTime,
    /// A positive recurrence interval. Absence means the task is one-shot.
    #[serde(with = "duration_secs_opt")]
    pub recurrence: Option<Duration>,
    pub priority: Priority,
    pub preferred_slots: Vec<String>,
    pub retry_policy: RetryPolicy,
    /// An explicit "next planned" hint that, when valid, takes priority over
    /// slot-pool recurrence search (see `task_scheduler::get_next_occurrence`).
    pub pinned_time: Option<NaiveDateTime>,
}

/// A concrete scheduled firing of a task.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct TaskOccurrence {
    pub id: String,
    pub task_id: String,
    pub scheduled_for: NaiveDateTime,
    pub slot_name: Option<String>,
    pub pinned_time: Option<NaiveDateTime>,
}

impl TaskOccurrence {
    /// Build an occurrence that occupies a named recurring slot.
    #[must_use]
    pub fn new_slotted(
        id: String,
        task_id: String,
        scheduled_for: NaiveDateTime,
        slot_name: Option<String>,
    ) -> Self {
        Self {
            id,
            task_id,
            scheduled_for,
            slot_name,
            pinned_time: None,
        }
    }

    /// Build an occurrence that represents an explicit, user-pinned time.
    /// `scheduled_for` is always set equal to `pinned_time`; see the
    /// domain model invariant in `SPEC_FULL.md` section 3.
    #[must_use]
    pub fn new_pinned(id: String, task_id: String, pinned_time: NaiveDateTime) -> Self {
        Self {
            id,
            task_id,
            scheduled_for: pinned_time,
            slot_name: None,
            pinned_time: Some(pinned_time),
        }
    }
}

/// The lifecycle state of a single execution record.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum ExecutionState {
    Pending,
    Done,
    Missed,
    Cancelled,
}

/// A single append-only lifecycle event on an execution's history.
#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub enum EventKind {
    Triggered,
    Missed,
    Rescheduled,
    Completed,
}

#[derive(Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Debug)]
pub struct TaskEvent {
    pub event: EventKind,
    pub timestamp: NaiveDateTime,
}

/// The runtime record of firing (or attempting to fire) one occurrence.
/// A new execution is written on every trigger; nothing here is ever
/// mutated in place once persisted.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct TaskExecution {
    pub id: String,
    pub occurrence_id: String,
    pub state: ExecutionState,
    pub retries_remaining: u32,
    pub history: Vec<TaskEvent>,
}

impl TaskExecution {
    #[must_use]
    pub fn is_reschedulable(&self) -> bool {
        self.retries_remaining > 0
            && self.state != ExecutionState::Done
            && self.state != ExecutionState::Cancelled
    }

    #[must_use]
    pub fn retry_count(&self, initial_max: u32) -> u32 {
        initial_max.saturating_sub(self.retries_remaining)
    }

    #[must_use]
    pub fn last_event_time(&self) -> Option<NaiveDateTime> {
        self.history.iter().map(|e| e.timestamp).max()
    }
}

/// A named recurring daily time window, e.g. "morning" from 09:00 to 12:00.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct TimeSlot {
    pub name: String,
    pub start: chrono::NaiveTime,
    pub end: chrono::NaiveTime,
}

/// The per-weekday envelope within which scheduling is permitted.
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq, Debug)]
pub struct WorkingHours {
    #[serde(with = "weekday_ord")]
    pub day: Weekday,
    pub start: chrono::NaiveTime,
    pub end: chrono::NaiveTime,
    pub allowed_slots: Vec<String>,
}

/// `chrono::Weekday` has no `Serialize`/`Deserialize` impl of its own;
/// round-trip it through its Monday-based ordinal instead.
mod weekday_ord {
    use chrono::Weekday;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(day: &Weekday, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(day.num_days_from_monday() as u8)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Weekday, D::Error> {
        let ord = u8::deserialize(d)?;
        Weekday::try_from(ord).map_err(serde::de::Error::custom)
    }
}

/// Serializes an `Option<Duration>` as an optional integer-seconds count.
mod duration_secs_opt {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match d {
            Some(d) => s.serialize_some(&d.as_secs()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        let secs: Option<u64> = Option::deserialize(d)?;
        Ok(secs.map(Duration::from_secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_occurrence_upholds_the_scheduled_for_invariant() {
        let pinned = chrono::NaiveDate::from_ymd_opt(2025, 1, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let occ = TaskOccurrence::new_pinned("o1".into(), "t1".into(), pinned);
        assert_eq!(occ.scheduled_for, pinned);
        assert_eq!(occ.pinned_time, Some(pinned));
    }

    #[test]
    fn execution_derived_fields() {
        let t1 = chrono::NaiveDate::from_ymd_opt(2025, 1, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let t2 = t1 + chrono::Duration::seconds(5);
        let exec = TaskExecution {
            id: "e1".into(),
            occurrence_id: "o1".into(),
            state: ExecutionState::Pending,
            retries_remaining: 2,
            history: vec![
                TaskEvent {
                    event: EventKind::Triggered,
                    timestamp: t1,
                },
                TaskEvent {
                    event: EventKind::Rescheduled,
                    timestamp: t2,
                },
            ],
        };
        assert!(exec.is_reschedulable());
        assert_eq!(exec.retry_count(3), 1);
        assert_eq!(exec.last_event_time(), Some(t2));
    }

    #[test]
    fn done_execution_is_never_reschedulable() {
        let exec = TaskExecution {
            id: "e1".into(),
            occurrence_id: "o1".into(),
            state: ExecutionState::Done,
            retries_remaining: 5,
            history: vec![],
        };
        assert!(!exec.is_reschedulable());
        assert_eq!(exec.last_event_time(), None);
    }

    #[test]
    fn task_round_trips_through_json() {
        let task = TaskDefinition {
            id: "t1".into(),
            title: "Water the plants".into(),
            description: None,
            link: None,
            created_at: chrono::NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            recurrence: Some(Duration::from_secs(86_400)),
            priority: Priority::Medium,
            preferred_slots: vec!["morning".into()],
            retry_policy: RetryPolicy { max_retries: 2 },
            pinned_time: None,
        };
        let encoded = serde_json::to_string(&task).expect("serialize");
        let decoded: TaskDefinition = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(task, decoded);
    }

    #[test]
    fn working_hours_round_trip_through_json() {
        let wh = WorkingHours {
            day: Weekday::Wed,
            start: chrono::NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            end: chrono::NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            allowed_slots: vec!["morning".into(), "afternoon".into()],
        };
        let encoded = serde_json::to_string(&wh).expect("serialize");
        let decoded: WorkingHours = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(wh, decoded);
    }

    #[test]
    fn slotted_occurrence_round_trips_through_json() {
        let occ = TaskOccurrence::new_slotted(
            "o1".into(),
            "t1".into(),
            chrono::NaiveDate::from_ymd_opt(2025, 1, 13)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            Some("morning".into()),
        );
        let encoded = serde_json::to_string(&occ).expect("serialize");
        let decoded: TaskOccurrence = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(occ, decoded);
    }

    #[test]
    fn pinned_occurrence_round_trips_through_json() {
        let occ = TaskOccurrence::new_pinned(
            "o2".into(),
            "t1".into(),
            chrono::NaiveDate::from_ymd_opt(2025, 1, 13)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
        );
        let encoded = serde_json::to_string(&occ).expect("serialize");
        let decoded: TaskOccurrence = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(occ, decoded);
    }

    #[test]
    fn execution_round_trips_through_json() {
        let exec = TaskExecution {
            id: "e1".into(),
            occurrence_id: "o1".into(),
            state: ExecutionState::Pending,
            retries_remaining: 2,
            history: vec![
                TaskEvent {
                    event: EventKind::Triggered,
                    timestamp: chrono::NaiveDate::from_ymd_opt(2025, 1, 13)
                        .unwrap()
                        .and_hms_opt(9, 0, 0)
                        .unwrap(),
                },
                TaskEvent {
                    event: EventKind::Rescheduled,
                    timestamp: chrono::NaiveDate::from_ymd_opt(2025, 1, 13)
                        .unwrap()
                        .and_hms_opt(9, 0, 5)
                        .unwrap(),
                },
            ],
        };
        let encoded = serde_json::to_string(&exec).expect("serialize");
        let decoded: TaskExecution = serde_json::from_str(&encoded).expect("deserialize");
        assert_eq!(exec, decoded);
    }
}
