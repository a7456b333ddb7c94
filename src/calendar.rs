//! The Calendar Planner: a pure availability oracle.
//!
//! Every function here takes its inputs by reference and returns an answer;
//! none of them touch the clock, the repository, or any other component.

use crate::model::{Priority, TaskOccurrence, TimeSlot, WorkingHours};
use chrono::{Datelike, Duration, NaiveDateTime};

/// Hard upper bound on how far into the future recurrence/retry search may
/// look before admitting "no slot available".
pub const SEARCH_WINDOW_DAYS: i64 = 14;

/// A slot-pool candidate chosen by [`next_available_slot`], carrying the
/// slot's name along with its start time so callers don't have to
/// re-derive which slot was picked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlotCandidate {
    pub when: NaiveDateTime,
    pub slot_name: String,
}

fn working_hours_for(day: chrono::Weekday, working_hours: &[WorkingHours]) -> Option<&WorkingHours> {
    working_hours.iter().find(|wh| wh.day == day)
}

fn occurrences_on(
    date: chrono::NaiveDate,
    scheduled: &[TaskOccurrence],
) -> impl Iterator<Item = &TaskOccurrence> {
    scheduled
        .iter()
        .filter(move |occ| occ.scheduled_for.date() == date)
}

/// True iff `proposed_time` may host a new occurrence given the existing
/// `scheduled_occurrences`, the weekday's `working_hours`, and the per-day
/// cap. When `slot_pool` is provided, the time must also fall inside one of
/// the day's allowed slots.
#[must_use]
pub fn is_slot_available(
    proposed_time: NaiveDateTime,
    scheduled_occurrences: &[TaskOccurrence],
    working_hours: &[WorkingHours],
    max_per_day: u32,
    slot_pool: Option<&[TimeSlot]>,
) -> bool {
    let Some(hours) = working_hours_for(proposed_time.weekday(), working_hours) else {
        return false;
    };
    if hours.start >= hours.end {
        return false;
    }
    let time_of_day = proposed_time.time();
    if time_of_day < hours.start || time_of_day >= hours.end {
        return false;
    }

    let date = proposed_time.date();
    let day_count = occurrences_on(date, scheduled_occurrences).count() as u32;
    if day_count >= max_per_day {
        return false;
    }

    if occurrences_on(date, scheduled_occurrences).any(|occ| occ.scheduled_for == proposed_time) {
        return false;
    }

    if let Some(pool) = slot_pool {
        let in_allowed_slot = pool.iter().any(|slot| {
            hours.allowed_slots.iter().any(|name| name == &slot.name)
                && time_of_day >= slot.start
                && time_of_day < slot.end
        });
        if !in_allowed_slot {
            return false;
        }
    }

    true
}

/// Same as [`is_slot_available`] without the slot-pool constraint: pinned
/// times bypass slot preferences but must still land inside working hours,
/// respect the per-day cap, and not collide with an existing occurrence.
#[must_use]
pub fn is_pinned_time_valid(
    pinned_time: NaiveDateTime,
    scheduled_occurrences: &[TaskOccurrence],
    working_hours: &[WorkingHours],
    max_per_day: u32,
) -> bool {
    is_slot_available(pinned_time, scheduled_occurrences, working_hours, max_per_day, None)
}

/// Enumerate a day's slot-start candidates, restricted to slots the day's
/// working hours allow, ordered by start time ascending.
///
/// `priority` is accepted but currently unused: a single call only ever
/// ranks one task's own candidates against each other, and there is no
/// second task's priority in scope to break a tie against. The parameter
/// stays part of the signature for the day a caller batches multiple
/// tasks' searches over the same day and can supply that second priority.
fn candidates_for_day(
    date: chrono::NaiveDate,
    slot_pool: &[TimeSlot],
    working_hours: &[WorkingHours],
    _priority: Option<Priority>,
) -> Vec<NaiveDateTime> {
    let Some(hours) = working_hours_for(date.weekday(), working_hours) else {
        return Vec::new();
    };
    let mut candidates: Vec<_> = slot_pool
        .iter()
        .filter(|slot| hours.allowed_slots.iter().any(|name| name == &slot.name))
        .map(|slot| date.and_time(slot.start))
        .collect();
    candidates.sort();
    candidates
}

/// Search forward from `after`, up to [`SEARCH_WINDOW_DAYS`] days, for the
/// first slot-pool candidate that is strictly later than `after` and passes
/// [`is_slot_available`]. Returns `None` if the window is exhausted.
///
/// `priority` is threaded through to [`candidates_for_day`] but has no
/// effect on the result today; see that function's doc comment.
#[must_use]
pub fn next_available_slot(
    after: NaiveDateTime,
    slot_pool: &[TimeSlot],
    scheduled_occurrences: &[TaskOccurrence],
    working_hours: &[WorkingHours],
    max_per_day: u32,
    priority: Option<Priority>,
) -> Option<SlotCandidate> {
    let start_date = after.date();
    for offset in 0..SEARCH_WINDOW_DAYS {
        let date = start_date + Duration::days(offset);
        for candidate in candidates_for_day(date, slot_pool, working_hours, priority) {
            if candidate <= after {
                continue;
            }
            if is_slot_available(
                candidate,
                scheduled_occurrences,
                working_hours,
                max_per_day,
                Some(slot_pool),
            ) {
                let slot_name = slot_pool
                    .iter()
                    .find(|slot| slot.start == candidate.time())
                    .map(|slot| slot.name.clone())
                    .unwrap_or_default();
                return Some(SlotCandidate {
                    when: candidate,
                    slot_name,
                });
            }
        }
    }
    None
}
