//! The Smart Scheduler: the sole stateful, clock-coupled component.
//!
//! It owns one armed [`Timer`] per not-yet-fired occurrence, tracks a
//! `paused` flag, and chains retries/recurrences after every trigger. All
//! mutations of its internal state happen under a re-entrant mutex, because
//! a timer callback re-enters the scheduler to run the trigger pipeline,
//! which itself calls back into `schedule_occurrence`.

use crate::calendar;
use crate::config::SchedulerConfig;
use crate::model::{ExecutionState, TaskDefinition, TaskEvent, TaskExecution, TaskOccurrence, EventKind};
use crate::notifier::Notifier;
use crate::recovery;
use crate::repository::Repository;
use crate::task_scheduler;
use crate::timer::Timer;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

struct SchedulerState {
    timers: HashMap<String, Timer>,
    paused: bool,
}

/// The real-time orchestrator. Always held behind an `Arc` because armed
/// timer callbacks need a handle back into the scheduler to run the trigger
/// pipeline on their own background thread.
pub struct SmartScheduler<R: Repository, N: Notifier> {
    repo: Arc<R>,
    notifier: Arc<N>,
    config: SchedulerConfig,
    now_fn: Box<dyn Fn() -> NaiveDateTime + Send + Sync>,
    state: ReentrantMutex<RefCell<SchedulerState>>,
}

impl<R: Repository + 'static, N: Notifier + 'static> SmartScheduler<R, N> {
    /// Build a scheduler. `now_fn` is the single seam that makes every
    /// time-dependent decision testable with a fixed clock.
    pub fn new(
        repo: Arc<R>,
        notifier: Arc<N>,
        config: SchedulerConfig,
        now_fn: impl Fn() -> NaiveDateTime + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            repo,
            notifier,
            config,
            now_fn: Box::new(now_fn),
            state: ReentrantMutex::new(RefCell::new(SchedulerState {
                timers: HashMap::new(),
                paused: false,
            })),
        })
    }

    fn now(&self) -> NaiveDateTime {
        (self.now_fn)()
    }

    fn is_paused(&self) -> bool {
        let guard = self.state.lock();
        guard.borrow().paused
    }

    fn executed_ids(&self) -> HashSet<String> {
        self.repo
            .list_executions()
            .into_iter()
            .filter(|e| e.state == ExecutionState::Done)
            .map(|e| e.occurrence_id)
            .collect()
    }

    fn cancel_timer(&self, occurrence_id: &str) {
        let guard = self.state.lock();
        if let Some(timer) = guard.borrow_mut().timers.remove(occurrence_id) {
            timer.cancel();
        }
    }

    /// Resume and schedule everything, then run the missed-task sweep.
    pub fn start(self: &Arc<Self>) {
        {
            let guard = self.state.lock();
            let mut state = guard.borrow_mut();
            state.paused = false;
            for (_, timer) in state.timers.drain() {
                timer.cancel();
            }
        }
        self.schedule_all();
        self.check_for_missed_tasks();
    }

    /// Cancel all armed timers; no further scheduling work is permitted
    /// until [`SmartScheduler::start`] is called again.
    pub fn pause(&self) {
        let guard = self.state.lock();
        let mut state = guard.borrow_mut();
        state.paused = true;
        for (_, timer) in state.timers.drain() {
            timer.cancel();
        }
    }

    /// Arm a timer for every not-yet-executed occurrence still in the
    /// future. A no-op while paused.
    pub fn schedule_all(self: &Arc<Self>) {
        if self.is_paused() {
            return;
        }
        let now = self.now();
        let executed = self.executed_ids();
        for occ in self.repo.list_occurrences() {
            if occ.scheduled_for > now && !executed.contains(&occ.id) {
                self.schedule_occurrence(&occ);
            }
        }
    }

    /// Arm (or immediately fire) a timer for a single occurrence.
    ///
    /// No-ops when: paused; the occurrence is already executed; its task is
    /// dangling; or the proposed time is no longer valid (`stale-occurrence`).
    pub fn schedule_occurrence(self: &Arc<Self>, occ: &TaskOccurrence) {
        if self.is_paused() {
            return;
        }
        if self.executed_ids().contains(&occ.id) {
            return;
        }
        let Some(_task) = self.repo.get_task(&occ.task_id) else {
            tracing::debug!(occurrence_id = %occ.id, task_id = %occ.task_id, "dangling task reference, ignoring occurrence");
            return;
        };

        let others: Vec<TaskOccurrence> = self
            .repo
            .list_occurrences()
            .into_iter()
            .filter(|o| o.id != occ.id)
            .collect();

        let valid = if occ.pinned_time.is_some() {
            calendar::is_pinned_time_valid(
                occ.scheduled_for,
                &others,
                &self.config.working_hours,
                self.config.max_per_day,
            )
        } else {
            calendar::is_slot_available(
                occ.scheduled_for,
                &others,
                &self.config.working_hours,
                self.config.max_per_day,
                Some(&self.config.slot_pool),
            )
        };
        if !valid {
            tracing::debug!(occurrence_id = %occ.id, "stale occurrence, not armed");
            return;
        }

        self.cancel_timer(&occ.id);

        let now = self.now();
        if task_scheduler::is_due(occ, now) {
            self.on_trigger(occ);
            return;
        }

        let delay = (occ.scheduled_for - now)
            .to_std()
            .unwrap_or(std::time::Duration::ZERO);
        let scheduler = Arc::clone(self);
        let occ_for_timer = occ.clone();
        let timer = Timer::arm(delay, move || {
            scheduler.fire_from_timer(&occ_for_timer);
        });

        let guard = self.state.lock();
        guard.borrow_mut().timers.insert(occ.id.clone(), timer);
    }

    /// Entry point for an armed timer's background thread. Re-enters the
    /// scheduler's lock to run the trigger pipeline.
    fn fire_from_timer(self: &Arc<Self>, occ: &TaskOccurrence) {
        if self.is_paused() {
            return;
        }
        if self.executed_ids().contains(&occ.id) {
            return;
        }
        self.on_trigger(occ);
    }

    /// Run the missed-task sweep: occurrences missed within the grace window
    /// fire immediately; anything missed beyond it is handed to recovery. A
    /// no-op while paused.
    pub fn check_for_missed_tasks(self: &Arc<Self>) {
        if self.is_paused() {
            return;
        }
        let now = self.now();
        let executions = self.repo.list_executions();
        let grace = ChronoDuration::from_std(self.config.grace).unwrap_or(ChronoDuration::zero());

        let mut needs_recovery = false;
        for occ in self.repo.list_occurrences() {
            if !task_scheduler::is_missed(&occ, now, &executions) {
                continue;
            }
            let delta = now - occ.scheduled_for;
            if delta <= grace {
                self.on_trigger(&occ);
            } else {
                needs_recovery = true;
            }
        }
        if needs_recovery {
            self.run_recovery_sweep();
        }
    }

    /// Force an occurrence to be treated as completed right now, and run the
    /// retry/recurrence chain. Used by the Controller's `mark_done` command.
    pub fn mark_done(self: &Arc<Self>, occ: &TaskOccurrence) {
        self.on_trigger(occ);
    }

    /// Force a retry attempt for `occ`, bypassing the trigger pipeline.
    /// Returns `None` if the occurrence is already executed, retries are
    /// exhausted, or no valid slot is found within the 14-day search window.
    /// Used by the Controller's `retry_occurrence` command.
    pub fn retry_occurrence(self: &Arc<Self>, occ: &TaskOccurrence) -> Option<TaskOccurrence> {
        if self.executed_ids().contains(&occ.id) {
            return None;
        }
        let task = self.repo.get_task(&occ.task_id)?;
        let now = self.now();
        let current_execution = self
            .repo
            .list_executions()
            .into_iter()
            .filter(|e| e.occurrence_id == occ.id)
            .max_by_key(|e| e.last_event_time())
            .unwrap_or(TaskExecution {
                id: String::new(),
                occurrence_id: occ.id.clone(),
                state: ExecutionState::Pending,
                retries_remaining: task.retry_policy.max_retries,
                history: vec![],
            });
        if !task_scheduler::should_retry(&current_execution) {
            return None;
        }
        let others: Vec<TaskOccurrence> = self
            .repo
            .list_occurrences()
            .into_iter()
            .filter(|o| o.id != occ.id)
            .collect();
        let candidate = task_scheduler::reschedule_retry(
            occ,
            current_execution.retries_remaining,
            now,
            &others,
            &self.config.working_hours,
            &self.config.slot_pool,
            self.config.max_per_day,
        )?;
        self.repo.add_occurrence(candidate.clone());
        self.schedule_occurrence(&candidate);
        Some(candidate)
    }

    /// Compute and arm the first occurrence for a freshly registered task:
    /// its pinned time if one is set and valid, otherwise the next slot at
    /// or after its `created_at`. A no-op if neither yields a valid slot
    /// (e.g. a one-shot task with no pinned time).
    pub fn plan_initial_occurrence(self: &Arc<Self>, task: &TaskDefinition) {
        let scheduled = self.repo.list_occurrences();
        let Some(occ) = task_scheduler::get_next_occurrence(
            task,
            task.created_at,
            &scheduled,
            &self.config.working_hours,
            &self.config.slot_pool,
            self.config.max_per_day,
        ) else {
            return;
        };
        self.repo.add_occurrence(occ.clone());
        self.schedule_occurrence(&occ);
    }

    /// Run the Recovery Service's catch-up sweep on demand. Used by both
    /// `check_for_missed_tasks` and the Controller's `recover_missed_tasks`
    /// command.
    pub fn run_recovery_sweep(self: &Arc<Self>) {
        let now = self.now();
        let executions = self.repo.list_executions();
        let occurrences: Vec<TaskOccurrence> = self.repo.list_occurrences();
        let occurrences_by_id: HashMap<String, TaskOccurrence> = occurrences
            .iter()
            .cloned()
            .map(|o| (o.id.clone(), o))
            .collect();
        let tasks_by_id: HashMap<String, TaskDefinition> = self
            .repo
            .list_tasks()
            .into_iter()
            .map(|t| (t.id.clone(), t))
            .collect();

        let produced = recovery::recover_missed_occurrences(
            &executions,
            &occurrences_by_id,
            &tasks_by_id,
            now,
            &occurrences,
            &self.config.working_hours,
            &self.config.slot_pool,
            self.config.max_per_day,
        );

        for occ in produced {
            self.repo.add_occurrence(occ.clone());
            self.schedule_occurrence(&occ);
        }
    }

    /// A snapshot of the occurrence ids currently holding an armed timer.
    #[must_use]
    pub fn scheduled_occurrences(&self) -> Vec<TaskOccurrence> {
        let ids: Vec<String> = {
            let guard = self.state.lock();
            guard.borrow().timers.keys().cloned().collect()
        };
        ids.into_iter()
            .filter_map(|id| self.repo.get_occurrence(&id))
            .collect()
    }

    /// cancel timer -> write execution -> notify -> retry -> else recurrence.
    fn on_trigger(self: &Arc<Self>, occ: &TaskOccurrence) {
        self.cancel_timer(&occ.id);

        let Some(task) = self.repo.get_task(&occ.task_id) else {
            tracing::debug!(occurrence_id = %occ.id, task_id = %occ.task_id, "dangling task reference at trigger time, ignoring");
            return;
        };

        let now = self.now();
        let execution = TaskExecution {
            id: Uuid::new_v4().to_string(),
            occurrence_id: occ.id.clone(),
            state: ExecutionState::Done,
            retries_remaining: task.retry_policy.max_retries.saturating_sub(1),
            history: vec![TaskEvent {
                event: EventKind::Completed,
                timestamp: now,
            }],
        };
        self.repo.add_execution(execution.clone());

        self.notifier.notify(&task, occ);

        let others: Vec<TaskOccurrence> = self
            .repo
            .list_occurrences()
            .into_iter()
            .filter(|o| o.id != occ.id)
            .collect();

        if task_scheduler::should_retry(&execution) {
            if let Some(retried) = task_scheduler::reschedule_retry(
                occ,
                execution.retries_remaining,
                now,
                &others,
                &self.config.working_hours,
                &self.config.slot_pool,
                self.config.max_per_day,
            ) {
                self.repo.add_occurrence(retried.clone());
                self.schedule_occurrence(&retried);
                return;
            }
        }

        if task.recurrence.is_some() {
            if let Some(next) = task_scheduler::get_next_occurrence(
                &task,
                now,
                &others,
                &self.config.working_hours,
                &self.config.slot_pool,
                self.config.max_per_day,
            ) {
                self.repo.add_occurrence(next.clone());
                self.schedule_occurrence(&next);
            }
        }
    }
}
