//! The persistence boundary: a simple key-addressed store for task
//! definitions, occurrences, and execution records.
//!
//! The core only depends on the [`Repository`] trait's CRUD contract. The
//! on-disk adapter is a concrete, working piece of the ambient stack: a
//! single `rustbreak::PathDatabase` holding one serializable struct, saved
//! to disk after every mutation.

use crate::model::{TaskDefinition, TaskExecution, TaskOccurrence};
use rustbreak::{deser::Ron, PathDatabase};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// CRUD over three id-keyed tables. `add_*` is an upsert: calling it with an
/// id that already exists overwrites the stored record.
pub trait Repository: Send + Sync {
    fn add_task(&self, task: TaskDefinition);
    fn get_task(&self, id: &str) -> Option<TaskDefinition>;
    fn list_tasks(&self) -> Vec<TaskDefinition>;

    fn add_occurrence(&self, occurrence: TaskOccurrence);
    fn get_occurrence(&self, id: &str) -> Option<TaskOccurrence>;
    fn list_occurrences(&self) -> Vec<TaskOccurrence>;

    fn add_execution(&self, execution: TaskExecution);
    fn list_executions(&self) -> Vec<TaskExecution>;

    /// Cascade delete: the task, every occurrence referencing it, and every
    /// execution referencing one of those occurrences.
    fn delete_task_and_related(&self, task_id: &str);
}

/// The three logical tables, persisted as one serializable struct.
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct RepoState {
    pub tasks: HashMap<String, TaskDefinition>,
    pub occurrences: HashMap<String, TaskOccurrence>,
    pub executions: HashMap<String, TaskExecution>,
}

impl RepoState {
    fn cascade_delete(&mut self, task_id: &str) {
        self.tasks.remove(task_id);
        let dead_occurrence_ids: Vec<String> = self
            .occurrences
            .iter()
            .filter(|(_, occ)| occ.task_id == task_id)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &dead_occurrence_ids {
            self.occurrences.remove(id);
        }
        self.executions
            .retain(|_, exec| !dead_occurrence_ids.contains(&exec.occurrence_id));
    }
}

/// An in-memory [`Repository`], used for tests and for any embedding that
/// doesn't need disk persistence.
#[derive(Default)]
pub struct InMemoryRepository {
    state: parking_lot::Mutex<RepoState>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Repository for InMemoryRepository {
    fn add_task(&self, task: TaskDefinition) {
        self.state.lock().tasks.insert(task.id.clone(), task);
    }

    fn get_task(&self, id: &str) -> Option<TaskDefinition> {
        self.state.lock().tasks.get(id).cloned()
    }

    fn list_tasks(&self) -> Vec<TaskDefinition> {
        self.state.lock().tasks.values().cloned().collect()
    }

    fn add_occurrence(&self, occurrence: TaskOccurrence) {
        self.state
            .lock()
            .occurrences
            .insert(occurrence.id.clone(), occurrence);
    }

    fn get_occurrence(&self, id: &str) -> Option<TaskOccurrence> {
        self.state.lock().occurrences.get(id).cloned()
    }

    fn list_occurrences(&self) -> Vec<TaskOccurrence> {
        self.state.lock().occurrences.values().cloned().collect()
    }

    fn add_execution(&self, execution: TaskExecution) {
        self.state
            .lock()
            .executions
            .insert(execution.id.clone(), execution);
    }

    fn list_executions(&self) -> Vec<TaskExecution> {
        self.state.lock().executions.values().cloned().collect()
    }

    fn delete_task_and_related(&self, task_id: &str) {
        self.state.lock().cascade_delete(task_id);
    }
}

/// A disk-backed [`Repository`], wrapping a `rustbreak::PathDatabase`: a
/// single Ron file, rewritten in full after every mutation.
pub struct RustbreakRepository {
    db: PathDatabase<RepoState, Ron>,
}

impl RustbreakRepository {
    /// Open (or create) the on-disk store at `path`.
    ///
    /// # Errors
    /// Returns an error if the path cannot be read, created, or parsed as a
    /// valid `RepoState`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, rustbreak::RustbreakError> {
        let db = PathDatabase::load_from_path_or_default(path.as_ref().to_path_buf())?;
        Ok(Self { db })
    }
}

impl Repository for RustbreakRepository {
    fn add_task(&self, task: TaskDefinition) {
        {
            let mut data = self.db.borrow_data_mut().expect("corrupt database");
            data.tasks.insert(task.id.clone(), task);
        }
        self.db.save().expect("persist database");
    }

    fn get_task(&self, id: &str) -> Option<TaskDefinition> {
        self.db
            .borrow_data()
            .expect("corrupt database")
            .tasks
            .get(id)
            .cloned()
    }

    fn list_tasks(&self) -> Vec<TaskDefinition> {
        self.db
            .borrow_data()
            .expect("corrupt database")
            .tasks
            .values()
            .cloned()
            .collect()
    }

    fn add_occurrence(&self, occurrence: TaskOccurrence) {
        {
            let mut data = self.db.borrow_data_mut().expect("corrupt database");
            data.occurrences.insert(occurrence.id.clone(), occurrence);
        }
        self.db.save().expect("persist database");
    }

    fn get_occurrence(&self, id: &str) -> Option<TaskOccurrence> {
        self.db
            .borrow_data()
            .expect("corrupt database")
            .occurrences
            .get(id)
            .cloned()
    }

    fn list_occurrences(&self) -> Vec<TaskOccurrence> {
        self.db
            .borrow_data()
            .expect("corrupt database")
            .occurrences
            .values()
            .cloned()
            .collect()
    }

    fn add_execution(&self, execution: TaskExecution) {
        {
            let mut data = self.db.borrow_data_mut().expect("corrupt database");
            data.executions.insert(execution.id.clone(), execution);
        }
        self.db.save().expect("persist database");
    }

    fn list_executions(&self) -> Vec<TaskExecution> {
        self.db
            .borrow_data()
            .expect("corrupt database")
            .executions
            .values()
            .cloned()
            .collect()
    }

    fn delete_task_and_related(&self, task_id: &str) {
        {
            let mut data = self.db.borrow_data_mut().expect("corrupt database");
            data.cascade_delete(task_id);
        }
        self.db.save().expect("persist database");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ExecutionState, Priority, RetryPolicy};
    use chrono::NaiveDate;

    fn sample_task(id: &str) -> TaskDefinition {
        TaskDefinition {
            id: id.into(),
            title: "Water the plants".into(),
            description: None,
            link: None,
            created_at: NaiveDate::from_ymd_opt(2025, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
            recurrence: None,
            priority: Priority::Medium,
            preferred_slots: vec![],
            retry_policy: RetryPolicy { max_retries: 0 },
            pinned_time: None,
        }
    }

    #[test]
    fn add_task_is_an_upsert() {
        let repo = InMemoryRepository::new();
        repo.add_task(sample_task("t1"));
        let mut updated = sample_task("t1");
        updated.title = "Water the plants twice".into();
        repo.add_task(updated.clone());
        assert_eq!(repo.list_tasks(), vec![updated]);
    }

    #[test]
    fn cascade_delete_removes_occurrences_and_executions() {
        let repo = InMemoryRepository::new();
        repo.add_task(sample_task("t1"));
        let when = NaiveDate::from_ymd_opt(2025, 1, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let occ = TaskOccurrence::new_slotted("o1".into(), "t1".into(), when, None);
        repo.add_occurrence(occ.clone());
        repo.add_execution(TaskExecution {
            id: "e1".into(),
            occurrence_id: occ.id.clone(),
            state: ExecutionState::Done,
            retries_remaining: 0,
            history: vec![],
        });

        repo.delete_task_and_related("t1");

        assert!(repo.get_task("t1").is_none());
        assert!(repo.list_occurrences().is_empty());
        assert!(repo.list_executions().is_empty());
    }

    #[test]
    fn cascade_delete_leaves_unrelated_records_untouched() {
        let repo = InMemoryRepository::new();
        repo.add_task(sample_task("t1"));
        repo.add_task(sample_task("t2"));
        let when = NaiveDate::from_ymd_opt(2025, 1, 13)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        repo.add_occurrence(TaskOccurrence::new_slotted(
            "o2".into(),
            "t2".into(),
            when,
            None,
        ));

        repo.delete_task_and_related("t1");

        assert!(repo.get_task("t2").is_some());
        assert_eq!(repo.list_occurrences().len(), 1);
    }
}
