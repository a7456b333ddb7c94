//! The speech/notification side-effect invoked at trigger time.
//!
//! The core treats this purely as a collaborator: the trigger pipeline
//! calls `notify` and moves on regardless of the outcome.

use crate::model::{TaskDefinition, TaskOccurrence};

/// A side effect fired when an occurrence's trigger pipeline runs. A failure
/// to notify must never abort the pipeline; implementations should log and
/// return.
pub trait Notifier: Send + Sync {
    fn notify(&self, task: &TaskDefinition, occurrence: &TaskOccurrence);
}

/// The default notifier: a desktop notification via `notify-rust`.
#[derive(Debug, Default, Clone, Copy)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, task: &TaskDefinition, occurrence: &TaskOccurrence) {
        let body = match &occurrence.slot_name {
            Some(slot) => format!("Scheduled slot: {slot}"),
            None => "Pinned time reached".to_string(),
        };
        if let Err(err) = notify_rust::Notification::new()
            .summary(&format!("Due now: {}", task.title))
            .body(&body)
            .show()
        {
            tracing::warn!(error = %err, task_id = %task.id, occurrence_id = %occurrence.id, "failed to show notification");
        }
    }
}

/// A notifier that does nothing, for headless operation and tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _task: &TaskDefinition, _occurrence: &TaskOccurrence) {}
}

#[cfg(test)]
pub(crate) mod recording {
    use super::{Notifier, TaskDefinition, TaskOccurrence};
    use parking_lot::Mutex;

    /// Records every `notify` call for assertions in Smart Scheduler tests.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub calls: Mutex<Vec<(String, String)>>,
    }

    impl Notifier for RecordingNotifier {
        fn notify(&self, task: &TaskDefinition, occurrence: &TaskOccurrence) {
            self.calls
                .lock()
                .push((task.id.clone(), occurrence.id.clone()));
        }
    }
}
