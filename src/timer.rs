//! A cancelable one-shot timer backed by a daemon-style background thread.
//!
//! This is the concrete primitive behind the Smart Scheduler's `timers` map:
//! each armed occurrence owns one `Timer`, and canceling it is a cheap flag
//! flip rather than a thread join.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// A handle to an in-flight one-shot timer. Dropping the handle does not
/// cancel the timer; call [`Timer::cancel`] explicitly.
pub struct Timer {
    cancelled: Arc<AtomicBool>,
}

impl Timer {
    /// Spawn a background thread that sleeps for `delay` and then invokes
    /// `callback`, unless [`Timer::cancel`] was called first. A cancel that
    /// races with the sleep's expiry is resolved in favor of cancellation:
    /// the callback is checked-then-called, never called-then-checked.
    pub fn arm<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancelled = Arc::new(AtomicBool::new(false));
        let cancelled_for_thread = Arc::clone(&cancelled);
        let builder = thread::Builder::new().name("chronotask-timer".into());
        let spawned = builder.spawn(move || {
            thread::sleep(delay);
            if !cancelled_for_thread.load(Ordering::SeqCst) {
                callback();
            }
        });
        if let Err(err) = spawned {
            tracing::error!(error = %err, "failed to spawn timer thread");
        }
        Self { cancelled }
    }

    /// Prevent the timer's callback from firing, if it hasn't already.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}
