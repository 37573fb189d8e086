//! Cancellable debounce timer.
//!
//! The controller owns exactly one of these for persist scheduling. Each
//! `schedule` call aborts whatever timer is live and arms a fresh one, so
//! rapid repeated triggers collapse into a single delayed action and only
//! one timer ever exists at a time.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;

/// Single-slot reset-on-schedule timer.
pub struct DebounceTimer {
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl Default for DebounceTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceTimer {
    pub fn new() -> Self {
        Self {
            handle: Mutex::new(None),
        }
    }

    /// Arm the timer: run `action` after `delay` unless rescheduled or
    /// cancelled first. A pending timer is reset, not extended.
    pub fn schedule<F>(&self, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            action.await;
        });

        let mut slot = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// Abort the pending timer, if any.
    pub fn cancel(&self) {
        let mut slot = self
            .handle
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(previous) = slot.take() {
            previous.abort();
        }
    }
}

impl Drop for DebounceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
