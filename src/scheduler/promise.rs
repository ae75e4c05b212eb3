//! Write-once promise used for the submit/dispatch handshake.

use parking_lot::Mutex;
use tokio::sync::Notify;

/// A value that can be set at most once and awaited by any number of tasks.
///
/// The first `set` wins; later calls are no-ops that report `false`.
pub struct WriteOnce<T> {
    value: Mutex<Option<T>>,
    notify: Notify,
}

impl<T: Clone> WriteOnce<T> {
    pub fn new() -> Self {
        Self {
            value: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// Set the value if it has not been set yet. Returns whether this call won.
    pub fn set(&self, value: T) -> bool {
        {
            let mut slot = self.value.lock();
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
        }
        self.notify.notify_waiters();
        true
    }

    /// Current value without waiting.
    pub fn get(&self) -> Option<T> {
        self.value.lock().clone()
    }

    pub fn is_set(&self) -> bool {
        self.value.lock().is_some()
    }

    /// Wait until the value is set.
    pub async fn wait(&self) -> T {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a concurrent `set` cannot slip between.
            notified.as_mut().enable();
            if let Some(value) = self.get() {
                return value;
            }
            notified.await;
        }
    }
}

impl<T: Clone> Default for WriteOnce<T> {
    fn default() -> Self {
        Self::new()
    }
}
