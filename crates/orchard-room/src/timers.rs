//! Cancellable cooldown-expiry timers.
//!
//! Each timer is a small Tokio task that sleeps, then reports the expired
//! session id back through a channel the room itself drains. The world is
//! never touched from the timer task: the expiry is handled in the room's
//! own event order like any other event.

use std::collections::HashMap;
use std::time::Duration;

use orchard_protocol::SessionId;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Pending cooldown expiries, one per eliminated session id.
///
/// Dropping the set aborts every pending timer.
pub struct CooldownTimers {
    expired_tx: mpsc::UnboundedSender<SessionId>,
    pending: HashMap<SessionId, JoinHandle<()>>,
}

impl CooldownTimers {
    /// Creates an empty timer set that reports expiries on `expired_tx`.
    pub fn new(expired_tx: mpsc::UnboundedSender<SessionId>) -> Self {
        Self {
            expired_tx,
            pending: HashMap::new(),
        }
    }

    /// Schedules `id` to expire after `delay`, replacing any pending timer
    /// for the same id.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule(&mut self, id: SessionId, delay: Duration) {
        let tx = self.expired_tx.clone();
        let reported = id.clone();
        // Deadline is fixed here, not when the task is first polled. A delay
        // past the clock's range never fires.
        let sleep = match Instant::now().checked_add(delay) {
            Some(deadline) => tokio::time::sleep_until(deadline),
            None => tokio::time::sleep(delay),
        };
        let handle = tokio::spawn(async move {
            sleep.await;
            let _ = tx.send(reported);
        });
        if let Some(previous) = self.pending.insert(id, handle) {
            previous.abort();
        }
    }

    /// Forgets the timer for `id` after it fired. Returns `false` if no
    /// timer was pending, i.e. the report is stale.
    pub fn complete(&mut self, id: &SessionId) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Aborts every pending timer. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.pending.len();
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
        count
    }

    pub fn is_pending(&self, id: &SessionId) -> bool {
        self.pending.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl Drop for CooldownTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
