//! Blocking FIFO of pending change notifications.
//!
//! Producers (watch notification handlers) insert concurrently; exactly one
//! dispatch task pops. The backlog and the `expired` flag live behind a single
//! mutex so no caller ever observes one without the other.
//!
//! `pop` never polls. A waiter registers its [`Notify`] interest before it
//! inspects the state, so an `insert` or `set_expired` racing with the check
//! still wakes it.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::Event;

#[derive(Debug, Default)]
struct QueueState {
    items: VecDeque<Event>,
    expired: bool,
}

#[derive(Debug, Default)]
pub struct EventQueue {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `event` to the tail. Once the queue expired the event is
    /// discarded and `false` is returned; callers are free to ignore it.
    pub fn insert(
        &self,
        event: Event,
    ) -> bool {
        {
            let mut state = self.state.lock();
            if state.expired {
                trace!(key = %event.key, "queue expired, event discarded");
                return false;
            }
            state.items.push_back(event);
        }
        self.notify.notify_waiters();
        true
    }

    /// Waits for the next event.
    ///
    /// Returns `None` once the queue is expired or `cancel` fires. Items still
    /// pending at expiry are never handed out.
    pub async fn pop(
        &self,
        cancel: &CancellationToken,
    ) -> Option<Event> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if cancel.is_cancelled() {
                return None;
            }

            {
                let mut state = self.state.lock();
                if state.expired {
                    return None;
                }
                if let Some(event) = state.items.pop_front() {
                    return Some(event);
                }
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = &mut notified => {}
            }
        }
    }

    /// Removes up to `max` events from the head in one step, without
    /// waiting. `None` once the queue is expired.
    pub fn take_front(
        &self,
        max: usize,
    ) -> Option<Vec<Event>> {
        let mut state = self.state.lock();
        if state.expired {
            return None;
        }
        let n = state.items.len().min(max);
        Some(state.items.drain(..n).collect())
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn is_expired(&self) -> bool {
        self.state.lock().expired
    }

    /// Moves the queue into its terminal state. Idempotent.
    pub fn set_expired(&self) {
        self.state.lock().expired = true;
        self.notify.notify_waiters();
    }

    /// Expires the queue only if nothing is pending, as one atomic step.
    /// Returns whether the queue is expired afterwards.
    pub fn expire_if_drained(&self) -> bool {
        let expired = {
            let mut state = self.state.lock();
            if state.items.is_empty() {
                state.expired = true;
            }
            state.expired
        };
        if expired {
            self.notify.notify_waiters();
        }
        expired
    }
}
