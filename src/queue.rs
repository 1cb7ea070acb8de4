//! Unbounded FIFO shared between producer tasks and a consumer.
//!
//! Used for the event queue (workers produce, the application consumes) and
//! for each connection's outgoing queue (application threads produce, the
//! send worker consumes).

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

use tokio::sync::Notify;

/// Thread-safe FIFO queue with an async "work available" signal.
///
/// Insertion order is the only order; items are never reordered.
#[derive(Debug)]
pub struct MessageQueue<T> {
    items: Mutex<VecDeque<T>>,
    available: Notify,
}

impl<T> Default for MessageQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> MessageQueue<T> {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: Mutex::new(VecDeque::new()),
            available: Notify::new(),
        }
    }

    // A panic while holding the lock cannot leave the deque half-modified, so
    // a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.items.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an item and wake a waiting consumer.
    pub fn push(&self, item: T) {
        self.lock().push_back(item);
        self.available.notify_one();
    }

    /// Remove the oldest item, if any.
    pub fn try_pop(&self) -> Option<T> {
        self.lock().pop_front()
    }

    /// Remove and return all queued items in order.
    pub fn drain(&self) -> Vec<T> {
        self.lock().drain(..).collect()
    }

    /// Discard all queued items.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of queued items.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wait for the next item.
    ///
    /// Cancel safe: if the future is dropped before it resolves, no item is
    /// lost.
    pub async fn pop(&self) -> T {
        loop {
            let notified = self.available.notified();
            if let Some(item) = self.try_pop() {
                return item;
            }
            notified.await;
        }
    }

    /// Wait until at least one item is queued, then take everything.
    ///
    /// Cancel safe in the same way as [`pop`](Self::pop).
    pub async fn drain_wait(&self) -> Vec<T> {
        loop {
            let notified = self.available.notified();
            {
                let mut items = self.lock();
                if !items.is_empty() {
                    return items.drain(..).collect();
                }
            }
            notified.await;
        }
    }
}
