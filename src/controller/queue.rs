//! # Work Queue
//!
//! A deduplicating, exactly-once-in-flight-per-key FIFO queue of string keys,
//! modeled on the client-go workqueue algorithm: a `dirty` set of keys
//! pending delivery, a `processing` set of keys currently checked out, and a
//! `queue` giving FIFO order over what's ready to hand out.

use std::collections::{HashSet, VecDeque};

use tokio::sync::{Mutex, Notify};

/// The key pushed by the renewal ticker to mean "reconcile every candidate
/// namespace", as opposed to a single namespace name pushed by the event
/// source.
pub const ALL_NAMESPACES_KEY: &str = "**all-ns**";

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<String>,
    dirty: HashSet<String>,
    processing: HashSet<String>,
    shutting_down: bool,
}

/// FIFO work queue with at-most-one-in-flight-per-key semantics.
///
/// Adding a key already `processing` marks it dirty without requeueing it;
/// `done` re-queues it then, so a key that changes again mid-reconcile is
/// reconciled again afterward rather than dropped.
#[derive(Debug)]
pub struct WorkQueue {
    state: Mutex<State>,
    notify: Notify,
}

impl Default for WorkQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkQueue {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
            notify: Notify::new(),
        }
    }

    /// Marks `key` dirty and, if it isn't currently checked out, enqueues it.
    /// A no-op once the queue has been shut down or if the key is already
    /// dirty.
    pub async fn add(&self, key: impl Into<String>) {
        let key = key.into();
        let mut state = self.state.lock().await;
        if state.shutting_down || state.dirty.contains(&key) {
            return;
        }
        state.dirty.insert(key.clone());
        if !state.processing.contains(&key) {
            state.queue.push_back(key);
        }
        drop(state);
        self.notify.notify_one();
    }

    /// Waits for a key to become available, checks it out, and returns it.
    /// Returns `None` once the queue is shut down and fully drained.
    pub async fn get(&self) -> Option<String> {
        loop {
            // Register interest in the next notification *before* inspecting
            // state, and enable it while still holding no lock assumptions
            // about ordering: a `notify_one`/`notify_waiters` call that lands
            // anywhere after `enable()` is observed, even if it happens
            // before we start awaiting. Without this, a `shutdown()` call
            // landing between releasing the lock below and the old
            // `notified().await` would wake nobody, since `notify_waiters`
            // stores no permit for waiters that register afterward.
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut state = self.state.lock().await;
                if let Some(key) = state.queue.pop_front() {
                    state.dirty.remove(&key);
                    state.processing.insert(key.clone());
                    return Some(key);
                }
                if state.shutting_down {
                    return None;
                }
            }
            notified.await;
        }
    }

    /// Marks `key` as no longer being processed. If it was marked dirty again
    /// while in flight, it is requeued.
    pub async fn done(&self, key: &str) {
        let mut state = self.state.lock().await;
        state.processing.remove(key);
        if state.dirty.contains(key) {
            state.queue.push_back(key.to_string());
            drop(state);
            self.notify.notify_one();
        }
    }

    /// Shuts the queue down: no further `add` has any effect, and every
    /// waiting or future `get` eventually observes `None` once the queue
    /// drains.
    pub async fn shutdown(&self) {
        let mut state = self.state.lock().await;
        state.shutting_down = true;
        drop(state);
        self.notify.notify_waiters();
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.state.lock().await.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn add_then_get_returns_the_key() {
        let queue = WorkQueue::new();
        queue.add("ns-a").await;
        assert_eq!(queue.get().await, Some("ns-a".to_string()));
    }

    #[tokio::test]
    async fn duplicate_add_before_get_is_deduped() {
        let queue = WorkQueue::new();
        queue.add("ns-a").await;
        queue.add("ns-a").await;
        assert_eq!(queue.len().await, 1);
    }

    #[tokio::test]
    async fn re_add_while_in_flight_requeues_after_done() {
        let queue = WorkQueue::new();
        queue.add("ns-a").await;
        let key = queue.get().await.unwrap();
        // A second add while the key is checked out should not grow the
        // ready queue (it's not processing-blocked from being marked dirty,
        // but it also must not appear twice in `queue`).
        queue.add("ns-a").await;
        assert_eq!(queue.len().await, 0);
        queue.done(&key).await;
        // `done` observed it was re-dirtied and pushed it back.
        assert_eq!(queue.get().await, Some("ns-a".to_string()));
    }

    #[tokio::test]
    async fn done_without_re_add_does_not_requeue() {
        let queue = WorkQueue::new();
        queue.add("ns-a").await;
        let key = queue.get().await.unwrap();
        queue.done(&key).await;
        assert_eq!(queue.len().await, 0);
    }

    #[tokio::test]
    async fn shutdown_drains_then_returns_none() {
        let queue = Arc::new(WorkQueue::new());
        queue.add("ns-a").await;
        queue.shutdown().await;
        // Still yields the already-queued key before reporting drained.
        assert_eq!(queue.get().await, Some("ns-a".to_string()));
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test]
    async fn add_after_shutdown_is_a_no_op() {
        let queue = WorkQueue::new();
        queue.shutdown().await;
        queue.add("ns-a").await;
        assert_eq!(queue.get().await, None);
    }

    #[tokio::test]
    async fn get_blocks_until_add_wakes_it() {
        let queue = Arc::new(WorkQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.add("ns-a").await;
        let key = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not wake in time")
            .expect("waiter task panicked");
        assert_eq!(key, Some("ns-a".to_string()));
    }

    #[tokio::test]
    async fn shutdown_wakes_a_worker_parked_on_an_empty_queue() {
        // Regression test for a lost-wakeup race: a `get()` call parked on an
        // empty queue must still observe `shutdown()`'s `notify_waiters()`
        // even though the two run concurrently with no shared lock held
        // across the wait.
        let queue = Arc::new(WorkQueue::new());
        let waiter = {
            let queue = Arc::clone(&queue);
            tokio::spawn(async move { queue.get().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        queue.shutdown().await;
        let result = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("shutdown must wake a parked get() call")
            .expect("waiter task panicked");
        assert_eq!(result, None);
    }
}
