//! Unbounded FIFO work queue with a drain barrier.
//!
//! # Overview
//!
//! [`WorkQueue`] holds pending items plus an outstanding counter:
//! - [`put`](WorkQueue::put) appends an item and counts it outstanding
//! - [`get`](WorkQueue::get) suspends until an item is available
//! - [`acknowledge`](WorkQueue::acknowledge) retires one outstanding item
//! - [`join`](WorkQueue::join) suspends until the outstanding count is zero
//!
//! A handler that re-enqueues an item puts it first and acknowledges the
//! original afterwards, so the count never touches zero while work remains.
//! All operations are safe to call concurrently without external locking.
//!
//! # Example
//!
//! ```
//! use concurrent_requests::queue::WorkQueue;
//!
//! # async fn example() -> Result<(), concurrent_requests::queue::QueueError> {
//! let queue = WorkQueue::new();
//! queue.put("a");
//! queue.put("b");
//!
//! let first = queue.get().await;
//! assert_eq!(first, "a");
//! queue.acknowledge()?;
//!
//! let second = queue.get().await;
//! queue.put(second); // retry: re-enqueue, then acknowledge the original
//! queue.acknowledge()?;
//!
//! let retried = queue.get().await;
//! assert_eq!(retried, "b");
//! queue.acknowledge()?;
//!
//! queue.join().await;
//! # Ok(())
//! # }
//! ```

mod error;

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

pub use error::QueueError;

/// Counters describing queue traffic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Total items put.
    pub puts: u64,
    /// Total items handed out by `get`/`try_get`.
    pub gets: u64,
    /// Total acknowledgements accepted.
    pub acknowledged: u64,
}

#[derive(Debug)]
struct QueueState<T> {
    items: VecDeque<T>,
    outstanding: usize,
    stats: QueueStats,
}

/// Unbounded FIFO of pending work with an acknowledgement barrier.
#[derive(Debug)]
pub struct WorkQueue<T> {
    state: Mutex<QueueState<T>>,
    item_ready: Notify,
    drained: Notify,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> WorkQueue<T> {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState {
                items: VecDeque::new(),
                outstanding: 0,
                stats: QueueStats::default(),
            }),
            item_ready: Notify::new(),
            drained: Notify::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, QueueState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends `item` and counts it outstanding.
    pub fn put(&self, item: T) {
        {
            let mut state = self.lock();
            state.items.push_back(item);
            state.outstanding += 1;
            state.stats.puts += 1;
        }
        self.item_ready.notify_one();
    }

    /// Removes the oldest item, waiting until one is available.
    ///
    /// Cancel-safe: dropping the future before it completes never loses an
    /// item.
    pub async fn get(&self) -> T {
        loop {
            let notified = self.item_ready.notified();
            if let Some(item) = self.try_get() {
                return item;
            }
            notified.await;
        }
    }

    /// Removes the oldest item if one is queued.
    pub fn try_get(&self) -> Option<T> {
        let mut state = self.lock();
        let item = state.items.pop_front()?;
        state.stats.gets += 1;
        let more = !state.items.is_empty();
        drop(state);
        if more {
            // Hand the wakeup on so a concurrent waiter sees the remaining items.
            self.item_ready.notify_one();
        }
        Some(item)
    }

    /// Retires one outstanding item, releasing `join` waiters at zero.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Unbalanced`] if nothing is outstanding.
    pub fn acknowledge(&self) -> Result<(), QueueError> {
        let mut state = self.lock();
        if state.outstanding == 0 {
            return Err(QueueError::Unbalanced {
                puts: state.stats.puts,
                acknowledged: state.stats.acknowledged,
            });
        }
        state.outstanding -= 1;
        state.stats.acknowledged += 1;
        let drained = state.outstanding == 0;
        drop(state);
        if drained {
            self.drained.notify_waiters();
        }
        Ok(())
    }

    /// Waits until every item put so far has been acknowledged.
    ///
    /// Returns immediately if nothing is outstanding.
    pub async fn join(&self) {
        loop {
            let notified = self.drained.notified();
            if self.outstanding() == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Number of items put but not yet acknowledged.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.lock().outstanding
    }

    /// Number of items waiting to be taken.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the traffic counters.
    #[must_use]
    pub fn stats(&self) -> QueueStats {
        self.lock().stats
    }
}
