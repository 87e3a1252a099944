//! Blocking multi-producer / multi-consumer work queue.

use std::collections::VecDeque;

use parking_lot::{Condvar, Mutex};
use tracing::debug;

/// Unbounded FIFO buffer between submitters and the worker pool, with a
/// one-way shutdown latch.
///
/// # Ordering
///
/// FIFO with respect to the serialization point of `push`; concurrent
/// pushes may interleave but each push is atomic with respect to
/// consumers. No fairness guarantee among consumers.
///
/// # Shutdown protocol
///
/// `shutdown` flips the latch and wakes every blocked consumer. Items
/// already queued are still handed out (drain); once the queue is both
/// shut down and empty, `pop` returns `None` and consumers exit. A `push`
/// after shutdown is a silent no-op rather than an error, which closes the
/// race where a producer observed the engine running just before shutdown
/// was signaled.
pub struct WorkQueue<T> {
    inner: Mutex<QueueInner<T>>,
    available: Condvar,
}

struct QueueInner<T> {
    items: VecDeque<T>,
    shutdown: bool,
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(QueueInner {
                items: VecDeque::new(),
                shutdown: false,
            }),
            available: Condvar::new(),
        }
    }

    /// Enqueue an item and wake one consumer. No-op after shutdown.
    pub fn push(&self, item: T) {
        {
            let mut inner = self.inner.lock();
            if inner.shutdown {
                debug!("push after shutdown dropped");
                return;
            }
            inner.items.push_back(item);
        }
        self.available.notify_one();
    }

    /// Blocking pop. Waits until an item is available or the queue is shut
    /// down; returns `None` only when shut down and drained.
    pub fn pop(&self) -> Option<T> {
        let mut inner = self.inner.lock();
        while inner.items.is_empty() && !inner.shutdown {
            self.available.wait(&mut inner);
        }
        inner.items.pop_front()
    }

    /// Non-blocking pop attempt.
    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().items.pop_front()
    }

    /// Instantaneous depth snapshot; may be stale by the time it is read.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Flip the shutdown latch and wake all blocked consumers. Idempotent.
    pub fn shutdown(&self) {
        {
            let mut inner = self.inner.lock();
            inner.shutdown = true;
        }
        self.available.notify_all();
    }
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
