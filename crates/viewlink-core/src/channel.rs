//! FIFO hand-off queues between the capture loop and the protocol sink.

use std::collections::VecDeque;
use std::sync::Mutex;

/// An unbounded, ordered, thread-safe command queue.
///
/// Push always succeeds; `try_pop` never blocks beyond the queue's own
/// micro-lock. Once pushed, a command is delivered exactly once via pop or
/// stays queued indefinitely if the consumer never polls.
#[derive(Debug)]
pub struct CommandQueue<T> {
    inner: Mutex<VecDeque<T>>,
}

impl<T> CommandQueue<T> {
    pub fn new() -> Self {
        Self { inner: Mutex::new(VecDeque::new()) }
    }

    pub fn push(&self, value: T) {
        self.inner.lock().unwrap().push_back(value);
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Advisory only: the answer may be stale by the time the caller acts on
    /// it. Synchronization correctness never depends on it.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for CommandQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
