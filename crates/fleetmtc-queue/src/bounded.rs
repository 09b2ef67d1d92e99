//! Bounded FIFO primitive shared by the work and done queues.
//!
//! An `ArrayQueue`-backed bounded queue that hands a full push back to the
//! caller instead of blocking or growing without bound. A stuck FSM action
//! should produce backpressure, not unbounded memory growth.

use crossbeam_queue::ArrayQueue;

/// Result of attempting to push onto a full queue.
#[derive(Debug)]
pub enum PushResult<T> {
    Ok,
    Backpressure(T),
}

#[derive(Debug)]
pub struct BoundedQueue<T> {
    inner: ArrayQueue<T>,
}

impl<T> BoundedQueue<T> {
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "queue capacity must be positive");
        Self {
            inner: ArrayQueue::new(capacity),
        }
    }

    pub fn try_push(&self, item: T) -> PushResult<T> {
        match self.inner.push(item) {
            Ok(()) => PushResult::Ok,
            Err(item) => PushResult::Backpressure(item),
        }
    }

    pub fn try_pop(&self) -> Option<T> {
        self.inner.pop()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.is_full()
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity()
    }

    /// Pops and drops every queued item, leaving the queue empty. Used by
    /// `purge` on the owning work/done queue.
    pub fn clear(&self) {
        while self.inner.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_push_pop() {
        let q = BoundedQueue::new(3);
        assert!(matches!(q.try_push(1), PushResult::Ok));
        assert_eq!(q.try_pop(), Some(1));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn backpressure_when_full() {
        let q = BoundedQueue::new(1);
        assert!(matches!(q.try_push(1), PushResult::Ok));
        match q.try_push(2) {
            PushResult::Backpressure(v) => assert_eq!(v, 2),
            PushResult::Ok => panic!("expected backpressure"),
        }
    }

    #[test]
    fn clear_empties_queue() {
        let q = BoundedQueue::new(4);
        let _ = q.try_push(1);
        let _ = q.try_push(2);
        q.clear();
        assert!(q.is_empty());
    }
}
