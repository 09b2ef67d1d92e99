//! Per-host work and done queues for the fleetmtc maintenance controller.
//!
//! Every FSM action dispatches commands to downstream daemons through a
//! per-host work queue, and reaps their results through a matching done
//! queue. Both queues are built on the same [`BoundedQueue`] primitive: a
//! stuck action should back up and time out, not grow memory without
//! bound.

mod bounded;

pub use bounded::{BoundedQueue, PushResult};

use fleetmtc_types::SequenceNumber;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("work queue is full (capacity {0})")]
    WorkQueueFull(usize),
    #[error("done queue is full (capacity {0})")]
    DoneQueueFull(usize),
}

/// Outcome of a completed work item, matching the status codes the
/// original daemon's response payload carries (0 = success).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkStatus {
    Pass,
    Fail,
}

/// Outcome of `dequeue_done`/`workQueue_done` (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueResult {
    Pass,
    Retry,
    Fail,
    FailWorkqTimeout,
}

/// A single work-queue entry: a command dispatched to a downstream
/// subsystem (inventory, VIM, SM, or a node-directed command), tagged with
/// a strictly increasing per-host sequence number.
#[derive(Debug, Clone)]
pub struct WorkEntry<P> {
    pub sequence: SequenceNumber,
    pub command: String,
    pub payload: P,
}

/// A single done-queue entry: the response to a previously dispatched work
/// entry, correlated by `sequence`.
#[derive(Debug, Clone)]
pub struct DoneEntry<P> {
    pub sequence: SequenceNumber,
    pub status: WorkStatus,
    pub status_string: String,
    pub payload: P,
}

/// A host's paired work/done queues and sequence counter.
pub struct HostWorkQueue<P> {
    work: BoundedQueue<WorkEntry<P>>,
    done: BoundedQueue<DoneEntry<P>>,
    next_sequence: SequenceNumber,
}

impl<P> HostWorkQueue<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            work: BoundedQueue::new(capacity),
            done: BoundedQueue::new(capacity),
            next_sequence: SequenceNumber::ZERO,
        }
    }

    /// `enqueue`: assigns the next sequence number to `command`/`payload`
    /// and pushes it onto the work queue. Returns the assigned sequence so
    /// the caller can correlate a later done entry.
    pub fn enqueue(
        &mut self,
        command: impl Into<String>,
        payload: P,
    ) -> Result<SequenceNumber, QueueError> {
        self.next_sequence = self.next_sequence.next();
        let sequence = self.next_sequence;
        let entry = WorkEntry {
            sequence,
            command: command.into(),
            payload,
        };
        match self.work.try_push(entry) {
            PushResult::Ok => {
                debug!(%sequence, "work item enqueued");
                Ok(sequence)
            }
            PushResult::Backpressure(_) => Err(QueueError::WorkQueueFull(self.work.capacity())),
        }
    }

    /// Pushes a response payload onto the done queue. Called by the I/O
    /// layer when a downstream response arrives.
    pub fn complete(
        &self,
        sequence: SequenceNumber,
        status: WorkStatus,
        status_string: impl Into<String>,
        payload: P,
    ) -> Result<(), QueueError> {
        let entry = DoneEntry {
            sequence,
            status,
            status_string: status_string.into(),
            payload,
        };
        match self.done.try_push(entry) {
            PushResult::Ok => Ok(()),
            PushResult::Backpressure(_) => Err(QueueError::DoneQueueFull(self.done.capacity())),
        }
    }

    /// `dequeue_done`: inspects (and pops) the head of the done queue.
    /// Returns `Pass` if its status is success, `Fail` if not, `Retry` if
    /// the done queue is currently empty (caller should poll again before
    /// its deadline).
    pub fn dequeue_done(&self) -> QueueResult {
        match self.done.try_pop() {
            Some(entry) => match entry.status {
                WorkStatus::Pass => QueueResult::Pass,
                WorkStatus::Fail => QueueResult::Fail,
            },
            None => QueueResult::Retry,
        }
    }

    /// `workQueue_done`: `Pass` if the work queue is empty and every
    /// queued done entry (if any remain un-drained) carries success
    /// status; `FailWorkqTimeout` if `deadline_expired` is true; otherwise
    /// `Retry`.
    pub fn workqueue_done(&self, deadline_expired: bool) -> QueueResult {
        if deadline_expired {
            warn!(
                pending = self.work.len(),
                "work queue timed out before completion"
            );
            return QueueResult::FailWorkqTimeout;
        }
        if self.work.is_empty() && self.done.is_empty() {
            return QueueResult::Pass;
        }
        QueueResult::Retry
    }

    /// `purge`: clears both queues. Mandatory on every FSM failure path
    /// before the action restarts, so stale done entries from the previous
    /// attempt can never be mistaken for current ones.
    pub fn purge(&mut self) {
        self.work.clear();
        self.done.clear();
    }

    pub fn work_len(&self) -> usize {
        self.work.len()
    }

    pub fn done_len(&self) -> usize {
        self.done.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enqueue_assigns_strictly_increasing_sequences() {
        let mut q: HostWorkQueue<()> = HostWorkQueue::new(8);
        let s1 = q.enqueue("reset", ()).unwrap();
        let s2 = q.enqueue("power-on", ()).unwrap();
        assert!(s2 > s1);
    }

    #[test]
    fn dequeue_done_retries_when_empty() {
        let q: HostWorkQueue<()> = HostWorkQueue::new(8);
        assert_eq!(q.dequeue_done(), QueueResult::Retry);
    }

    #[test]
    fn dequeue_done_reflects_status() {
        let mut q: HostWorkQueue<&'static str> = HostWorkQueue::new(8);
        let seq = q.enqueue("probe", "payload").unwrap();
        q.complete(seq, WorkStatus::Pass, "ok", "resp").unwrap();
        assert_eq!(q.dequeue_done(), QueueResult::Pass);

        let seq = q.enqueue("probe", "payload").unwrap();
        q.complete(seq, WorkStatus::Fail, "nope", "resp").unwrap();
        assert_eq!(q.dequeue_done(), QueueResult::Fail);
    }

    #[test]
    fn workqueue_done_passes_when_both_queues_drained() {
        let mut q: HostWorkQueue<()> = HostWorkQueue::new(8);
        let seq = q.enqueue("probe", ()).unwrap();
        assert_eq!(q.workqueue_done(false), QueueResult::Retry);
        q.complete(seq, WorkStatus::Pass, "ok", ()).unwrap();
        q.dequeue_done();
        assert_eq!(q.workqueue_done(false), QueueResult::Pass);
    }

    #[test]
    fn workqueue_done_reports_timeout_over_retry() {
        let mut q: HostWorkQueue<()> = HostWorkQueue::new(8);
        q.enqueue("probe", ()).unwrap();
        assert_eq!(q.workqueue_done(true), QueueResult::FailWorkqTimeout);
    }

    #[test]
    fn purge_clears_both_queues_for_fsm_restart() {
        let mut q: HostWorkQueue<()> = HostWorkQueue::new(8);
        q.enqueue("probe", ()).unwrap();
        q.complete(SequenceNumber::ZERO.next(), WorkStatus::Fail, "x", ())
            .unwrap();
        q.purge();
        assert_eq!(q.work_len(), 0);
        assert_eq!(q.done_len(), 0);
    }
}
