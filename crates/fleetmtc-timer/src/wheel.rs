//! Background timer wheel.
//!
//! A single OS thread owns a min-heap of `(deadline, TimerId)` pairs. It
//! sleeps until the next deadline (or until woken by a new `start`/`stop`
//! request), then pushes a [`TimerRing`] onto a bounded mailbox for the
//! main loop to drain. This is the re-architected replacement for signal
//! delivery into per-struct memory: no `SIGRTMIN`, no struct touched from
//! a signal handler, just a queue the owner drains on its own thread.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_queue::ArrayQueue;
use fleetmtc_types::TimerId;
use tracing::{debug, trace};

/// An expiry notice deposited onto the wheel's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerRing {
    pub id: TimerId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ScheduledEntry {
    deadline: Instant,
    id: TimerId,
    /// Monotonic generation stamped at schedule time. A `stop`/`reset`
    /// bumps the generation recorded in `live`, so a heap entry whose
    /// generation no longer matches is a stale duplicate and is dropped
    /// silently instead of ringing.
    generation: u64,
}

impl Ord for ScheduledEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.deadline.cmp(&other.deadline)
    }
}

impl PartialOrd for ScheduledEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

struct Shared {
    heap: Mutex<BinaryHeap<Reverse<ScheduledEntry>>>,
    live: Mutex<std::collections::HashMap<TimerId, u64>>,
    wake: Condvar,
    shutdown: Mutex<bool>,
}

/// Background thread that fires [`TimerRing`] notices into a mailbox.
pub struct TimerWheel {
    shared: Arc<Shared>,
    mailbox: Arc<ArrayQueue<TimerRing>>,
    handle: Option<JoinHandle<()>>,
}

impl TimerWheel {
    /// Spawns the background thread. `mailbox_capacity` bounds how many
    /// un-drained rings can queue up before new ones are dropped (logged,
    /// not silently lost) — a stuck main loop should not grow memory
    /// without limit.
    pub fn spawn(mailbox_capacity: usize) -> Self {
        let shared = Arc::new(Shared {
            heap: Mutex::new(BinaryHeap::new()),
            live: Mutex::new(std::collections::HashMap::new()),
            wake: Condvar::new(),
            shutdown: Mutex::new(false),
        });
        let mailbox = Arc::new(ArrayQueue::new(mailbox_capacity));

        let worker_shared = Arc::clone(&shared);
        let worker_mailbox = Arc::clone(&mailbox);
        let handle = thread::Builder::new()
            .name("fleetmtc-timer-wheel".into())
            .spawn(move || run(worker_shared, worker_mailbox))
            .expect("failed to spawn timer wheel thread");

        Self {
            shared,
            mailbox,
            handle: Some(handle),
        }
    }

    /// Schedules `id` to ring after `delay`. Replaces any previously
    /// scheduled deadline for the same id (start/reset share this path).
    pub fn start(&self, id: TimerId, delay: Duration) {
        let deadline = Instant::now() + delay;
        let generation = {
            let mut live = self.shared.live.lock().unwrap();
            let gen = live.entry(id).or_insert(0);
            *gen += 1;
            *gen
        };
        self.shared.heap.lock().unwrap().push(Reverse(ScheduledEntry {
            deadline,
            id,
            generation,
        }));
        self.shared.wake.notify_one();
        trace!(%id, delay_ms = delay.as_millis(), "timer scheduled");
    }

    /// Cancels `id`. Any heap entry already scheduled becomes stale and is
    /// dropped by the worker loop when it's popped.
    pub fn stop(&self, id: TimerId) {
        let mut live = self.shared.live.lock().unwrap();
        live.remove(&id);
        debug!(%id, "timer stopped");
    }

    pub fn mailbox(&self) -> Arc<ArrayQueue<TimerRing>> {
        Arc::clone(&self.mailbox)
    }
}

impl Drop for TimerWheel {
    fn drop(&mut self) {
        *self.shared.shutdown.lock().unwrap() = true;
        self.shared.wake.notify_all();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run(shared: Arc<Shared>, mailbox: Arc<ArrayQueue<TimerRing>>) {
    loop {
        let mut heap = shared.heap.lock().unwrap();

        if *shared.shutdown.lock().unwrap() {
            return;
        }

        let wait = match heap.peek() {
            Some(Reverse(entry)) => entry.deadline.saturating_duration_since(Instant::now()),
            None => Duration::from_secs(3600),
        };

        if wait > Duration::ZERO {
            let (guard, _timeout) = shared.wake.wait_timeout(heap, wait).unwrap();
            heap = guard;
        }

        if *shared.shutdown.lock().unwrap() {
            return;
        }

        while let Some(Reverse(entry)) = heap.peek() {
            if entry.deadline > Instant::now() {
                break;
            }
            let entry = heap.pop().unwrap().0;

            let still_live = {
                let live = shared.live.lock().unwrap();
                live.get(&entry.id) == Some(&entry.generation)
            };
            if !still_live {
                continue;
            }

            if mailbox.push(TimerRing { id: entry.id }).is_err() {
                tracing::warn!(id = %entry.id, "timer wheel mailbox full, dropping ring");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timer_rings_after_delay() {
        let wheel = TimerWheel::spawn(16);
        let mailbox = wheel.mailbox();
        wheel.start(TimerId::new(1), Duration::from_millis(20));

        let deadline = Instant::now() + Duration::from_secs(2);
        let mut rang = false;
        while Instant::now() < deadline {
            if let Some(ring) = mailbox.pop() {
                assert_eq!(ring.id, TimerId::new(1));
                rang = true;
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(rang, "timer never rang");
    }

    #[test]
    fn stopped_timer_does_not_ring() {
        let wheel = TimerWheel::spawn(16);
        let mailbox = wheel.mailbox();
        wheel.start(TimerId::new(2), Duration::from_millis(20));
        wheel.stop(TimerId::new(2));

        thread::sleep(Duration::from_millis(100));
        assert!(mailbox.is_empty());
    }

    #[test]
    fn restarting_a_timer_supersedes_the_old_deadline() {
        let wheel = TimerWheel::spawn(16);
        let mailbox = wheel.mailbox();
        wheel.start(TimerId::new(3), Duration::from_millis(10));
        wheel.start(TimerId::new(3), Duration::from_millis(200));

        thread::sleep(Duration::from_millis(50));
        assert!(mailbox.is_empty(), "stale deadline rang early");
    }
}
