//! Timer registry — owner index and latch state.
//!
//! The wheel only knows ids and deadlines. The registry is what lets the
//! main loop, on draining a [`TimerRing`], find out whose timer just rang
//! and flip its latch. One registry instance is shared across all timer
//! categories so a single `TimerId` namespace never collides across a
//! per-host FSM timer and, say, an inventory-level degrade-audit timer.

use std::collections::HashMap;
use std::time::Duration;

use fleetmtc_types::{HostName, TimerId};

use crate::wheel::{TimerRing, TimerWheel};
use crate::TimerError;

/// Which subsystem owns a timer, matching spec.md §4.1's timer owner
/// categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCategory {
    /// A per-host FSM stage timer (e.g. goenable, swact, work queue).
    Host,
    /// An inventory-level audit timer (degrade, uptime).
    Inventory,
    /// A worker-thread liveness timer (BMC thread).
    Thread,
    /// A recovery-action timer (hwmon reset, powercycle).
    Recovery,
}

/// A single timer's bookkeeping: who owns it, what category it's in, and
/// whether it has rung since the last time the owner checked.
#[derive(Debug, Clone)]
pub struct TimerRecord {
    pub id: TimerId,
    pub owner: HostName,
    pub category: TimerCategory,
    ring: bool,
}

impl TimerRecord {
    /// True if this timer has rung and not yet been consumed by `expired`.
    pub fn has_rung(&self) -> bool {
        self.ring
    }
}

/// Indexes every live timer by id and drives the background [`TimerWheel`].
pub struct TimerRegistry {
    wheel: TimerWheel,
    records: HashMap<TimerId, TimerRecord>,
    next_id: u64,
}

impl TimerRegistry {
    pub fn new(mailbox_capacity: usize) -> Self {
        Self {
            wheel: TimerWheel::spawn(mailbox_capacity),
            records: HashMap::new(),
            next_id: 1,
        }
    }

    /// `init`: allocates a fresh id for `owner`/`category` without arming
    /// it, separating allocation from arming so a stage can hold a timer
    /// handle before it's ready to start the clock.
    pub fn init(&mut self, owner: HostName, category: TimerCategory) -> TimerId {
        let id = TimerId::new(self.next_id);
        self.next_id += 1;
        self.records.insert(
            id,
            TimerRecord {
                id,
                owner,
                category,
                ring: false,
            },
        );
        id
    }

    /// `start`: arms `id` to ring after `secs` seconds.
    pub fn start(&mut self, id: TimerId, secs: u64) -> Result<(), TimerError> {
        self.start_ms(id, secs * 1000)
    }

    /// `start_ms`: arms `id` to ring after `millis` milliseconds.
    pub fn start_ms(&mut self, id: TimerId, millis: u64) -> Result<(), TimerError> {
        if !self.records.contains_key(&id) {
            return Err(TimerError::UnknownTimer(id));
        }
        self.wheel.start(id, Duration::from_millis(millis));
        Ok(())
    }

    /// `stop`: disarms `id`. A subsequent ring already in flight on the
    /// wheel's mailbox is ignored by generation check in the wheel itself.
    pub fn stop(&mut self, id: TimerId) -> Result<(), TimerError> {
        if !self.records.contains_key(&id) {
            return Err(TimerError::UnknownTimer(id));
        }
        self.wheel.stop(id);
        Ok(())
    }

    /// `reset`: equivalent to `stop` followed by `start`, re-using the same
    /// id and owner.
    pub fn reset(&mut self, id: TimerId, secs: u64) -> Result<(), TimerError> {
        self.stop(id)?;
        self.start(id, secs)
    }

    /// `expired`: returns and clears the ring latch for `id`. Call sites
    /// poll this once per main-loop tick for every timer they own.
    pub fn expired(&mut self, id: TimerId) -> bool {
        match self.records.get_mut(&id) {
            Some(record) if record.ring => {
                record.ring = false;
                true
            }
            _ => false,
        }
    }

    /// Drains the wheel's mailbox and sets the ring latch on every timer
    /// it names. Called once per main-loop tick before any `expired`
    /// polling.
    pub fn drain(&mut self) -> usize {
        let mailbox = self.wheel.mailbox();
        let mut drained = 0;
        while let Some(TimerRing { id }) = mailbox.pop() {
            if let Some(record) = self.records.get_mut(&id) {
                record.ring = true;
            }
            drained += 1;
        }
        drained
    }

    pub fn record(&self, id: TimerId) -> Option<&TimerRecord> {
        self.records.get(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn init_start_drain_expired_round_trip() {
        let mut registry = TimerRegistry::new(16);
        let id = registry.init(HostName::from("compute-0"), TimerCategory::Host);
        registry.start_ms(id, 20).unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut saw_expiry = false;
        while std::time::Instant::now() < deadline {
            registry.drain();
            if registry.expired(id) {
                saw_expiry = true;
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(saw_expiry);
        // consuming `expired` clears the latch
        assert!(!registry.expired(id));
    }

    #[test]
    fn unknown_timer_operations_error() {
        let mut registry = TimerRegistry::new(16);
        let bogus = TimerId::new(999);
        assert!(matches!(
            registry.start(bogus, 1),
            Err(TimerError::UnknownTimer(_))
        ));
        assert!(matches!(
            registry.stop(bogus),
            Err(TimerError::UnknownTimer(_))
        ));
    }

    #[test]
    fn stop_prevents_ring() {
        let mut registry = TimerRegistry::new(16);
        let id = registry.init(HostName::from("compute-1"), TimerCategory::Recovery);
        registry.start_ms(id, 15).unwrap();
        registry.stop(id).unwrap();

        thread::sleep(Duration::from_millis(80));
        registry.drain();
        assert!(!registry.expired(id));
    }
}
