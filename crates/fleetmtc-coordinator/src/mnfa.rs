//! Multi-Node Failure Avoidance (spec.md §4.4.10).
//!
//! When the number of hosts reporting a heartbeat failure in the same
//! window reaches `mnfa_threshold`, those hosts enter MNFA: graceful
//! recovery is deferred for them and the heartbeat rate is reduced fleet
//! wide, so a correlated event (a switch reboot, a rack power blip) isn't
//! mistaken for N independent host failures. A configurable timeout
//! bounds the window; once it elapses the fleet falls back to treating
//! each host's failure individually.

use std::collections::HashSet;

use fleetmtc_types::HostName;

#[derive(Debug, Default)]
pub struct MnfaTracker {
    threshold: u32,
    window_timeout_secs: u32,
    failing: HashSet<HostName>,
    elapsed_secs: u32,
    active: bool,
}

impl MnfaTracker {
    pub fn new(threshold: u32, window_timeout_secs: u32) -> Self {
        Self { threshold, window_timeout_secs, failing: HashSet::new(), elapsed_secs: 0, active: false }
    }

    /// Changing the threshold or timeout at runtime is logged by the
    /// caller; this just applies the new values without resetting an
    /// in-progress window.
    pub fn reconfigure(&mut self, threshold: u32, window_timeout_secs: u32) {
        self.threshold = threshold;
        self.window_timeout_secs = window_timeout_secs;
    }

    /// Records a heartbeat failure for `host`. Returns `true` the instant
    /// the fleet crosses into MNFA (a one-time edge, not a level signal).
    pub fn record_heartbeat_failure(&mut self, host: HostName) -> bool {
        let was_active = self.active;
        self.failing.insert(host);
        if !was_active && self.failing.len() as u32 >= self.threshold {
            self.active = true;
            self.elapsed_secs = 0;
            return true;
        }
        false
    }

    /// Clears one host from the failing set — e.g. its heartbeat resumed.
    /// Does not exit MNFA on its own; only the window timeout does.
    pub fn clear_host(&mut self, host: &HostName) {
        self.failing.remove(host);
    }

    /// Advances the window clock. Returns `true` the instant the window
    /// times out and the fleet falls through to per-host failure handling.
    pub fn tick(&mut self, delta_secs: u32) -> bool {
        if !self.active {
            return false;
        }
        self.elapsed_secs += delta_secs;
        if self.elapsed_secs >= self.window_timeout_secs {
            self.active = false;
            self.failing.clear();
            self.elapsed_secs = 0;
            return true;
        }
        false
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn applies_to(&self, host: &HostName) -> bool {
        self.active && self.failing.contains(host)
    }

    /// Number of hosts currently counted toward (or held inside) the
    /// window, for metrics reporting.
    pub fn active_member_count(&self) -> usize {
        self.failing.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(n: &str) -> HostName {
        HostName::from(n)
    }

    #[test]
    fn crossing_the_threshold_activates_mnfa_exactly_once() {
        let mut t = MnfaTracker::new(2, 300);
        assert!(!t.record_heartbeat_failure(h("compute-0")));
        assert!(t.record_heartbeat_failure(h("compute-1")));
        assert!(!t.record_heartbeat_failure(h("compute-2")));
        assert!(t.is_active());
    }

    #[test]
    fn window_timeout_falls_through_to_per_host_handling() {
        let mut t = MnfaTracker::new(1, 100);
        t.record_heartbeat_failure(h("compute-0"));
        assert!(!t.tick(50));
        assert!(t.tick(60));
        assert!(!t.is_active());
    }
}
