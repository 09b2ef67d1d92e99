//! Per-host counters (spec.md §3 "Counters").

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The five auto-recovery causes spec.md §6 enumerates
/// (`ar_<cause>_threshold`/`ar_<cause>_interval`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AutoRecoveryCause {
    Config,
    Goenable,
    HostServices,
    Heartbeat,
    Luks,
}

impl AutoRecoveryCause {
    pub const ALL: [Self; 5] = [
        Self::Config,
        Self::Goenable,
        Self::HostServices,
        Self::Heartbeat,
        Self::Luks,
    ];
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostCounters {
    pub enable_count: u32,
    pub graceful_recovery_count: u32,
    pub health_threshold_counter: u32,
    pub http_retries: u32,
    pub start_services_retries: u32,
    /// Per-interface heartbeat failure flags (interface name -> failed).
    pub heartbeat_failure: HashMap<String, bool>,
    /// Per-cause auto-recovery failure counts, compared against the
    /// configured threshold in `fleetmtc-config::AgentConfig::auto_recovery`.
    pub auto_recovery_count: HashMap<AutoRecoveryCause, u32>,

    /// Working counters the FSM engine (`fleetmtc-fsm`) persists across
    /// ticks for stages that span more than one pass. These live here
    /// rather than on the stage enums themselves so the stage types stay
    /// simple C-like enums (spec.md §9's "typed state value").
    pub mtcalive_purge_ticks_remaining: u32,
    pub reset_progression_retries: u32,
    pub bmc_action_retries: u32,
    pub bmc_action_attempts: u32,
    pub fast_enable_attempts: u32,
    pub remembered_uptime_secs: u64,
    pub bmc_alarm_grace_elapsed_secs: u32,
    pub offline_probe_misses: u32,
    pub online_hits: u32,
    pub swact_query_retries: u32,
    /// Set once a cause's auto-recovery count exceeds its configured
    /// threshold (spec.md §4.4.1 "Enable is blocked while `ar_disabled` is
    /// set"); cleared by an operator-initiated Unlock.
    pub ar_disabled: bool,
}

impl HostCounters {
    pub fn record_auto_recovery_failure(&mut self, cause: AutoRecoveryCause) -> u32 {
        let count = self.auto_recovery_count.entry(cause).or_insert(0);
        *count += 1;
        *count
    }

    pub fn reset_auto_recovery(&mut self, cause: AutoRecoveryCause) {
        self.auto_recovery_count.insert(cause, 0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_recovery_counts_accumulate_per_cause() {
        let mut counters = HostCounters::default();
        counters.record_auto_recovery_failure(AutoRecoveryCause::Heartbeat);
        let count = counters.record_auto_recovery_failure(AutoRecoveryCause::Heartbeat);
        assert_eq!(count, 2);
        assert_eq!(
            counters.auto_recovery_count.get(&AutoRecoveryCause::Config),
            None
        );
    }

    #[test]
    fn reset_zeroes_a_single_cause() {
        let mut counters = HostCounters::default();
        counters.record_auto_recovery_failure(AutoRecoveryCause::Luks);
        counters.reset_auto_recovery(AutoRecoveryCause::Luks);
        assert_eq!(
            counters.auto_recovery_count.get(&AutoRecoveryCause::Luks),
            Some(&0)
        );
    }
}
