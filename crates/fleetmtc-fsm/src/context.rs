//! Read-only context a step function needs beyond the host record itself.
//!
//! Grounded on spec.md §9's guidance to replace globally mutable
//! singletons (`mtcInv`, `smgrEvent`) with a value passed to every
//! function: [`FsmContext`] is that value for the FSM engine. It carries
//! fleet-level facts the coordinator (`fleetmtc-coordinator`) derives each
//! pass — simplex mode, which controller is active, peer health, MNFA/DOR
//! state — plus the merged timeout/agent configuration. No step function
//! reaches for global state; everything it needs arrives here or on the
//! `Host` it was called for.

use fleetmtc_config::{AgentConfig, TimeoutsConfig};

#[derive(Debug, Clone)]
pub struct FsmContext {
    /// True when this controller has no redundant peer (spec.md §4.4.8:
    /// "Refused in simplex mode").
    pub simplex: bool,
    /// True when the host this step is being evaluated for is the
    /// controller currently running this core.
    pub is_active_controller: bool,
    /// True when the inactive peer controller is
    /// `unlocked-enabled-main-insv` (spec.md §4.4.1 "active-controller
    /// failure" special case).
    pub peer_unlocked_enabled_main_insv: bool,
    /// True when the peer controller is itself enabled (spec.md §4.4.9
    /// "autorecovery_enabled toggling on peer health").
    pub peer_enabled: bool,
    /// True while the fleet coordinator has this host under Multi-Node
    /// Failure Avoidance (spec.md §4.4.10).
    pub mnfa_active: bool,
    /// True during the Dead-Office-Recovery window (spec.md §4.4.10):
    /// suppresses Start-Host-Services in the in-service audit.
    pub dor_active: bool,
    pub timeouts: TimeoutsConfig,
    pub agent: AgentConfig,
}

impl FsmContext {
    #[cfg(test)]
    pub fn test_default() -> Self {
        Self {
            simplex: false,
            is_active_controller: false,
            peer_unlocked_enabled_main_insv: true,
            peer_enabled: true,
            mnfa_active: false,
            dor_active: false,
            timeouts: TimeoutsConfig::default(),
            agent: AgentConfig::default(),
        }
    }
}
