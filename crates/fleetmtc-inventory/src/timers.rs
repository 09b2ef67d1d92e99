//! Per-host timer handle bundle.
//!
//! Holds the [`fleetmtc_types::TimerId`] handles a host's various FSMs and
//! audits arm, stop, and poll through the shared
//! [`fleetmtc_timer::TimerRegistry`]. The handles themselves are allocated
//! once at Add time via `TimerRegistry::init` and live for the record's
//! lifetime.

use serde::{Deserialize, Serialize};

use fleetmtc_types::TimerId;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HostTimers {
    pub general: TimerId,
    pub mtcalive: TimerId,
    pub offline: TimerId,
    pub swact: TimerId,
    pub config: TimerId,
    pub command: TimerId,
    pub bmc: TimerId,
    pub bmc_access: TimerId,
    pub host_services: TimerId,
    pub http: TimerId,
    pub thread: TimerId,
    pub in_service_test: TimerId,
    pub out_of_service_test: TimerId,
    pub recovery: TimerId,
}

impl HostTimers {
    /// All fields `TimerId::INVALID` — used before the inventory has
    /// called `TimerRegistry::init` for this host's handles.
    pub fn unarmed() -> Self {
        Self {
            general: TimerId::INVALID,
            mtcalive: TimerId::INVALID,
            offline: TimerId::INVALID,
            swact: TimerId::INVALID,
            config: TimerId::INVALID,
            command: TimerId::INVALID,
            bmc: TimerId::INVALID,
            bmc_access: TimerId::INVALID,
            host_services: TimerId::INVALID,
            http: TimerId::INVALID,
            thread: TimerId::INVALID,
            in_service_test: TimerId::INVALID,
            out_of_service_test: TimerId::INVALID,
            recovery: TimerId::INVALID,
        }
    }
}

impl Default for HostTimers {
    fn default() -> Self {
        Self::unarmed()
    }
}
