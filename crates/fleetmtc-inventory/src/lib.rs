//! Node inventory for the fleetmtc maintenance controller.
//!
//! Owns the set of managed [`Host`] records and every secondary index over
//! them. This crate has no FSM transition logic of its own — `fleetmtc-fsm`
//! reads and writes `Host` fields through the mutators defined here
//! (`all_state_change`, `subf_state_change`, `avail_status_change`,
//! `admin_action_change`), keeping every publish point in one place and
//! idempotent per spec.md invariant 7 and the round-trip testable
//! properties.

mod counters;
mod host;
mod inventory;
mod stages;
mod timers;
mod topology;

pub use counters::{AutoRecoveryCause, HostCounters};
pub use host::{AuditStages, CommandPayload, FsmStages, Host, StateTriplet};
pub use inventory::{Inventory, InventoryError};
pub use stages::{
    BmcActionStage, BmcAuditStage, DisableStage, EnableStage, GracefulRecoveryStage,
    OfflineAuditStage, OnlineAuditStage, ReinstallStage, SwactStage, SubfunctionEnableStage,
};
pub use timers::HostTimers;
pub use topology::Topology;
