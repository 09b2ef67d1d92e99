//! The event vocabulary driving `step` calls.
//!
//! Grounded on design note §9's split between "a message arrived" and "a
//! timer fired" event classes (cited against a VSR replica's
//! `ReplicaEvent`/`TimeoutKind` split). Every
//! `step` call is driven by exactly one `Event`; `Event::Tick` is used for
//! stages that only need to re-check host state (e.g. polling a queue)
//! without a specific external trigger.

use fleetmtc_bmc::BmcStatus;
use fleetmtc_queue::QueueResult;
use fleetmtc_types::{AdminAction, HostFlags};

use crate::effects::TimerSlot;

#[derive(Debug, Clone)]
pub enum Event {
    /// A main-loop pass with nothing host-specific to report; the stage
    /// re-evaluates its own exit condition (queue drained, timer rung).
    Tick,
    TimerExpired(TimerSlot),
    MtcAliveReceived { uptime_secs: u64, flags: HostFlags },
    GoenabledResult { pass: bool },
    SubfGoenabledResult { pass: bool },
    HostServicesResult(QueueResult),
    SubfHostServicesResult(QueueResult),
    WorkqueueResult(QueueResult),
    BmcResult(BmcStatus),
    HeartbeatSoakComplete,
    HaManagerResult { success: bool, active_services: bool },
    AdminActionRequested(AdminAction),
    LinkStateChanged { up: bool },
    /// The local shadow-file bytes and inventory's recorded root-credential
    /// signature, read by the io layer for the config audit to compare.
    ConfigAuditData { local_shadow: Vec<u8>, inventory_signature: String },
}
