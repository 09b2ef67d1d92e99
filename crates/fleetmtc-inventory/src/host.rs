//! The `Host` record (spec.md §3).

use std::collections::HashMap;
use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use fleetmtc_queue::HostWorkQueue;
use fleetmtc_types::{
    AdminAction, AdminState, AlarmId, AvailStatus, DegradeMask, HostName, HostUuid, HostFlags,
    NodeType, OperState, Severity,
};

use crate::counters::HostCounters;
use crate::stages::{
    BmcActionStage, BmcAuditStage, DisableStage, EnableStage, GracefulRecoveryStage,
    OfflineAuditStage, OnlineAuditStage, ReinstallStage, SwactStage, SubfunctionEnableStage,
};
use crate::timers::HostTimers;
use crate::topology::Topology;

/// A host's full admin/oper/avail triplet, duplicated for the subfunction
/// role on combined controller+worker hosts (spec.md §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateTriplet {
    pub admin: AdminState,
    pub oper: OperState,
    pub avail: AvailStatus,
}

impl StateTriplet {
    pub const fn new(admin: AdminState, oper: OperState, avail: AvailStatus) -> Self {
        Self { admin, oper, avail }
    }
}

/// Every per-action FSM's current stage. Invariant 2 (spec.md §3): at most
/// one of these differs from its `Start` default at a time, except for
/// [`crate::stages::SubfunctionEnableStage`], which runs in parallel with
/// the main Enable FSM on combined hosts by design.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FsmStages {
    pub enable: EnableStage,
    pub graceful_recovery: GracefulRecoveryStage,
    pub disable: DisableStage,
    pub reset: BmcActionStage,
    pub power: BmcActionStage,
    pub powercycle: BmcActionStage,
    pub reinstall: ReinstallStage,
    pub swact: SwactStage,
    pub subfunction_enable: SubfunctionEnableStage,
}

impl FsmStages {
    /// Invariant 2: counts how many action FSMs (excluding the
    /// subfunction-enable side channel) are away from `Start`.
    pub fn active_count(&self) -> usize {
        [
            !self.enable.is_start(),
            !self.graceful_recovery.is_start(),
            !self.disable.is_start(),
            !self.reset.is_start(),
            !self.power.is_start(),
            !self.powercycle.is_start(),
            !self.reinstall.is_start(),
            !self.swact.is_start(),
        ]
        .into_iter()
        .filter(|active| *active)
        .count()
    }

    pub fn reset_all_to_start(&mut self) {
        *self = Self::default();
    }
}

/// The always-on audit FSMs' stage values. These run independently of
/// [`FsmStages`] and of each other — invariant 2's "one action FSM at a
/// time" rule does not apply to audits.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AuditStages {
    pub offline: OfflineAuditStage,
    pub online: OnlineAuditStage,
    pub bmc: BmcAuditStage,
}

/// A single work item's payload: an opaque command name plus a small
/// key-value argument bag, matching the generic `{cmd, hdr, buf}` UDP
/// record spec.md §6 describes.
pub type CommandPayload = HashMap<String, String>;

/// A single managed host (spec.md §3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Host {
    pub name: HostName,
    pub uuid: HostUuid,
    pub topology: Topology,

    pub state: StateTriplet,
    /// `Some` only when `topology.node_type.has_worker_subfunction()`.
    pub subf_state: Option<StateTriplet>,

    pub admin_action: AdminAction,
    pub stages: FsmStages,
    pub audit_stages: AuditStages,

    pub flags: HostFlags,
    pub degrade_mask: DegradeMask,

    pub timers: HostTimers,
    pub counters: HostCounters,

    #[serde(skip, default = "default_work_queue")]
    pub work_queue: HostWorkQueue<CommandPayload>,
    #[serde(skip, default = "default_work_queue")]
    pub node_command_queue: HostWorkQueue<CommandPayload>,

    pub alarms: HashMap<AlarmId, Severity>,
}

fn default_work_queue() -> HostWorkQueue<CommandPayload> {
    HostWorkQueue::new(32)
}

impl Host {
    pub fn new(name: HostName, uuid: HostUuid, management_ip: IpAddr, node_type: NodeType) -> Self {
        let subf_state = node_type
            .has_worker_subfunction()
            .then(|| StateTriplet::new(AdminState::Locked, OperState::Disabled, AvailStatus::Offline));

        Self {
            name,
            uuid,
            topology: Topology::new(management_ip, node_type),
            state: StateTriplet::new(AdminState::Locked, OperState::Disabled, AvailStatus::Offline),
            subf_state,
            admin_action: AdminAction::None,
            stages: FsmStages::default(),
            audit_stages: AuditStages::default(),
            flags: HostFlags::empty(),
            degrade_mask: DegradeMask::empty(),
            timers: HostTimers::unarmed(),
            counters: HostCounters::default(),
            work_queue: HostWorkQueue::new(32),
            node_command_queue: HostWorkQueue::new(32),
            alarms: HashMap::new(),
        }
    }

    /// Invariant 1: `{unlocked, enabled, not-installed}` is forbidden.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.state.admin == AdminState::Unlocked
            && self.state.oper == OperState::Enabled
            && self.state.avail == AvailStatus::NotInstalled
        {
            return Err(format!(
                "{}: forbidden triplet (unlocked, enabled, not-installed)",
                self.name
            ));
        }
        if self.stages.active_count() > 1 {
            return Err(format!(
                "{}: more than one action FSM is active simultaneously",
                self.name
            ));
        }
        Ok(())
    }

    /// `allStateChange`: publishes the full admin/oper/avail triplet.
    /// Idempotent — returns `false` (no-op) when the triplet is unchanged.
    pub fn all_state_change(&mut self, admin: AdminState, oper: OperState, avail: AvailStatus) -> bool {
        let next = StateTriplet::new(admin, oper, avail);
        if self.state.admin == next.admin && self.state.oper == next.oper && self.state.avail == next.avail {
            return false;
        }
        tracing::info!(
            host = %self.name,
            from = ?self.state,
            to = ?next,
            "host state change"
        );
        self.state = next;
        true
    }

    /// `subfStateChange`: publishes the subfunction oper/avail pair.
    pub fn subf_state_change(&mut self, oper: OperState, avail: AvailStatus) -> bool {
        let current = match self.subf_state {
            Some(s) => s,
            None => {
                tracing::warn!(host = %self.name, "subf state change on host with no subfunction");
                return false;
            }
        };
        if current.oper == oper && current.avail == avail {
            return false;
        }
        tracing::info!(host = %self.name, from = ?current, to_oper = ?oper, to_avail = ?avail, "subfunction state change");
        self.subf_state = Some(StateTriplet::new(current.admin, oper, avail));
        true
    }

    /// `availStatusChange`: availability-only change, leaving admin/oper.
    pub fn avail_status_change(&mut self, avail: AvailStatus) -> bool {
        if self.state.avail == avail {
            return false;
        }
        tracing::info!(host = %self.name, from = ?self.state.avail, to = ?avail, "availability change");
        self.state.avail = avail;
        true
    }

    /// `adminActionChange`.
    pub fn admin_action_change(&mut self, action: AdminAction) -> bool {
        if self.admin_action == action {
            return false;
        }
        tracing::info!(host = %self.name, from = ?self.admin_action, to = ?action, "admin action change");
        self.admin_action = action;
        true
    }

    /// Sets an alarm's severity on the host record. Idempotent (invariant
    /// 7 / the `alarmClear` round-trip property): setting the same
    /// `(id, severity)` twice is a single transition.
    pub fn set_alarm(&mut self, id: AlarmId, severity: Severity) -> bool {
        if self.alarms.get(&id) == Some(&severity) {
            return false;
        }
        if severity == Severity::Clear {
            self.alarms.remove(&id);
        } else {
            self.alarms.insert(id, severity);
        }
        true
    }

    pub fn clear_alarm(&mut self, id: AlarmId) -> bool {
        self.set_alarm(id, Severity::Clear)
    }

    pub fn is_active_controller_capable(&self) -> bool {
        self.topology.node_type.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn test_host() -> Host {
        Host::new(
            HostName::from("compute-0"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn forbidden_triplet_is_rejected_by_check_invariants() {
        let mut host = test_host();
        host.state = StateTriplet::new(AdminState::Unlocked, OperState::Enabled, AvailStatus::NotInstalled);
        assert!(host.check_invariants().is_err());
    }

    #[test]
    fn all_state_change_is_idempotent() {
        let mut host = test_host();
        assert!(host.all_state_change(AdminState::Unlocked, OperState::Enabled, AvailStatus::Available));
        assert!(!host.all_state_change(AdminState::Unlocked, OperState::Enabled, AvailStatus::Available));
    }

    #[test]
    fn alarm_clear_is_idempotent_after_first_clear() {
        let mut host = test_host();
        assert!(host.set_alarm(AlarmId::Enable, Severity::Critical));
        assert!(host.clear_alarm(AlarmId::Enable));
        assert!(!host.clear_alarm(AlarmId::Enable));
        assert!(!host.alarms.contains_key(&AlarmId::Enable));
    }

    #[test]
    fn active_count_flags_concurrent_action_fsms() {
        let mut host = test_host();
        assert_eq!(host.stages.active_count(), 0);
        host.stages.enable = EnableStage::GoenabledWait;
        assert_eq!(host.stages.active_count(), 1);
        host.stages.disable = DisableStage::DisServicesWait;
        assert_eq!(host.stages.active_count(), 2);
        assert!(host.check_invariants().is_err());
    }

    #[test]
    fn subf_state_change_requires_subfunction() {
        let mut worker_only = test_host();
        assert!(!worker_only.subf_state_change(OperState::Enabled, AvailStatus::Available));

        let mut combo = Host::new(
            HostName::from("controller-0"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 1)),
            NodeType::CONTROLLER_WORKER,
        );
        assert!(combo.subf_state_change(OperState::Enabled, AvailStatus::Available));
    }
}
