//! Per-host dispatcher (spec.md §3 invariant 2, §4.4).
//!
//! Routes one `Event` to whichever action FSM is currently active on a
//! host, enforces "at most one action FSM away from `Start` at a time"
//! (subfunction-enable excepted, since it runs in parallel on combo
//! hosts), and handles Lock/Force-Lock preemption. Audits are independent
//! of all of this and always run alongside.

use fleetmtc_inventory::{AuditStages, BmcActionStage, FsmStages, Host};
use fleetmtc_types::AdminAction;

use crate::bmc_action::{self, ActionKind};
use crate::context::FsmContext;
use crate::effects::Effect;
use crate::event::Event;
use crate::graceful_recovery::{self, Handoff};
use crate::{add_delete, audits, disable, enable, reinstall, subfunction, swact};

/// Which action FSM currently owns the host, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveFsm {
    None,
    Enable,
    GracefulRecovery,
    Disable,
    Reset,
    Power,
    Powercycle,
    Reinstall,
    Swact,
}

pub fn active_fsm(stages: &FsmStages) -> ActiveFsm {
    if !stages.disable.is_start() {
        ActiveFsm::Disable
    } else if !stages.enable.is_start() {
        ActiveFsm::Enable
    } else if !stages.graceful_recovery.is_start() {
        ActiveFsm::GracefulRecovery
    } else if !stages.reset.is_start() {
        ActiveFsm::Reset
    } else if !stages.power.is_start() {
        ActiveFsm::Power
    } else if !stages.powercycle.is_start() {
        ActiveFsm::Powercycle
    } else if !stages.reinstall.is_start() {
        ActiveFsm::Reinstall
    } else if !stages.swact.is_start() {
        ActiveFsm::Swact
    } else {
        ActiveFsm::None
    }
}

pub struct DispatchResult {
    pub stages: FsmStages,
    pub audit_stages: AuditStages,
    pub effects: Vec<Effect>,
}

pub fn step(host: &Host, ctx: &FsmContext, event: Event) -> DispatchResult {
    let mut stages = host.stages;
    let mut effects = Vec::new();

    if let Event::AdminActionRequested(action) = event {
        // `host` is the last-persisted record; `Effect::PublishAdminAction`
        // below only lands on the next dispatch pass once the engine
        // applies it, but the FSM entered right here needs to see the
        // requested action on its very first step (the active-controller
        // Unlock self-reboot check in `enable::start`, the Force-Lock
        // handshake in `disable`, the Power direction in `bmc_action`).
        // Stepping against a local copy with the action already written
        // closes that same-tick gap.
        let mut acting_host = host.clone();
        acting_host.admin_action = action;
        let host = &acting_host;

        if matches!(action, AdminAction::Lock | AdminAction::ForceLock) && active_fsm(&stages) != ActiveFsm::Disable {
            stages.reset_all_to_start();
            effects.push(Effect::PurgeQueues);
            effects.push(Effect::PublishAdminAction(action));
            let r = disable::step(fleetmtc_inventory::DisableStage::Start, host, ctx, Event::Tick);
            stages.disable = r.next;
            effects.extend(r.effects);
        } else if active_fsm(&stages) == ActiveFsm::None {
            match action {
                AdminAction::Unlock | AdminAction::Enable => {
                    effects.push(Effect::PublishAdminAction(action));
                    let r = enable::step(fleetmtc_inventory::EnableStage::Start, host, ctx, Event::Tick);
                    stages.enable = r.next;
                    effects.extend(r.effects);
                }
                AdminAction::Reset => {
                    effects.push(Effect::PublishAdminAction(action));
                    let r = bmc_action::step(ActionKind::Reset, BmcActionStage::Start, host, ctx, Event::Tick);
                    stages.reset = r.next;
                    effects.extend(r.effects);
                }
                AdminAction::PowerOn | AdminAction::PowerOff => {
                    effects.push(Effect::PublishAdminAction(action));
                    let r = bmc_action::step(
                        ActionKind::Power { on: action == AdminAction::PowerOn },
                        BmcActionStage::Start,
                        host,
                        ctx,
                        Event::Tick,
                    );
                    stages.power = r.next;
                    effects.extend(r.effects);
                }
                AdminAction::Reinstall => {
                    effects.push(Effect::PublishAdminAction(action));
                    let r = reinstall::step(fleetmtc_inventory::ReinstallStage::Start, host, ctx, Event::Tick);
                    stages.reinstall = r.next;
                    effects.extend(r.effects);
                }
                AdminAction::Swact => {
                    effects.push(Effect::PublishAdminAction(action));
                    let r = swact::step(fleetmtc_inventory::SwactStage::Start, host, ctx, Event::Tick);
                    stages.swact = r.next;
                    effects.extend(r.effects);
                }
                AdminAction::Reboot => {
                    effects.push(Effect::PublishAdminAction(action));
                    let r = bmc_action::step(ActionKind::Powercycle, BmcActionStage::Start, host, ctx, Event::Tick);
                    stages.powercycle = r.next;
                    effects.extend(r.effects);
                }
                AdminAction::None | AdminAction::EnableSubf | AdminAction::Add => {}
            }
        }
    } else {
        match active_fsm(&stages) {
            ActiveFsm::Disable => {
                let r = disable::step(stages.disable, host, ctx, event.clone());
                stages.disable = r.next;
                effects.extend(r.effects);
            }
            ActiveFsm::Enable => {
                let r = enable::step(stages.enable, host, ctx, event.clone());
                stages.enable = r.next;
                effects.extend(r.effects);
            }
            ActiveFsm::GracefulRecovery => {
                let outcome = graceful_recovery::step(stages.graceful_recovery, host, ctx, event.clone());
                stages.graceful_recovery = outcome.result.next;
                effects.extend(outcome.result.effects);
                if outcome.handoff != Handoff::None {
                    stages.graceful_recovery = fleetmtc_inventory::GracefulRecoveryStage::Start;
                    let r = enable::step(fleetmtc_inventory::EnableStage::Start, host, ctx, Event::Tick);
                    stages.enable = r.next;
                    effects.extend(r.effects);
                }
            }
            ActiveFsm::Reset => {
                let r = bmc_action::step(ActionKind::Reset, stages.reset, host, ctx, event.clone());
                stages.reset = r.next;
                effects.extend(r.effects);
            }
            ActiveFsm::Power => {
                let r = bmc_action::step(ActionKind::Power { on: host.admin_action == AdminAction::PowerOn }, stages.power, host, ctx, event.clone());
                stages.power = r.next;
                effects.extend(r.effects);
            }
            ActiveFsm::Powercycle => {
                let r = bmc_action::step(ActionKind::Powercycle, stages.powercycle, host, ctx, event.clone());
                stages.powercycle = r.next;
                effects.extend(r.effects);
            }
            ActiveFsm::Reinstall => {
                let r = reinstall::step(stages.reinstall, host, ctx, event.clone());
                stages.reinstall = r.next;
                effects.extend(r.effects);
            }
            ActiveFsm::Swact => {
                let r = swact::step(stages.swact, host, ctx, event.clone());
                stages.swact = r.next;
                effects.extend(r.effects);
            }
            ActiveFsm::None => {}
        }
    }

    if !stages.subfunction_enable.is_start() || host.topology.node_type.has_worker_subfunction() {
        let r = subfunction::step(stages.subfunction_enable, host, ctx, event.clone());
        stages.subfunction_enable = r.next;
        effects.extend(r.effects);
    }

    let mut audit_stages = host.audit_stages;
    run_audits(host, ctx, event, &mut audit_stages, &mut effects);

    DispatchResult { stages, audit_stages, effects }
}

fn run_audits(host: &Host, ctx: &FsmContext, event: Event, audit_stages: &mut AuditStages, effects: &mut Vec<Effect>) {
    let r = audits::offline::step(audit_stages.offline, host, ctx, event.clone());
    audit_stages.offline = r.next;
    effects.extend(r.effects);

    let r = audits::online::step(audit_stages.online, host, ctx, event.clone());
    audit_stages.online = r.next;
    effects.extend(r.effects);

    let r = audits::bmc::step(audit_stages.bmc, host, event.clone());
    audit_stages.bmc = r.next;
    effects.extend(r.effects);

    effects.extend(audits::degrade::run(host, event.clone()).effects);
    effects.extend(audits::in_service::run(host, ctx, event.clone()).effects);
    effects.extend(audits::out_of_service::run(host, ctx, event.clone()).effects);
    effects.extend(audits::config::run(event.clone()).effects);
    effects.extend(audits::uptime::run(host.counters.remembered_uptime_secs, event).effects);
}

/// Add/Delete are not durable stages — they are resolved by the caller
/// (inventory load / admin delete) directly against [`add_delete`].
pub use add_delete::{add_host, delete_host};

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-20"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 30)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn unlock_with_no_active_fsm_starts_enable() {
        let h = host();
        let ctx = FsmContext::test_default();
        let r = step(&h, &ctx, Event::AdminActionRequested(AdminAction::Unlock));
        assert_eq!(active_fsm(&r.stages), ActiveFsm::Enable);
    }

    #[test]
    fn force_lock_preempts_an_in_progress_enable() {
        let mut h = host();
        h.stages.enable = fleetmtc_inventory::EnableStage::GoenabledWait;
        let ctx = FsmContext::test_default();
        let r = step(&h, &ctx, Event::AdminActionRequested(AdminAction::ForceLock));
        assert_eq!(active_fsm(&r.stages), ActiveFsm::Disable);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PurgeQueues)));
    }

    #[test]
    fn graceful_recovery_handoff_falls_through_to_enable() {
        let mut h = host();
        h.stages.graceful_recovery = fleetmtc_inventory::GracefulRecoveryStage::Start;
        h.counters.fast_enable_attempts = crate::constants::MAX_FAST_ENABLES;
        let ctx = FsmContext::test_default();
        let r = step(&h, &ctx, Event::Tick);
        assert_eq!(active_fsm(&r.stages), ActiveFsm::Enable);
    }
}
