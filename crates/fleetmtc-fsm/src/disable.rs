//! Disable FSM (spec.md §4.4.3).
//!
//! `START -> DIS_SERVICES_WAIT -> (HANDLE_POWERON_SEND ->
//! HANDLE_POWERON_RECV ->)? HANDLE_FORCE_LOCK -> RESET_HOST_WAIT ->
//! TASK_STATE_UPDATE -> WORKQUEUE_WAIT -> DISABLED`.

use fleetmtc_inventory::{DisableStage, Host};
use fleetmtc_queue::QueueResult;
use fleetmtc_types::{AdminAction, AdminState, AlarmId, AvailStatus, OperState, Severity};

use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot};
use crate::event::Event;

pub fn step(stage: DisableStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<DisableStage> {
    use DisableStage::*;
    match stage {
        Start => start(),
        DisServicesWait => dis_services_wait(host, event),
        HandlePoweronSend => handle_poweron_send(),
        HandlePoweronRecv => handle_poweron_recv(event),
        HandleForceLock => handle_force_lock(host, ctx),
        ResetHostWait => reset_host_wait(event),
        TaskStateUpdate => task_state_update(host),
        WorkqueueWait => workqueue_wait(event),
        Disabled => StepResult::to(Disabled),
    }
}

fn start() -> StepResult<DisableStage> {
    StepResult::with(
        DisableStage::DisServicesWait,
        vec![Effect::StopHeartbeat, Effect::EnqueueWork { command: "stop-host-services".into(), payload: Default::default() }],
    )
}

fn dis_services_wait(host: &Host, event: Event) -> StepResult<DisableStage> {
    match event {
        Event::WorkqueueResult(QueueResult::Pass)
        | Event::WorkqueueResult(QueueResult::Fail)
        | Event::WorkqueueResult(QueueResult::FailWorkqTimeout) => {
            // Services are stopped best-effort; a failure here does not
            // block the lock from completing.
            if host.admin_action == AdminAction::ForceLock
                && host.state.avail != AvailStatus::Failed
                && host.state.avail != AvailStatus::PoweredOff
                && host.state.avail != AvailStatus::Offline
            {
                StepResult::to(DisableStage::HandlePoweronSend)
            } else {
                StepResult::to(DisableStage::HandleForceLock)
            }
        }
        _ => StepResult::to(DisableStage::DisServicesWait),
    }
}

fn handle_poweron_send() -> StepResult<DisableStage> {
    StepResult::with(
        DisableStage::HandlePoweronRecv,
        vec![Effect::EnqueueWork { command: "query-power-state".into(), payload: Default::default() }],
    )
}

fn handle_poweron_recv(event: Event) -> StepResult<DisableStage> {
    match event {
        Event::WorkqueueResult(_) => StepResult::to(DisableStage::HandleForceLock),
        _ => StepResult::to(DisableStage::HandlePoweronRecv),
    }
}

fn handle_force_lock(host: &Host, ctx: &FsmContext) -> StepResult<DisableStage> {
    let _ = ctx;
    if host.admin_action == AdminAction::ForceLock {
        StepResult::with(
            DisableStage::ResetHostWait,
            vec![
                Effect::EnqueueWork { command: "reset-progression".into(), payload: Default::default() },
                Effect::ArmTimer { timer: TimerSlot::General, seconds: 120 },
            ],
        )
    } else {
        StepResult::to(DisableStage::TaskStateUpdate)
    }
}

fn reset_host_wait(event: Event) -> StepResult<DisableStage> {
    match event {
        Event::WorkqueueResult(QueueResult::Pass) => {
            StepResult::with(DisableStage::TaskStateUpdate, vec![Effect::StopTimer { timer: TimerSlot::General }])
        }
        Event::TimerExpired(TimerSlot::General) | Event::WorkqueueResult(QueueResult::FailWorkqTimeout) => {
            StepResult::with(DisableStage::TaskStateUpdate, vec![Effect::PurgeQueues])
        }
        _ => StepResult::to(DisableStage::ResetHostWait),
    }
}

/// "Availability after Disable is `offline` if the host was failed/off/
/// offline, else `online`" (spec.md §4.4.3).
fn task_state_update(host: &Host) -> StepResult<DisableStage> {
    let avail = if host.admin_action == AdminAction::ForceLock || host.state.avail.is_down() {
        AvailStatus::Offline
    } else {
        AvailStatus::Online
    };
    let mut effects = vec![
        Effect::PublishStateChange { admin: AdminState::Locked, oper: OperState::Disabled, avail },
        Effect::RaiseAlarm { id: AlarmId::Lock, severity: Severity::Warning },
    ];
    if host.admin_action == AdminAction::ForceLock && avail != AvailStatus::Offline {
        // Force-Lock must wait for the host to actually report offline;
        // if it hasn't yet, loop the task update until it does.
        effects.push(Effect::SetTask("Force Locking".into()));
        return StepResult::with(DisableStage::TaskStateUpdate, effects);
    }
    StepResult::with(DisableStage::WorkqueueWait, effects)
}

fn workqueue_wait(event: Event) -> StepResult<DisableStage> {
    match event {
        Event::WorkqueueResult(QueueResult::Pass) => StepResult::to(DisableStage::Disabled),
        Event::WorkqueueResult(QueueResult::FailWorkqTimeout) => {
            StepResult::with(DisableStage::Disabled, vec![Effect::PurgeQueues])
        }
        _ => StepResult::to(DisableStage::WorkqueueWait),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-1"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 11)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn force_lock_drives_power_query_before_reset() {
        let mut h = host();
        h.admin_action = AdminAction::ForceLock;
        h.state.avail = AvailStatus::Available;
        let r = dis_services_wait(&h, Event::WorkqueueResult(QueueResult::Pass));
        assert!(matches!(r.next, DisableStage::HandlePoweronSend));
    }

    #[test]
    fn plain_lock_skips_poweron_handshake() {
        let h = host();
        let r = dis_services_wait(&h, Event::WorkqueueResult(QueueResult::Pass));
        assert!(matches!(r.next, DisableStage::HandleForceLock));
    }

    #[test]
    fn post_disable_avail_is_offline_when_already_down() {
        let mut h = host();
        h.state.avail = AvailStatus::Failed;
        let r = task_state_update(&h);
        assert!(r
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PublishStateChange { avail: AvailStatus::Offline, .. })));
    }

    #[test]
    fn post_disable_avail_is_online_when_was_up() {
        let mut h = host();
        h.state.avail = AvailStatus::Available;
        let r = task_state_update(&h);
        assert!(r
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PublishStateChange { avail: AvailStatus::Online, .. })));
    }
}
