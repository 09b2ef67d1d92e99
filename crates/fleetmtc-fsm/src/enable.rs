//! Enable FSM (spec.md §4.4.1).
//!
//! `START -> HEARTBEAT_STOP_CMD -> RESET_PROGRESSION -> RESET_WAIT ->
//! INTEST_START -> MTCALIVE_PURGE -> MTCALIVE_WAIT -> GOENABLED_TIMER ->
//! GOENABLED_WAIT -> HOST_SERVICES_START -> HOST_SERVICES_WAIT ->
//! HEARTBEAT_WAIT -> HEARTBEAT_SOAK -> STATE_CHANGE -> WORKQUEUE_WAIT ->
//! ENABLED`, with a failure funnel through `FAILURE ->
//! FAILURE_SWACT_WAIT | FAILURE_WAIT -> RECOVERY_TIMER -> RECOVERY_WAIT ->
//! RESET_PROGRESSION`.

use fleetmtc_inventory::{EnableStage, Host};
use fleetmtc_queue::QueueResult;
use fleetmtc_types::{AdminAction, AdminState, AlarmId, AvailStatus, DegradeCause, OperState, Severity};

use crate::constants::*;
use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot, WorkingCounter};
use crate::event::Event;

pub fn step(stage: EnableStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<EnableStage> {
    use EnableStage::*;
    match stage {
        Start => start(host, ctx),
        HeartbeatStopCmd => heartbeat_stop_cmd(),
        ResetProgression => reset_progression(host, ctx),
        ResetWait => reset_wait(host, ctx, event),
        IntestStart => intest_start(),
        MtcalivePurge => mtcalive_purge(host, event),
        MtcaliveWait => mtcalive_wait(event),
        GoenabledTimer => goenabled_timer(ctx),
        GoenabledWait => goenabled_wait(host, event),
        HostServicesStart => host_services_start(),
        HostServicesWait => host_services_wait(host, event),
        HeartbeatWait => heartbeat_wait(event),
        HeartbeatSoak => heartbeat_soak(),
        StateChange => state_change(host),
        WorkqueueWait => workqueue_wait(event),
        Enabled => StepResult::to(Enabled),
        Failure => failure(host, ctx),
        FailureSwactWait => failure_swact_wait(event),
        FailureWait => failure_wait(event),
        RecoveryTimer => recovery_timer(),
        RecoveryWait => recovery_wait(event),
    }
}

fn start(host: &Host, ctx: &FsmContext) -> StepResult<EnableStage> {
    // "Enable is blocked while ar_disabled is set; the FSM returns to
    // START silently."
    if host.counters.ar_disabled {
        return StepResult::to(EnableStage::Start);
    }

    // Active-controller self-reboot interception of Unlock in START.
    if ctx.is_active_controller && host.admin_action == AdminAction::Unlock {
        return StepResult::with(
            EnableStage::ResetWait,
            vec![
                Effect::PublishStateChange {
                    admin: AdminState::Unlocked,
                    oper: OperState::Disabled,
                    avail: AvailStatus::Offline,
                },
                Effect::SetTask("Rebooting for self unlock".into()),
                Effect::CloseMtcAliveGate,
                Effect::RebootSelf,
            ],
        );
    }

    StepResult::with(EnableStage::HeartbeatStopCmd, vec![Effect::StopHeartbeat])
}

fn heartbeat_stop_cmd() -> StepResult<EnableStage> {
    StepResult::with(
        EnableStage::ResetProgression,
        vec![Effect::SetCounter { counter: WorkingCounter::ResetProgressionRetries, value: 0 }],
    )
}

fn reset_progression_deadline_secs(ctx: &FsmContext, retries: u32) -> u64 {
    let bmc_reset_to = u64::from(ctx.agent.bmc_reset_delay);
    (MGMNT_RESET_TIMEOUT_SECS + bmc_reset_to + 4 * ENABLE_TICK_SECS) * u64::from(retries + 1)
}

/// Nested reset-progression command: tries, in order, management-network
/// reboot, cluster-host-network reboot (if provisioned), then BMC reset
/// (if BMC accessible), up to `MAX_RESET_PROGRESSION_RETRIES` attempts.
fn reset_progression(host: &Host, ctx: &FsmContext) -> StepResult<EnableStage> {
    let retries = host.counters.reset_progression_retries;
    let deadline = reset_progression_deadline_secs(ctx, retries);

    let command = match retries {
        0 => "reboot-mgmnt",
        1 if host.topology.cluster_host_ip.is_some() => "reboot-clstr",
        _ if host.topology.bmc_provisioned => "bmc-reset",
        _ => {
            // No more legs to try; fall straight through to failure.
            return StepResult::with(
                EnableStage::Failure,
                vec![Effect::PurgeQueues, Effect::OpenMtcAliveGate],
            );
        }
    };

    StepResult::with(
        EnableStage::ResetWait,
        vec![
            Effect::EnqueueWork { command: command.into(), payload: Default::default() },
            Effect::ArmTimer { timer: TimerSlot::Command, seconds: deadline },
        ],
    )
}

fn reset_wait(host: &Host, ctx: &FsmContext, event: Event) -> StepResult<EnableStage> {
    match event {
        Event::WorkqueueResult(QueueResult::Pass) => StepResult::with(
            EnableStage::IntestStart,
            vec![Effect::StopTimer { timer: TimerSlot::Command }, Effect::OpenMtcAliveGate],
        ),
        Event::WorkqueueResult(QueueResult::Retry) => StepResult::to(EnableStage::ResetWait),
        Event::WorkqueueResult(QueueResult::Fail)
        | Event::WorkqueueResult(QueueResult::FailWorkqTimeout)
        | Event::TimerExpired(TimerSlot::Command) => {
            let retries = host.counters.reset_progression_retries;
            if retries >= MAX_RESET_PROGRESSION_RETRIES {
                StepResult::with(
                    EnableStage::Failure,
                    vec![Effect::PurgeQueues, Effect::OpenMtcAliveGate],
                )
            } else {
                StepResult::with(
                    EnableStage::ResetProgression,
                    vec![
                        Effect::PurgeQueues,
                        Effect::IncrementCounter { counter: WorkingCounter::ResetProgressionRetries },
                    ],
                )
            }
        }
        _ => StepResult::to(EnableStage::ResetWait),
    }
}

fn intest_start() -> StepResult<EnableStage> {
    StepResult::with(
        EnableStage::MtcalivePurge,
        vec![
            Effect::PublishAvailStatus(AvailStatus::InTest),
            Effect::CloseMtcAliveGate,
            Effect::SetCounter { counter: WorkingCounter::MtcAlivePurgeTicksRemaining, value: MTCALIVE_PURGE_TICKS },
        ],
    )
}

/// Discards stale liveness from before the reboot for
/// `MTCALIVE_PURGE_TICKS` ticks before reopening the gate (spec.md
/// §4.4.1).
fn mtcalive_purge(host: &Host, event: Event) -> StepResult<EnableStage> {
    if !matches!(event, Event::Tick | Event::MtcAliveReceived { .. }) {
        return StepResult::to(EnableStage::MtcalivePurge);
    }
    if host.counters.mtcalive_purge_ticks_remaining == 0 {
        return StepResult::with(
            EnableStage::MtcaliveWait,
            vec![Effect::OpenMtcAliveGate, Effect::RequestMtcAlive, Effect::ArmTimer {
                timer: TimerSlot::MtcAlive,
                seconds: 30,
            }],
        );
    }
    StepResult::with(
        EnableStage::MtcalivePurge,
        vec![Effect::IncrementCounter { counter: WorkingCounter::MtcAlivePurgeTicksRemaining }],
    )
}

fn mtcalive_wait(event: Event) -> StepResult<EnableStage> {
    match event {
        Event::MtcAliveReceived { uptime_secs, .. } => StepResult::with(
            EnableStage::GoenabledTimer,
            vec![Effect::StopTimer { timer: TimerSlot::MtcAlive }, Effect::RememberUptime(uptime_secs)],
        ),
        Event::TimerExpired(TimerSlot::MtcAlive) => StepResult::with(
            EnableStage::Failure,
            vec![Effect::PurgeQueues],
        ),
        _ => StepResult::to(EnableStage::MtcaliveWait),
    }
}

fn goenabled_timer(ctx: &FsmContext) -> StepResult<EnableStage> {
    StepResult::with(
        EnableStage::GoenabledWait,
        vec![
            Effect::SendGoenabledTest,
            Effect::ArmTimer { timer: TimerSlot::General, seconds: u64::from(ctx.timeouts.goenabled_timeout) },
        ],
    )
}

fn goenabled_wait(host: &Host, event: Event) -> StepResult<EnableStage> {
    match event {
        Event::GoenabledResult { pass: true } => {
            StepResult::with(EnableStage::HostServicesStart, vec![Effect::StopTimer { timer: TimerSlot::General }])
        }
        Event::GoenabledResult { pass: false } | Event::TimerExpired(TimerSlot::General) => StepResult::with(
            EnableStage::Failure,
            vec![
                Effect::RecordAutoRecoveryFailure(fleetmtc_inventory::AutoRecoveryCause::Goenable),
                Effect::PurgeQueues,
            ],
        ),
        _ => {
            let _ = host;
            StepResult::to(EnableStage::GoenabledWait)
        }
    }
}

fn host_services_start() -> StepResult<EnableStage> {
    StepResult::with(
        EnableStage::HostServicesWait,
        vec![Effect::StartHostServices, Effect::ArmTimer { timer: TimerSlot::HostServices, seconds: 60 }],
    )
}

fn host_services_wait(host: &Host, event: Event) -> StepResult<EnableStage> {
    match event {
        Event::HostServicesResult(QueueResult::Pass) => {
            StepResult::with(EnableStage::HeartbeatWait, vec![Effect::StopTimer { timer: TimerSlot::HostServices }])
        }
        Event::HostServicesResult(QueueResult::Fail)
        | Event::HostServicesResult(QueueResult::FailWorkqTimeout)
        | Event::TimerExpired(TimerSlot::HostServices) => StepResult::with(
            EnableStage::Failure,
            vec![
                Effect::RecordAutoRecoveryFailure(fleetmtc_inventory::AutoRecoveryCause::HostServices),
                Effect::PurgeQueues,
            ],
        ),
        _ => {
            let _ = host;
            StepResult::to(EnableStage::HostServicesWait)
        }
    }
}

fn heartbeat_wait(event: Event) -> StepResult<EnableStage> {
    match event {
        Event::Tick => StepResult::with(EnableStage::HeartbeatSoak, vec![Effect::StartHeartbeat]),
        _ => StepResult::to(EnableStage::HeartbeatWait),
    }
}

fn heartbeat_soak() -> StepResult<EnableStage> {
    StepResult::with(EnableStage::StateChange, vec![Effect::ArmTimer { timer: TimerSlot::General, seconds: 10 }])
}

fn state_change(host: &Host) -> StepResult<EnableStage> {
    let mut effects = vec![
        Effect::PublishStateChange { admin: AdminState::Unlocked, oper: OperState::Enabled, avail: AvailStatus::Available },
        Effect::ClearTask,
    ];
    if host.degrade_mask.is_empty() {
        effects.push(Effect::ClearAlarm { id: AlarmId::Enable });
    }
    StepResult::with(EnableStage::WorkqueueWait, effects)
}

fn workqueue_wait(event: Event) -> StepResult<EnableStage> {
    match event {
        Event::WorkqueueResult(QueueResult::Pass) => StepResult::to(EnableStage::Enabled),
        Event::WorkqueueResult(QueueResult::FailWorkqTimeout) => {
            StepResult::with(EnableStage::Failure, vec![Effect::PurgeQueues])
        }
        _ => StepResult::to(EnableStage::WorkqueueWait),
    }
}

/// Funnels every Enable failure. The active controller is special-cased
/// (spec.md §4.4.1 "Active-controller failure"): it is never allowed to
/// fail outright.
fn failure(host: &Host, ctx: &FsmContext) -> StepResult<EnableStage> {
    if ctx.is_active_controller {
        let mut effects = vec![
            Effect::RaiseAlarm { id: AlarmId::Enable, severity: Severity::Critical },
            Effect::PublishAvailStatus(AvailStatus::Degraded),
            Effect::ClearTask,
        ];
        if ctx.peer_unlocked_enabled_main_insv {
            effects.push(Effect::RequestSwact);
            return StepResult::with(EnableStage::FailureSwactWait, effects);
        }
        return StepResult::with(EnableStage::FailureWait, effects);
    }

    let _ = host;
    StepResult::with(
        EnableStage::FailureWait,
        vec![
            Effect::PublishStateChange { admin: host.state.admin, oper: OperState::Disabled, avail: AvailStatus::Failed },
            Effect::RaiseAlarm { id: AlarmId::Enable, severity: Severity::Major },
        ],
    )
}

fn failure_swact_wait(event: Event) -> StepResult<EnableStage> {
    match event {
        Event::HaManagerResult { .. } | Event::Tick => StepResult::with(
            EnableStage::RecoveryTimer,
            vec![Effect::ArmTimer { timer: TimerSlot::Recovery, seconds: ACTIVE_CONTROLLER_RETRY_DELAY_SECS }],
        ),
        _ => StepResult::to(EnableStage::FailureSwactWait),
    }
}

fn failure_wait(event: Event) -> StepResult<EnableStage> {
    match event {
        Event::Tick => StepResult::with(
            EnableStage::RecoveryTimer,
            vec![Effect::ArmTimer { timer: TimerSlot::Recovery, seconds: ACTIVE_CONTROLLER_RETRY_DELAY_SECS }],
        ),
        _ => StepResult::to(EnableStage::FailureWait),
    }
}

fn recovery_timer() -> StepResult<EnableStage> {
    StepResult::to(EnableStage::RecoveryWait)
}

fn recovery_wait(event: Event) -> StepResult<EnableStage> {
    match event {
        Event::TimerExpired(TimerSlot::Recovery) => StepResult::with(
            EnableStage::ResetProgression,
            vec![Effect::SetCounter { counter: WorkingCounter::ResetProgressionRetries, value: 0 }],
        ),
        _ => StepResult::to(EnableStage::RecoveryWait),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-0"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn ar_disabled_blocks_enable_silently() {
        let mut h = host();
        h.counters.ar_disabled = true;
        let ctx = FsmContext::test_default();
        let result = step(EnableStage::Start, &h, &ctx, Event::Tick);
        assert_eq!(result.next, EnableStage::Start);
        assert!(result.effects.is_empty());
    }

    #[test]
    fn active_controller_unlock_self_reboots_instead_of_normal_progression() {
        let mut h = host();
        h.admin_action = AdminAction::Unlock;
        let mut ctx = FsmContext::test_default();
        ctx.is_active_controller = true;
        let result = step(EnableStage::Start, &h, &ctx, Event::Tick);
        assert!(matches!(result.next, EnableStage::ResetWait));
        assert!(result.effects.iter().any(|e| matches!(e, Effect::RebootSelf)));
    }

    #[test]
    fn active_controller_failure_never_fails_only_degrades() {
        let h = host();
        let mut ctx = FsmContext::test_default();
        ctx.is_active_controller = true;
        ctx.peer_unlocked_enabled_main_insv = true;
        let result = step(EnableStage::Failure, &h, &ctx, Event::Tick);
        assert!(result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Degraded))));
        assert!(!result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PublishStateChange { avail: AvailStatus::Failed, .. })));
        assert!(matches!(result.next, EnableStage::FailureSwactWait));
    }

    #[test]
    fn reset_progression_tries_mgmnt_then_clstr_then_bmc() {
        let mut h = host();
        h.topology.cluster_host_ip = Some(IpAddr::V4(Ipv4Addr::new(192, 168, 2, 10)));
        h.topology.bmc_provisioned = true;
        let ctx = FsmContext::test_default();

        let r0 = reset_progression(&h, &ctx);
        assert!(matches!(r0.next, EnableStage::ResetWait));

        h.counters.reset_progression_retries = 1;
        let r1 = reset_progression(&h, &ctx);
        assert!(matches!(r1.next, EnableStage::ResetWait));

        h.counters.reset_progression_retries = 2;
        let r2 = reset_progression(&h, &ctx);
        assert!(matches!(r2.next, EnableStage::ResetWait));
    }

    #[test]
    fn mtcalive_purge_counts_down_before_reopening_gate() {
        let mut h = host();
        h.counters.mtcalive_purge_ticks_remaining = 1;
        let r = mtcalive_purge(&h, Event::Tick);
        assert!(matches!(r.next, EnableStage::MtcalivePurge));

        h.counters.mtcalive_purge_ticks_remaining = 0;
        let r = mtcalive_purge(&h, Event::Tick);
        assert!(matches!(r.next, EnableStage::MtcaliveWait));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::OpenMtcAliveGate)));
    }
}
