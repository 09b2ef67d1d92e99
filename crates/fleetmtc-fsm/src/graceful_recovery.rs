//! Graceful Recovery FSM (spec.md §4.4.2).
//!
//! Used when a previously enabled host disappears but has not been
//! declared failed. `START -> REQ_MTCALIVE -> REQ_MTCALIVE_WAIT ->
//! (MTCALIVE_TIMER -> RESET_RECV_WAIT -> MTCALIVE_WAIT) ->
//! GOENABLED_TIMER -> GOENABLED_WAIT -> HOST_SERVICES_START ->
//! HOST_SERVICES_WAIT -> (CONFIG_COMPLETE_WAIT -> SUBF_GOENABLED_TIMER ->
//! SUBF_GOENABLED_WAIT -> SUBF_SERVICES_START -> SUBF_SERVICES_WAIT ->)
//! HEARTBEAT_START -> HEARTBEAT_SOAK -> STATE_CHANGE -> WORKQUEUE_WAIT ->
//! ENABLE_START -> ENABLE_WAIT`.

use fleetmtc_inventory::{GracefulRecoveryStage, Host};
use fleetmtc_queue::QueueResult;
use fleetmtc_types::{AdminState, AlarmId, AvailStatus, HostFlags, OperState, Severity};

use crate::constants::MAX_FAST_ENABLES;
use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot, WorkingCounter};
use crate::event::Event;

/// Outcome signaled back to the dispatcher when Graceful Recovery decides
/// it must hand off to the full Enable FSM instead of continuing
/// (spec.md §4.4.2 policies).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handoff {
    None,
    /// `MAX_FAST_ENABLES` exceeded in the recovery window.
    TooManyFastAttempts,
    /// Returned uptime is larger than remembered — never rebooted.
    UptimeDidNotRegress,
    /// Host reports unhealthy or unconfigured on return.
    NotHealthyOrConfigured,
}

pub struct StepOutcome {
    pub result: StepResult<GracefulRecoveryStage>,
    pub handoff: Handoff,
}

fn plain(result: StepResult<GracefulRecoveryStage>) -> StepOutcome {
    StepOutcome { result, handoff: Handoff::None }
}

pub fn step(stage: GracefulRecoveryStage, host: &Host, ctx: &FsmContext, event: Event) -> StepOutcome {
    use GracefulRecoveryStage::*;
    match stage {
        Start => start(host),
        ReqMtcalive => req_mtcalive(),
        ReqMtcaliveWait => req_mtcalive_wait(host, event),
        MtcaliveTimer => mtcalive_timer(),
        ResetRecvWait => reset_recv_wait(event),
        MtcaliveWait => mtcalive_wait(host, event),
        GoenabledTimer => goenabled_timer(ctx),
        GoenabledWait => goenabled_wait(event),
        HostServicesStart => host_services_start(),
        HostServicesWait => host_services_wait(host, event),
        ConfigCompleteWait => config_complete_wait(host, event),
        SubfGoenabledTimer => subf_goenabled_timer(ctx),
        SubfGoenabledWait => subf_goenabled_wait(event),
        SubfServicesStart => subf_services_start(),
        SubfServicesWait => subf_services_wait(event),
        HeartbeatStart => heartbeat_start(),
        HeartbeatSoak => heartbeat_soak(),
        StateChange => state_change(host),
        WorkqueueWait => workqueue_wait(event),
        EnableStart => enable_start(),
        EnableWait => enable_wait(event),
    }
}

fn start(host: &Host) -> StepOutcome {
    if host.counters.fast_enable_attempts + 1 > MAX_FAST_ENABLES {
        return StepOutcome {
            result: StepResult::to(GracefulRecoveryStage::Start),
            handoff: Handoff::TooManyFastAttempts,
        };
    }
    plain(StepResult::with(
        GracefulRecoveryStage::ReqMtcalive,
        vec![Effect::IncrementCounter { counter: WorkingCounter::FastEnableAttempts }],
    ))
}

fn req_mtcalive() -> StepOutcome {
    plain(StepResult::with(
        GracefulRecoveryStage::ReqMtcaliveWait,
        vec![Effect::RequestMtcAlive, Effect::ArmTimer { timer: TimerSlot::MtcAlive, seconds: 12 }],
    ))
}

fn req_mtcalive_wait(host: &Host, event: Event) -> StepOutcome {
    match event {
        Event::MtcAliveReceived { uptime_secs, flags } => evaluate_mtcalive(host, uptime_secs, flags),
        Event::TimerExpired(TimerSlot::MtcAlive) => plain(StepResult::to(GracefulRecoveryStage::MtcaliveTimer)),
        _ => plain(StepResult::to(GracefulRecoveryStage::ReqMtcaliveWait)),
    }
}

fn mtcalive_timer() -> StepOutcome {
    plain(StepResult::with(
        GracefulRecoveryStage::ResetRecvWait,
        vec![Effect::EnqueueWork { command: "reboot-mgmnt".into(), payload: Default::default() }],
    ))
}

fn reset_recv_wait(event: Event) -> StepOutcome {
    match event {
        Event::WorkqueueResult(QueueResult::Pass) => plain(StepResult::with(
            GracefulRecoveryStage::MtcaliveWait,
            vec![Effect::RequestMtcAlive, Effect::ArmTimer { timer: TimerSlot::MtcAlive, seconds: 30 }],
        )),
        Event::WorkqueueResult(QueueResult::Fail) | Event::WorkqueueResult(QueueResult::FailWorkqTimeout) => {
            plain(StepResult::to(GracefulRecoveryStage::Start))
        }
        _ => plain(StepResult::to(GracefulRecoveryStage::ResetRecvWait)),
    }
}

fn mtcalive_wait(host: &Host, event: Event) -> StepOutcome {
    match event {
        Event::MtcAliveReceived { uptime_secs, flags } => evaluate_mtcalive(host, uptime_secs, flags),
        Event::TimerExpired(TimerSlot::MtcAlive) => plain(StepResult::to(GracefulRecoveryStage::Start)),
        _ => plain(StepResult::to(GracefulRecoveryStage::MtcaliveWait)),
    }
}

/// Policy checks run every time an mtcAlive arrives while waiting for the
/// host to come back (spec.md §4.4.2 "Policies").
fn evaluate_mtcalive(host: &Host, uptime_secs: u64, flags: HostFlags) -> StepOutcome {
    if uptime_secs > host.counters.remembered_uptime_secs && host.counters.remembered_uptime_secs > 0 {
        return StepOutcome {
            result: StepResult::to(GracefulRecoveryStage::Start),
            handoff: Handoff::UptimeDidNotRegress,
        };
    }
    if !flags.contains(HostFlags::I_AM_HEALTHY) || !flags.contains(HostFlags::I_AM_CONFIGURED) {
        return StepOutcome {
            result: StepResult::with(GracefulRecoveryStage::Start, vec![Effect::RaiseAlarm { id: AlarmId::Config, severity: Severity::Major }]),
            handoff: Handoff::NotHealthyOrConfigured,
        };
    }
    plain(StepResult::with(
        GracefulRecoveryStage::GoenabledTimer,
        vec![Effect::StopTimer { timer: TimerSlot::MtcAlive }, Effect::RememberUptime(uptime_secs)],
    ))
}

fn goenabled_timer(ctx: &FsmContext) -> StepOutcome {
    plain(StepResult::with(
        GracefulRecoveryStage::GoenabledWait,
        vec![
            Effect::SendGoenabledTest,
            Effect::ArmTimer { timer: TimerSlot::General, seconds: u64::from(ctx.timeouts.goenabled_timeout) },
        ],
    ))
}

fn goenabled_wait(event: Event) -> StepOutcome {
    match event {
        Event::GoenabledResult { pass: true } => plain(StepResult::with(
            GracefulRecoveryStage::HostServicesStart,
            vec![Effect::StopTimer { timer: TimerSlot::General }],
        )),
        Event::GoenabledResult { pass: false } | Event::TimerExpired(TimerSlot::General) => {
            plain(StepResult::to(GracefulRecoveryStage::Start))
        }
        _ => plain(StepResult::to(GracefulRecoveryStage::GoenabledWait)),
    }
}

fn host_services_start() -> StepOutcome {
    plain(StepResult::with(
        GracefulRecoveryStage::HostServicesWait,
        vec![Effect::StartHostServices, Effect::ArmTimer { timer: TimerSlot::HostServices, seconds: 60 }],
    ))
}

fn host_services_wait(host: &Host, event: Event) -> StepOutcome {
    match event {
        Event::HostServicesResult(QueueResult::Pass) => {
            let next = if host.topology.node_type.has_worker_subfunction() {
                GracefulRecoveryStage::ConfigCompleteWait
            } else {
                GracefulRecoveryStage::HeartbeatStart
            };
            plain(StepResult::with(next, vec![Effect::StopTimer { timer: TimerSlot::HostServices }]))
        }
        Event::HostServicesResult(QueueResult::Fail)
        | Event::HostServicesResult(QueueResult::FailWorkqTimeout)
        | Event::TimerExpired(TimerSlot::HostServices) => plain(StepResult::to(GracefulRecoveryStage::Start)),
        _ => plain(StepResult::to(GracefulRecoveryStage::HostServicesWait)),
    }
}

fn config_complete_wait(host: &Host, event: Event) -> StepOutcome {
    let _ = host;
    match event {
        Event::Tick => plain(StepResult::to(GracefulRecoveryStage::SubfGoenabledTimer)),
        _ => plain(StepResult::to(GracefulRecoveryStage::ConfigCompleteWait)),
    }
}

fn subf_goenabled_timer(ctx: &FsmContext) -> StepOutcome {
    plain(StepResult::with(
        GracefulRecoveryStage::SubfGoenabledWait,
        vec![
            Effect::SendSubfGoenabledTest,
            Effect::ArmTimer { timer: TimerSlot::General, seconds: u64::from(ctx.timeouts.goenabled_timeout) },
        ],
    ))
}

fn subf_goenabled_wait(event: Event) -> StepOutcome {
    match event {
        Event::SubfGoenabledResult { pass: true } => plain(StepResult::with(
            GracefulRecoveryStage::SubfServicesStart,
            vec![Effect::StopTimer { timer: TimerSlot::General }],
        )),
        Event::SubfGoenabledResult { pass: false } | Event::TimerExpired(TimerSlot::General) => plain(StepResult::with(
            GracefulRecoveryStage::HeartbeatStart,
            vec![Effect::PublishSubfStateChange { oper: OperState::Disabled, avail: AvailStatus::Failed }],
        )),
        _ => plain(StepResult::to(GracefulRecoveryStage::SubfGoenabledWait)),
    }
}

fn subf_services_start() -> StepOutcome {
    plain(StepResult::with(
        GracefulRecoveryStage::SubfServicesWait,
        vec![Effect::StartSubfHostServices, Effect::ArmTimer { timer: TimerSlot::HostServices, seconds: 60 }],
    ))
}

fn subf_services_wait(event: Event) -> StepOutcome {
    match event {
        Event::SubfHostServicesResult(QueueResult::Pass) => plain(StepResult::with(
            GracefulRecoveryStage::HeartbeatStart,
            vec![
                Effect::StopTimer { timer: TimerSlot::HostServices },
                Effect::PublishSubfStateChange { oper: OperState::Enabled, avail: AvailStatus::Available },
            ],
        )),
        Event::SubfHostServicesResult(QueueResult::Fail)
        | Event::SubfHostServicesResult(QueueResult::FailWorkqTimeout)
        | Event::TimerExpired(TimerSlot::HostServices) => plain(StepResult::with(
            GracefulRecoveryStage::HeartbeatStart,
            vec![Effect::PublishSubfStateChange { oper: OperState::Disabled, avail: AvailStatus::Failed }],
        )),
        _ => plain(StepResult::to(GracefulRecoveryStage::SubfServicesWait)),
    }
}

fn heartbeat_start() -> StepOutcome {
    plain(StepResult::with(GracefulRecoveryStage::HeartbeatSoak, vec![Effect::StartHeartbeat]))
}

fn heartbeat_soak() -> StepOutcome {
    plain(StepResult::with(GracefulRecoveryStage::StateChange, vec![Effect::ArmTimer { timer: TimerSlot::General, seconds: 10 }]))
}

fn state_change(host: &Host) -> StepOutcome {
    let _ = host;
    plain(StepResult::with(
        GracefulRecoveryStage::WorkqueueWait,
        vec![
            Effect::PublishStateChange { admin: AdminState::Unlocked, oper: OperState::Enabled, avail: AvailStatus::Available },
            Effect::ClearTask,
        ],
    ))
}

fn workqueue_wait(event: Event) -> StepOutcome {
    match event {
        Event::WorkqueueResult(QueueResult::Pass) => plain(StepResult::to(GracefulRecoveryStage::EnableStart)),
        Event::WorkqueueResult(QueueResult::FailWorkqTimeout) => plain(StepResult::to(GracefulRecoveryStage::Start)),
        _ => plain(StepResult::to(GracefulRecoveryStage::WorkqueueWait)),
    }
}

fn enable_start() -> StepOutcome {
    plain(StepResult::with(
        GracefulRecoveryStage::EnableWait,
        vec![Effect::IncrementCounter { counter: WorkingCounter::FastEnableAttempts }],
    ))
}

fn enable_wait(event: Event) -> StepOutcome {
    match event {
        Event::Tick => plain(StepResult::to(GracefulRecoveryStage::Start)),
        _ => plain(StepResult::to(GracefulRecoveryStage::EnableWait)),
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
    fn exceeding_max_fast_enables_signals_handoff() {
        let mut h = host();
        h.counters.fast_enable_attempts = MAX_FAST_ENABLES;
        let outcome = start(&h);
        assert_eq!(outcome.handoff, Handoff::TooManyFastAttempts);
    }

    #[test]
    fn uptime_not_regressed_forces_full_enable() {
        let mut h = host();
        h.counters.remembered_uptime_secs = 500;
        let outcome = evaluate_mtcalive(&h, 900, HostFlags::I_AM_HEALTHY | HostFlags::I_AM_CONFIGURED);
        assert_eq!(outcome.handoff, Handoff::UptimeDidNotRegress);
    }

    #[test]
    fn unhealthy_report_forces_full_enable_with_config_alarm() {
        let h = host();
        let outcome = evaluate_mtcalive(&h, 2, HostFlags::empty());
        assert_eq!(outcome.handoff, Handoff::NotHealthyOrConfigured);
        assert!(outcome
            .result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::RaiseAlarm { id: AlarmId::Config, .. })));
    }

    #[test]
    fn rebooted_host_with_smaller_uptime_proceeds_normally() {
        let mut h = host();
        h.counters.remembered_uptime_secs = 500;
        let outcome = evaluate_mtcalive(&h, 2, HostFlags::I_AM_HEALTHY | HostFlags::I_AM_CONFIGURED);
        assert_eq!(outcome.handoff, Handoff::None);
        assert!(matches!(outcome.result.next, GracefulRecoveryStage::GoenabledTimer));
    }
}
