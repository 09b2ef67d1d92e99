//! Subfunction-Enable FSM (spec.md §4.4.7).
//!
//! Runs alongside the main Enable/Graceful-Recovery FSM for combo hosts
//! (`NodeType::CONTROLLER_WORKER`): `START -> WAIT_SUBF_CONFIGURED ->
//! GOENABLED_TEST -> SERVICES_START -> SERVICES_WAIT -> HEARTBEAT_SOAK ->
//! ENABLED`. Failure publishes `availStatus_subf = failed` and raises the
//! compute-function alarm, but never drags the host's main availability
//! below `degraded` when it is the only enabled controller.

use fleetmtc_inventory::{Host, SubfunctionEnableStage};
use fleetmtc_queue::QueueResult;
use fleetmtc_types::{AlarmId, AvailStatus, OperState, Severity};

use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot};
use crate::event::Event;

pub fn step(stage: SubfunctionEnableStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<SubfunctionEnableStage> {
    use SubfunctionEnableStage::*;
    match stage {
        Start => start(),
        WaitSubfConfigured => wait_subf_configured(event),
        GoenabledTest => goenabled_test(ctx),
        ServicesStart => services_start(event),
        ServicesWait => services_wait(event),
        HeartbeatSoak => heartbeat_soak(event),
        Enabled => StepResult::to(Enabled),
        Failed => StepResult::to(Failed),
    }
}

fn start() -> StepResult<SubfunctionEnableStage> {
    StepResult::to(SubfunctionEnableStage::WaitSubfConfigured)
}

fn wait_subf_configured(event: Event) -> StepResult<SubfunctionEnableStage> {
    match event {
        Event::Tick => StepResult::to(SubfunctionEnableStage::GoenabledTest),
        _ => StepResult::to(SubfunctionEnableStage::WaitSubfConfigured),
    }
}

fn goenabled_test(ctx: &FsmContext) -> StepResult<SubfunctionEnableStage> {
    StepResult::with(
        SubfunctionEnableStage::ServicesStart,
        vec![
            Effect::SendSubfGoenabledTest,
            Effect::ArmTimer { timer: TimerSlot::General, seconds: u64::from(ctx.timeouts.goenabled_timeout) },
        ],
    )
}

fn services_start(event: Event) -> StepResult<SubfunctionEnableStage> {
    match event {
        Event::SubfGoenabledResult { pass: true } => StepResult::with(
            SubfunctionEnableStage::ServicesWait,
            vec![Effect::StopTimer { timer: TimerSlot::General }, Effect::StartSubfHostServices],
        ),
        Event::SubfGoenabledResult { pass: false } | Event::TimerExpired(TimerSlot::General) => failed(),
        _ => StepResult::to(SubfunctionEnableStage::ServicesStart),
    }
}

fn services_wait(event: Event) -> StepResult<SubfunctionEnableStage> {
    match event {
        Event::SubfHostServicesResult(QueueResult::Pass) => {
            StepResult::with(SubfunctionEnableStage::HeartbeatSoak, vec![Effect::ArmTimer { timer: TimerSlot::General, seconds: 10 }])
        }
        Event::SubfHostServicesResult(QueueResult::Fail) | Event::SubfHostServicesResult(QueueResult::FailWorkqTimeout) => failed(),
        _ => StepResult::to(SubfunctionEnableStage::ServicesWait),
    }
}

fn heartbeat_soak(event: Event) -> StepResult<SubfunctionEnableStage> {
    match event {
        Event::TimerExpired(TimerSlot::General) => StepResult::with(
            SubfunctionEnableStage::Enabled,
            vec![Effect::PublishSubfStateChange { oper: OperState::Enabled, avail: AvailStatus::Available }, Effect::ClearAlarm { id: AlarmId::ComboHostComputeFailure }],
        ),
        _ => StepResult::to(SubfunctionEnableStage::HeartbeatSoak),
    }
}

/// A subfunction failure never drags the host's *main* availability down;
/// only the subfunction triplet reports failed, alongside a dedicated
/// compute-function alarm (spec.md §4.4.7).
fn failed() -> StepResult<SubfunctionEnableStage> {
    StepResult::with(
        SubfunctionEnableStage::Failed,
        vec![
            Effect::PublishSubfStateChange { oper: OperState::Disabled, avail: AvailStatus::Failed },
            Effect::RaiseAlarm { id: AlarmId::ComboHostComputeFailure, severity: Severity::Major },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn combo_host() -> Host {
        Host::new(
            HostName::from("controller-0"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 3)),
            NodeType::CONTROLLER_WORKER,
        )
    }

    #[test]
    fn subf_goenabled_failure_raises_compute_alarm_without_failing_main_avail() {
        let _h = combo_host();
        let r = services_start(Event::SubfGoenabledResult { pass: false });
        assert!(matches!(r.next, SubfunctionEnableStage::Failed));
        assert!(r
            .effects
            .iter()
            .any(|e| matches!(e, Effect::RaiseAlarm { id: AlarmId::ComboHostComputeFailure, .. })));
        assert!(r
            .effects
            .iter()
            .any(|e| matches!(e, Effect::PublishSubfStateChange { avail: AvailStatus::Failed, .. })));
    }

    #[test]
    fn heartbeat_soak_completes_into_enabled() {
        let r = heartbeat_soak(Event::TimerExpired(TimerSlot::General));
        assert!(matches!(r.next, SubfunctionEnableStage::Enabled));
    }
}
