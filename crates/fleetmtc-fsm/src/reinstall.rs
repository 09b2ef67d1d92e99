//! Reinstall FSM (spec.md §4.4.5).
//!
//! `START -> RESP_WAIT -> OFFLINE_WAIT -> ONLINE_WAIT -> MSG_DISPLAY ->
//! DONE`. A wipe-disk command is sent and expected to be acknowledged;
//! then offline, then online within `mtcalive_timeout + reinstall_timeout`.

use fleetmtc_inventory::{Host, ReinstallStage};
use fleetmtc_queue::QueueResult;
use fleetmtc_types::AvailStatus;

use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot};
use crate::event::Event;

pub fn step(stage: ReinstallStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<ReinstallStage> {
    use ReinstallStage::*;
    match stage {
        Start => start(ctx),
        RespWait => resp_wait(host, ctx, event),
        OfflineWait => offline_wait(event),
        OnlineWait => online_wait(event),
        MsgDisplay => msg_display(),
        Done => StepResult::to(Done),
    }
}

/// The shared `OFFLINE_WAIT`/`ONLINE_WAIT` deadline (spec.md §4.4.5:
/// "then offline, then online within `mtcalive_timeout +
/// reinstall_timeout`"), armed once on entry to `OFFLINE_WAIT` and
/// carried across into `ONLINE_WAIT` rather than re-armed per stage.
fn online_deadline_secs(host: &Host, ctx: &FsmContext) -> u64 {
    let mtcalive_timeout = u64::from(if host.topology.node_type.controller {
        ctx.timeouts.controller_mtcalive_timeout
    } else {
        ctx.timeouts.compute_mtcalive_timeout
    });
    mtcalive_timeout + u64::from(ctx.timeouts.node_reinstall_timeout)
}

fn start(ctx: &FsmContext) -> StepResult<ReinstallStage> {
    StepResult::with(
        ReinstallStage::RespWait,
        vec![
            Effect::EnqueueWork { command: "wipe-disk".into(), payload: Default::default() },
            Effect::ArmTimer { timer: TimerSlot::Command, seconds: u64::from(ctx.timeouts.node_reinstall_timeout) },
        ],
    )
}

fn resp_wait(host: &Host, ctx: &FsmContext, event: Event) -> StepResult<ReinstallStage> {
    match event {
        Event::WorkqueueResult(QueueResult::Pass) => StepResult::with(
            ReinstallStage::OfflineWait,
            vec![Effect::ArmTimer { timer: TimerSlot::Command, seconds: online_deadline_secs(host, ctx) }],
        ),
        Event::WorkqueueResult(QueueResult::FailWorkqTimeout) | Event::TimerExpired(TimerSlot::Command) => {
            failed_reinstall()
        }
        _ => StepResult::to(ReinstallStage::RespWait),
    }
}

fn offline_wait(event: Event) -> StepResult<ReinstallStage> {
    match event {
        Event::LinkStateChanged { up: false } => StepResult::to(ReinstallStage::OnlineWait),
        Event::TimerExpired(TimerSlot::Command) => failed_reinstall(),
        _ => StepResult::to(ReinstallStage::OfflineWait),
    }
}

fn online_wait(event: Event) -> StepResult<ReinstallStage> {
    match event {
        Event::MtcAliveReceived { .. } => {
            StepResult::with(ReinstallStage::MsgDisplay, vec![Effect::StopTimer { timer: TimerSlot::Command }])
        }
        Event::TimerExpired(TimerSlot::Command) => failed_reinstall(),
        _ => StepResult::to(ReinstallStage::OnlineWait),
    }
}

fn msg_display() -> StepResult<ReinstallStage> {
    StepResult::with(
        ReinstallStage::Done,
        vec![Effect::SetTask("Reinstall Complete".into()), Effect::PublishAvailStatus(AvailStatus::Offline)],
    )
}

fn failed_reinstall() -> StepResult<ReinstallStage> {
    StepResult::with(
        ReinstallStage::Done,
        vec![Effect::SetTask("Reinstall Failed".into()), Effect::PublishAvailStatus(AvailStatus::Failed)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("controller-0"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            NodeType::CONTROLLER,
        )
    }

    #[test]
    fn timeout_in_resp_wait_reports_reinstall_failed() {
        let h = host();
        let ctx = FsmContext::test_default();
        let r = resp_wait(&h, &ctx, Event::TimerExpired(TimerSlot::Command));
        assert!(matches!(r.next, ReinstallStage::Done));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Failed))));
    }

    #[test]
    fn passing_resp_wait_arms_the_combined_online_deadline() {
        let mut h = host();
        h.topology.node_type = NodeType::CONTROLLER;
        let ctx = FsmContext::test_default();
        let expected = online_deadline_secs(&h, &ctx);
        let r = resp_wait(&h, &ctx, Event::WorkqueueResult(QueueResult::Pass));
        assert!(matches!(r.next, ReinstallStage::OfflineWait));
        assert!(r
            .effects
            .iter()
            .any(|e| matches!(e, Effect::ArmTimer { timer: TimerSlot::Command, seconds } if *seconds == expected)));
    }

    #[test]
    fn offline_wait_timeout_reports_reinstall_failed() {
        let r = offline_wait(Event::TimerExpired(TimerSlot::Command));
        assert!(matches!(r.next, ReinstallStage::Done));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Failed))));
    }

    #[test]
    fn online_wait_timeout_reports_reinstall_failed() {
        let r = online_wait(Event::TimerExpired(TimerSlot::Command));
        assert!(matches!(r.next, ReinstallStage::Done));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Failed))));
    }
}
