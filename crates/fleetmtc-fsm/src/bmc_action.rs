//! Shared stage machinery for Reset, Power, and Powercycle (spec.md
//! §4.4.4): all three dispatch through the BMC worker and reap via the
//! same `PASS/FAIL/RETRY` contract, differing only in which command they
//! send, whether they wait for a post-action soak, and how many outer/
//! inner attempts they allow.

use fleetmtc_bmc::{BmcCommand, BmcStatus};
use fleetmtc_inventory::{BmcActionStage, Host};
use fleetmtc_types::AvailStatus;

use crate::constants::{MAX_BMC_ACTION_RETRIES, MAX_POWERCYCLE_ATTEMPT_RETRIES};
use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot, WorkingCounter};
use crate::event::Event;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Reset,
    Power { on: bool },
    Powercycle,
}

impl ActionKind {
    fn bmc_command(self) -> BmcCommand {
        match self {
            Self::Reset => BmcCommand::Reset,
            Self::Power { on: true } => BmcCommand::PowerOn,
            Self::Power { on: false } => BmcCommand::PowerOff,
            Self::Powercycle => BmcCommand::Powercycle,
        }
    }

    /// Only a power-on (standalone or as part of a powercycle) expects a
    /// post-action soak to `online`.
    fn expects_soak(self) -> bool {
        matches!(self, Self::Power { on: true } | Self::Powercycle)
    }
}

pub fn step(kind: ActionKind, stage: BmcActionStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<BmcActionStage> {
    use BmcActionStage::*;
    match stage {
        Start => start(kind),
        Send => send(kind),
        Recv => recv(kind, host, event),
        PingVerify => ping_verify(host, event),
        Holdoff => holdoff(event),
        Soak => soak(host, event),
        Done => StepResult::to(Done),
        Failed => StepResult::to(Failed),
    }
}

fn start(kind: ActionKind) -> StepResult<BmcActionStage> {
    let mut effects = vec![Effect::SetCounter { counter: WorkingCounter::BmcActionRetries, value: 0 }];
    if kind == ActionKind::Powercycle {
        effects.push(Effect::SetCounter { counter: WorkingCounter::BmcActionAttempts, value: 0 });
    }
    StepResult::with(BmcActionStage::Send, effects)
}

fn send(kind: ActionKind) -> StepResult<BmcActionStage> {
    StepResult::with(
        BmcActionStage::Recv,
        vec![Effect::SendBmcCommand(kind.bmc_command()), Effect::ArmTimer { timer: TimerSlot::Bmc, seconds: 60 }],
    )
}

fn recv(kind: ActionKind, host: &Host, event: Event) -> StepResult<BmcActionStage> {
    match event {
        Event::BmcResult(BmcStatus::Pass) => {
            let next = if kind.expects_soak() { BmcActionStage::Soak } else { BmcActionStage::Done };
            let mut effects = vec![Effect::StopTimer { timer: TimerSlot::Bmc }];
            if next == BmcActionStage::Soak {
                effects.push(Effect::ArmTimer { timer: TimerSlot::General, seconds: 120 });
            }
            StepResult::with(next, effects)
        }
        Event::BmcResult(BmcStatus::Fail) | Event::TimerExpired(TimerSlot::Bmc) => retry_or_fail(kind, host),
        _ => StepResult::to(BmcActionStage::Recv),
    }
}

fn retry_or_fail(kind: ActionKind, host: &Host) -> StepResult<BmcActionStage> {
    let retry_limit = if kind == ActionKind::Powercycle { MAX_POWERCYCLE_ATTEMPT_RETRIES } else { MAX_BMC_ACTION_RETRIES };
    if host.counters.bmc_action_retries >= retry_limit {
        if kind == ActionKind::Powercycle {
            let attempts = host.counters.bmc_action_attempts;
            if attempts + 1 >= MAX_POWERCYCLE_ATTEMPT_RETRIES {
                return StepResult::to(BmcActionStage::Failed);
            }
            return StepResult::with(
                BmcActionStage::Holdoff,
                vec![
                    Effect::IncrementCounter { counter: WorkingCounter::BmcActionAttempts },
                    Effect::SetCounter { counter: WorkingCounter::BmcActionRetries, value: 0 },
                    Effect::ArmTimer { timer: TimerSlot::Recovery, seconds: 30 },
                ],
            );
        }
        return StepResult::to(BmcActionStage::Failed);
    }
    StepResult::with(
        BmcActionStage::PingVerify,
        vec![Effect::IncrementCounter { counter: WorkingCounter::BmcActionRetries }],
    )
}

fn ping_verify(host: &Host, event: Event) -> StepResult<BmcActionStage> {
    let _ = host;
    match event {
        Event::BmcResult(BmcStatus::Pass) => StepResult::to(BmcActionStage::Send),
        Event::BmcResult(BmcStatus::Fail) => StepResult::to(BmcActionStage::Failed),
        _ => StepResult::with(BmcActionStage::PingVerify, vec![Effect::SendBmcCommand(BmcCommand::Ping)]),
    }
}

fn holdoff(event: Event) -> StepResult<BmcActionStage> {
    match event {
        Event::TimerExpired(TimerSlot::Recovery) => StepResult::to(BmcActionStage::Send),
        _ => StepResult::to(BmcActionStage::Holdoff),
    }
}

/// Post-power-on soak: expects the host to reach `online` within
/// `timeout`, else fails (spec.md §4.4.4).
fn soak(host: &Host, event: Event) -> StepResult<BmcActionStage> {
    if avail_reached_online_during_soak(host.state.avail) {
        return StepResult::to(BmcActionStage::Done);
    }
    match event {
        Event::TimerExpired(TimerSlot::General) => StepResult::to(BmcActionStage::Failed),
        _ => StepResult::to(BmcActionStage::Soak),
    }
}

pub fn avail_reached_online_during_soak(avail: AvailStatus) -> bool {
    matches!(avail, AvailStatus::Online | AvailStatus::Available)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-2"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 12)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn reset_skips_soak_power_on_does_not() {
        let h = host();
        let reset = recv(ActionKind::Reset, &h, Event::BmcResult(BmcStatus::Pass));
        assert!(matches!(reset.next, BmcActionStage::Done));

        let power_on = recv(ActionKind::Power { on: true }, &h, Event::BmcResult(BmcStatus::Pass));
        assert!(matches!(power_on.next, BmcActionStage::Soak));
    }

    #[test]
    fn powercycle_exceeding_attempts_leaves_host_failed_for_manual_intervention() {
        let mut h = host();
        h.counters.bmc_action_retries = MAX_POWERCYCLE_ATTEMPT_RETRIES;
        h.counters.bmc_action_attempts = MAX_POWERCYCLE_ATTEMPT_RETRIES - 1;
        let r = retry_or_fail(ActionKind::Powercycle, &h);
        assert!(matches!(r.next, BmcActionStage::Failed));
    }

    #[test]
    fn soak_completes_once_host_reports_online() {
        let mut h = host();
        h.state.avail = AvailStatus::Online;
        let r = soak(&h, Event::Tick);
        assert!(matches!(r.next, BmcActionStage::Done));
    }

    #[test]
    fn soak_fails_on_timeout_without_reaching_online() {
        let mut h = host();
        h.state.avail = AvailStatus::PoweredOff;
        let r = soak(&h, Event::TimerExpired(TimerSlot::General));
        assert!(matches!(r.next, BmcActionStage::Failed));
    }

    #[test]
    fn soak_keeps_waiting_on_an_unrelated_tick() {
        let mut h = host();
        h.state.avail = AvailStatus::PoweredOff;
        let r = soak(&h, Event::Tick);
        assert!(matches!(r.next, BmcActionStage::Soak));
    }

    #[test]
    fn powercycle_within_attempt_budget_holds_off_and_retries() {
        let mut h = host();
        h.counters.bmc_action_retries = MAX_POWERCYCLE_ATTEMPT_RETRIES;
        h.counters.bmc_action_attempts = 0;
        let r = retry_or_fail(ActionKind::Powercycle, &h);
        assert!(matches!(r.next, BmcActionStage::Holdoff));
    }
}
