//! Swact FSM (spec.md §4.4.8).
//!
//! `START -> QUERY -> QUERY_RECV (with retry/fail thresholds) -> SWACT ->
//! SWACT_RECV -> SWACT_POLL -> DONE`. Refused in simplex mode. Uses a
//! non-blocking HTTP call to the HA manager, polling at
//! `SWACT_POLL_TIMER_SECS` up to the configured swact timeout.

use fleetmtc_inventory::{Host, SwactStage};

use crate::constants::{SWACT_POLL_TIMER_SECS, SWACT_QUERY_MAX_RETRIES};
use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot, WorkingCounter};
use crate::event::Event;

pub fn step(stage: SwactStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<SwactStage> {
    use SwactStage::*;
    match stage {
        Start => start(ctx),
        Query => query(),
        QueryRecv => query_recv(host, event),
        Swact => swact(),
        SwactRecv => swact_recv(event, ctx),
        SwactPoll => swact_poll(event, ctx),
        Done => StepResult::to(Done),
    }
}

fn start(ctx: &FsmContext) -> StepResult<SwactStage> {
    if ctx.simplex {
        // Refused in simplex mode: there is no peer to swact to.
        return StepResult::with(SwactStage::Done, vec![Effect::SetTask("Swact refused: simplex system".into())]);
    }
    StepResult::with(
        SwactStage::Query,
        vec![Effect::SetCounter { counter: WorkingCounter::SwactQueryRetries, value: 0 }],
    )
}

fn query() -> StepResult<SwactStage> {
    StepResult::with(SwactStage::QueryRecv, vec![Effect::SetTask("Querying active services".into())])
}

fn query_recv(host: &Host, event: Event) -> StepResult<SwactStage> {
    match event {
        Event::HaManagerResult { success: true, .. } => StepResult::to(SwactStage::Swact),
        Event::HaManagerResult { success: false, .. } => {
            if host.counters.swact_query_retries >= SWACT_QUERY_MAX_RETRIES {
                StepResult::with(SwactStage::Done, vec![Effect::SetTask("Swact Failed: query".into())])
            } else {
                StepResult::with(
                    SwactStage::Query,
                    vec![Effect::IncrementCounter { counter: WorkingCounter::SwactQueryRetries }],
                )
            }
        }
        _ => StepResult::to(SwactStage::QueryRecv),
    }
}

fn swact() -> StepResult<SwactStage> {
    StepResult::with(
        SwactStage::SwactRecv,
        vec![Effect::RequestSwact, Effect::SetTask("Swact in progress".into())],
    )
}

fn swact_recv(event: Event, ctx: &FsmContext) -> StepResult<SwactStage> {
    match event {
        Event::HaManagerResult { .. } => StepResult::with(
            SwactStage::SwactPoll,
            vec![Effect::ArmTimer { timer: TimerSlot::Swact, seconds: SWACT_POLL_TIMER_SECS }],
        ),
        _ => {
            let _ = ctx;
            StepResult::to(SwactStage::SwactRecv)
        }
    }
}

fn swact_poll(event: Event, ctx: &FsmContext) -> StepResult<SwactStage> {
    match event {
        Event::HaManagerResult { active_services: false, .. } => StepResult::with(
            SwactStage::Done,
            vec![Effect::StopTimer { timer: TimerSlot::Swact }, Effect::SetTask("Swact Completed".into()), Effect::ClearTask],
        ),
        Event::TimerExpired(TimerSlot::Swact) => StepResult::with(
            SwactStage::SwactPoll,
            vec![Effect::ArmTimer { timer: TimerSlot::Swact, seconds: SWACT_POLL_TIMER_SECS }],
        ),
        _ => {
            let _ = ctx.timeouts.swact_timeout;
            StepResult::to(SwactStage::SwactPoll)
        }
    }
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
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 2)),
            NodeType::CONTROLLER,
        )
    }

    #[test]
    fn simplex_refuses_swact() {
        let mut ctx = FsmContext::test_default();
        ctx.simplex = true;
        let r = start(&ctx);
        assert!(matches!(r.next, SwactStage::Done));
    }

    #[test]
    fn query_retries_are_bounded_before_failing() {
        let mut h = host();
        h.counters.swact_query_retries = SWACT_QUERY_MAX_RETRIES;
        let r = query_recv(&h, Event::HaManagerResult { success: false, active_services: true });
        assert!(matches!(r.next, SwactStage::Done));
    }

    #[test]
    fn no_active_services_completes_swact() {
        let r = swact_poll(Event::HaManagerResult { success: true, active_services: false }, &FsmContext::test_default());
        assert!(matches!(r.next, SwactStage::Done));
    }
}
