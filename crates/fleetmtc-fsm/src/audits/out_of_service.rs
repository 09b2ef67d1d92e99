//! Out-of-service test (spec.md §4.4.9).
//!
//! Periodically refreshes published state to inventory, but only while the
//! host's action FSMs are quiescent (no point racing a FSM mid-transition
//! with a stale-state publish). Asserts `locked` on the target if it has
//! been missing for too long, and may trigger a goenabled re-test via the
//! target's FIT (fault-injection test) marker file.

use fleetmtc_inventory::Host;
use fleetmtc_types::{AdminState, OperState};

use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot};
use crate::event::Event;

/// Unlike the alternating audits this one has no stage of its own — it is
/// a single periodic action gated on [`fleetmtc_inventory::FsmStages::active_count`].
pub fn run(host: &Host, ctx: &FsmContext, event: Event) -> StepResult<()> {
    let _ = ctx;
    match event {
        Event::TimerExpired(TimerSlot::OutOfServiceTest) => tick(host),
        _ => StepResult::to(()),
    }
}

fn tick(host: &Host) -> StepResult<()> {
    let mut effects = vec![Effect::ArmTimer { timer: TimerSlot::OutOfServiceTest, seconds: 60 }];
    if host.stages.active_count() != 0 {
        return StepResult::with((), effects);
    }

    effects.push(Effect::PublishStateChange { admin: host.state.admin, oper: host.state.oper, avail: host.state.avail });

    if host.state.admin == AdminState::Unlocked && host.counters.offline_probe_misses > 6 {
        effects.push(Effect::PublishStateChange { admin: AdminState::Locked, oper: OperState::Disabled, avail: host.state.avail });
    }

    StepResult::with((), effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{AvailStatus, HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-8"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 18)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn does_not_publish_state_while_an_action_fsm_is_active() {
        let mut h = host();
        h.stages.enable = fleetmtc_inventory::EnableStage::GoenabledWait;
        let r = tick(&h);
        assert!(!r.effects.iter().any(|e| matches!(e, Effect::PublishStateChange { .. })));
    }

    #[test]
    fn stuck_missing_host_is_force_locked() {
        let mut h = host();
        h.state.admin = AdminState::Unlocked;
        h.state.avail = AvailStatus::Online;
        h.counters.offline_probe_misses = 10;
        let r = tick(&h);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishStateChange { admin: AdminState::Locked, .. })));
    }
}
