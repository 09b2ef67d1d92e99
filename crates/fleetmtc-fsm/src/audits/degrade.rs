//! Degrade audit (spec.md §4.4.9).
//!
//! For an `(unlocked, enabled)` host, availability is `degraded` iff the
//! degrade mask is non-empty, else `available`. This audit only reads the
//! mask — every other FSM and audit sets individual bits via
//! `Effect::SetDegradeCause`, never availability directly.

use fleetmtc_inventory::Host;
use fleetmtc_types::{AdminState, AvailStatus, OperState};

use crate::effects::{Effect, StepResult};
use crate::event::Event;

pub fn run(host: &Host, event: Event) -> StepResult<()> {
    if !matches!(event, Event::Tick) {
        return StepResult::to(());
    }
    if host.state.admin != AdminState::Unlocked || host.state.oper != OperState::Enabled {
        return StepResult::to(());
    }
    if !matches!(host.state.avail, AvailStatus::Available | AvailStatus::Degraded) {
        // Not yet settled into a steady in-service state (e.g. mid-Enable).
        return StepResult::to(());
    }

    let target = if host.degrade_mask.is_empty() { AvailStatus::Available } else { AvailStatus::Degraded };
    if host.state.avail == target {
        return StepResult::to(());
    }
    StepResult::with((), vec![Effect::PublishAvailStatus(target)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{DegradeMask, HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        let mut h = Host::new(
            HostName::from("compute-9"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)),
            NodeType::WORKER,
        );
        h.state.admin = AdminState::Unlocked;
        h.state.oper = OperState::Enabled;
        h.state.avail = AvailStatus::Available;
        h
    }

    #[test]
    fn non_empty_mask_degrades_availability() {
        let mut h = host();
        h.degrade_mask = DegradeMask::HEARTBEAT;
        let r = run(&h, Event::Tick);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Degraded))));
    }

    #[test]
    fn empty_mask_after_degrade_restores_available() {
        let mut h = host();
        h.state.avail = AvailStatus::Degraded;
        let r = run(&h, Event::Tick);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Available))));
    }

    #[test]
    fn no_change_emits_no_effect() {
        let h = host();
        let r = run(&h, Event::Tick);
        assert!(r.effects.is_empty());
    }
}
