//! Active/inactive controller tracking and Swact orchestration glue
//! (spec.md §4.4.10).
//!
//! "The controller running the core is 'this host'; only its peer ever
//! receives failure/swact orchestration actions." This tracker is the
//! single source of truth the rest of the coordinator and the FSM
//! context (`fleetmtc_fsm::FsmContext::is_active_controller`,
//! `peer_unlocked_enabled_main_insv`, `peer_enabled`) are derived from
//! each pass.

use fleetmtc_inventory::{Host, Inventory};
use fleetmtc_types::{AdminState, AvailStatus, HostName, OperState};

#[derive(Debug, Clone)]
pub struct ControllerTracker {
    self_host: HostName,
    simplex: bool,
}

impl ControllerTracker {
    pub fn new(self_host: HostName, simplex: bool) -> Self {
        Self { self_host, simplex }
    }

    pub fn self_host(&self) -> &HostName {
        &self.self_host
    }

    pub fn simplex(&self) -> bool {
        self.simplex
    }

    pub fn is_active_controller(&self, host: &HostName) -> bool {
        *host == self.self_host
    }

    /// The other controller, if this is not a simplex system and a peer
    /// record exists in inventory.
    pub fn peer<'a>(&self, inventory: &'a Inventory) -> Option<&'a Host> {
        if self.simplex {
            return None;
        }
        inventory.iter().find(|h| h.topology.node_type.controller && h.name != self.self_host)
    }

    pub fn peer_enabled(&self, inventory: &Inventory) -> bool {
        self.peer(inventory).is_some_and(|h| h.state.oper == OperState::Enabled)
    }

    /// "`unlocked-enabled-main-insv`" — the peer is fully in service, not
    /// merely enabled (e.g. could still be in a degraded availability).
    pub fn peer_unlocked_enabled_main_insv(&self, inventory: &Inventory) -> bool {
        self.peer(inventory).is_some_and(|h| {
            h.state.admin == AdminState::Unlocked
                && h.state.oper == OperState::Enabled
                && h.state.avail == AvailStatus::Available
        })
    }
}

/// A pending Swact request the coordinator hands to the per-host
/// dispatcher; tracked here so a second request can't be issued while one
/// is already in flight.
#[derive(Debug, Default)]
pub struct SwactOrchestrator {
    pending: Option<HostName>,
}

impl SwactOrchestrator {
    pub fn request(&mut self, to: HostName) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(to);
        true
    }

    pub fn pending(&self) -> Option<&HostName> {
        self.pending.as_ref()
    }

    pub fn complete(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::NodeType;
    use std::net::{IpAddr, Ipv4Addr};

    fn controller(name: &str, ip: u8) -> Host {
        Host::new(HostName::from(name), fleetmtc_types::HostUuid::generate(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, ip)), NodeType::CONTROLLER)
    }

    #[test]
    fn peer_is_the_other_controller() {
        let mut inv = Inventory::new();
        inv.add(controller("controller-0", 1)).unwrap();
        inv.add(controller("controller-1", 2)).unwrap();
        let tracker = ControllerTracker::new(HostName::from("controller-0"), false);
        assert_eq!(tracker.peer(&inv).unwrap().name, HostName::from("controller-1"));
    }

    #[test]
    fn simplex_has_no_peer() {
        let mut inv = Inventory::new();
        inv.add(controller("controller-0", 1)).unwrap();
        let tracker = ControllerTracker::new(HostName::from("controller-0"), true);
        assert!(tracker.peer(&inv).is_none());
    }

    #[test]
    fn a_second_swact_request_is_refused_while_one_is_pending() {
        let mut orch = SwactOrchestrator::default();
        assert!(orch.request(HostName::from("controller-1")));
        assert!(!orch.request(HostName::from("controller-0")));
        orch.complete();
        assert!(orch.request(HostName::from("controller-0")));
    }
}
