//! The node inventory: all managed hosts, keyed by hostname, with
//! secondary lookups by UUID, timer id, and IP (spec.md §4.3).
//!
//! Per design note §9 ("Per-host linked list with raw pointer walks...
//! Replace with a map keyed by hostname plus stable handles"): this is a
//! `HashMap<HostName, Host>`. External callers never hold a pointer into
//! it; they address hosts by [`HostName`] and look them up fresh each
//! time, addressing records by id rather than by reference.

use std::collections::HashMap;
use std::net::IpAddr;

use thiserror::Error;
use tracing::{debug, warn};

use fleetmtc_types::{HostName, HostUuid, TimerId};

use crate::host::Host;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("host {0} not found")]
    NotFound(HostName),
    #[error("host {0} already exists")]
    AlreadyExists(HostName),
}

#[derive(Default)]
pub struct Inventory {
    hosts: HashMap<HostName, Host>,
    by_uuid: HashMap<HostUuid, HostName>,
    by_ip: HashMap<IpAddr, HostName>,
    by_timer: HashMap<TimerId, HostName>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add FSM entry point: inserts a new host record. Rejects a
    /// duplicate hostname (the Add FSM re-derives state from an existing
    /// record via `get_mut` instead).
    pub fn add(&mut self, host: Host) -> Result<(), InventoryError> {
        if self.hosts.contains_key(&host.name) {
            return Err(InventoryError::AlreadyExists(host.name.clone()));
        }
        self.by_uuid.insert(host.uuid, host.name.clone());
        self.by_ip.insert(host.topology.management_ip, host.name.clone());
        if let Some(ip) = host.topology.cluster_host_ip {
            self.by_ip.insert(ip, host.name.clone());
        }
        debug!(host = %host.name, "host added to inventory");
        self.hosts.insert(host.name.clone(), host);
        Ok(())
    }

    /// Delete FSM entry point: removes a host record and every secondary
    /// index entry pointing at it. Callers are responsible for killing any
    /// in-flight BMC worker first (spec.md §3 lifecycle paragraph).
    pub fn delete(&mut self, name: &HostName) -> Result<Host, InventoryError> {
        let host = self
            .hosts
            .remove(name)
            .ok_or_else(|| InventoryError::NotFound(name.clone()))?;
        self.by_uuid.remove(&host.uuid);
        self.by_ip.remove(&host.topology.management_ip);
        if let Some(ip) = host.topology.cluster_host_ip {
            self.by_ip.remove(&ip);
        }
        for timer in self.by_timer.iter().filter_map(|(id, n)| (n == name).then_some(*id)).collect::<Vec<_>>() {
            self.by_timer.remove(&timer);
        }
        debug!(host = %name, "host removed from inventory");
        Ok(host)
    }

    pub fn get(&self, name: &HostName) -> Option<&Host> {
        self.hosts.get(name)
    }

    pub fn get_mut(&mut self, name: &HostName) -> Option<&mut Host> {
        self.hosts.get_mut(name)
    }

    pub fn get_by_uuid(&self, uuid: &HostUuid) -> Option<&Host> {
        self.by_uuid.get(uuid).and_then(|name| self.hosts.get(name))
    }

    pub fn get_by_ip(&self, ip: &IpAddr) -> Option<&Host> {
        self.by_ip.get(ip).and_then(|name| self.hosts.get(name))
    }

    pub fn get_by_timer(&self, id: TimerId) -> Option<&Host> {
        self.by_timer.get(&id).and_then(|name| self.hosts.get(name))
    }

    pub fn get_by_timer_mut(&mut self, id: TimerId) -> Option<&mut Host> {
        let name = self.by_timer.get(&id)?.clone();
        self.hosts.get_mut(&name)
    }

    /// Registers a freshly allocated `TimerId` against its owning host so
    /// the main loop's ring-drain step can resolve it in O(1).
    pub fn index_timer(&mut self, id: TimerId, owner: HostName) {
        self.by_timer.insert(id, owner);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Host> {
        self.hosts.values_mut()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &HostName> {
        self.hosts.keys()
    }

    /// `print_node_info`: a diagnostic dump of the whole inventory,
    /// one line per host, via `tracing` rather than writing straight to
    /// stdout.
    pub fn print_node_info(&self) {
        for host in self.hosts.values() {
            tracing::info!(
                host = %host.name,
                uuid = %host.uuid,
                admin = ?host.state.admin,
                oper = ?host.state.oper,
                avail = ?host.state.avail,
                action = ?host.admin_action,
                degrade_mask = ?host.degrade_mask,
                alarms = host.alarms.len(),
                "node info"
            );
        }
    }

    /// Runs [`Host::check_invariants`] against every host, logging (not
    /// panicking on) any violation — used by the audit pass and by tests.
    pub fn check_all_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for host in self.hosts.values() {
            if let Err(msg) = host.check_invariants() {
                warn!(violation = %msg, "inventory invariant violation");
                violations.push(msg);
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    use fleetmtc_types::NodeType;

    fn host(name: &str, ip: u8) -> Host {
        Host::new(
            HostName::from(name),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, ip)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn add_then_lookup_by_all_secondary_indices() {
        let mut inv = Inventory::new();
        let h = host("compute-0", 10);
        let uuid = h.uuid;
        let ip = h.topology.management_ip;
        inv.add(h).unwrap();

        assert!(inv.get(&HostName::from("compute-0")).is_some());
        assert!(inv.get_by_uuid(&uuid).is_some());
        assert!(inv.get_by_ip(&ip).is_some());
    }

    #[test]
    fn duplicate_add_is_rejected() {
        let mut inv = Inventory::new();
        inv.add(host("compute-0", 10)).unwrap();
        assert!(matches!(
            inv.add(host("compute-0", 11)),
            Err(InventoryError::AlreadyExists(_))
        ));
    }

    #[test]
    fn add_delete_add_restores_empty_queues_and_alarms() {
        let mut inv = Inventory::new();
        let name = HostName::from("compute-0");
        let mut h = host("compute-0", 10);
        h.set_alarm(fleetmtc_types::AlarmId::Enable, fleetmtc_types::Severity::Major);
        let uuid = h.uuid;
        inv.add(h).unwrap();

        inv.delete(&name).unwrap();
        assert!(inv.get(&name).is_none());
        assert!(inv.get_by_uuid(&uuid).is_none());

        inv.add(host("compute-0", 10)).unwrap();
        let restored = inv.get(&name).unwrap();
        assert!(restored.alarms.is_empty());
        assert_eq!(restored.work_queue.work_len(), 0);
    }
}
