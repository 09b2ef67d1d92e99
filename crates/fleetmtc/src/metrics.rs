//! In-process metrics registry (SPEC_FULL.md §0 "Metrics", ambient
//! regardless of the Non-goals excluding an HTTP exporter surface).
//!
//! Gauges only, no push/exporter wiring, since spec.md never specifies a scrape
//! endpoint for this controller. A future inbound-HTTP addition to
//! `fleetmtc-io` would expose [`Metrics::registry`] via `prometheus::
//! TextEncoder`; until then these numbers are reachable only in-process
//! (tests, or a debugger attached to the running daemon).

use prometheus::{IntGauge, IntGaugeVec, Opts, Registry};

use fleetmtc_inventory::Inventory;

pub struct Metrics {
    registry: Registry,
    work_queue_depth: IntGaugeVec,
    alarm_count: IntGaugeVec,
    fsm_stages_active: IntGaugeVec,
    mnfa_members: IntGauge,
}

impl Metrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let work_queue_depth = IntGaugeVec::new(
            Opts::new("fleetmtc_work_queue_depth", "Pending work-queue items per host"),
            &["host"],
        )?;
        let alarm_count = IntGaugeVec::new(
            Opts::new("fleetmtc_alarm_count", "Active alarms per host"),
            &["host"],
        )?;
        let fsm_stages_active = IntGaugeVec::new(
            Opts::new("fleetmtc_fsm_stages_active", "Action FSMs away from Start per host"),
            &["host"],
        )?;
        let mnfa_members = IntGauge::new("fleetmtc_mnfa_members", "Hosts currently counted toward the MNFA window")?;

        registry.register(Box::new(work_queue_depth.clone()))?;
        registry.register(Box::new(alarm_count.clone()))?;
        registry.register(Box::new(fsm_stages_active.clone()))?;
        registry.register(Box::new(mnfa_members.clone()))?;

        Ok(Self {
            registry,
            work_queue_depth,
            alarm_count,
            fsm_stages_active,
            mnfa_members,
        })
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Refreshes every gauge from current inventory/coordinator state.
    /// Called once per tick after the FSM dispatch pass, so the numbers
    /// reflect the state the pass just settled into.
    pub fn observe(&self, inventory: &Inventory, mnfa_member_count: usize) {
        for host in inventory.iter() {
            let name = host.name.as_str();
            self.work_queue_depth.with_label_values(&[name]).set(host.work_queue.work_len() as i64);
            self.alarm_count.with_label_values(&[name]).set(host.alarms.len() as i64);
            self.fsm_stages_active.with_label_values(&[name]).set(host.stages.active_count() as i64);
        }
        self.mnfa_members.set(mnfa_member_count as i64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_inventory::Host;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn observe_reflects_work_queue_depth() {
        let metrics = Metrics::new().unwrap();
        let mut inventory = Inventory::new();
        let host = Host::new(HostName::from("compute-0"), HostUuid::generate(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, 10)), NodeType::WORKER);
        inventory.add(host).unwrap();

        metrics.observe(&inventory, 2);
        assert_eq!(metrics.mnfa_members.get(), 2);
        assert_eq!(metrics.work_queue_depth.with_label_values(&["compute-0"]).get(), 0);
    }
}
