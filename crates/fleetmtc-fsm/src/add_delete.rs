//! Add / Delete reconciliation (spec.md §4.4.6).
//!
//! Unlike the action FSMs these are single-shot, not durable multi-tick
//! stages: bringing a host record into or out of the inventory is one
//! pure decision from the loaded/removed `Host` to the effects that bring
//! the rest of the system (alarms, downstream daemons, the BMC worker)
//! into agreement.

use fleetmtc_inventory::Host;
use fleetmtc_types::{AdminState, AlarmId, AvailStatus, OperState, Severity};

use crate::effects::{DownstreamDaemon, DownstreamOp, Effect};

/// Ingests a freshly-loaded host record.
///
/// `enable_alarm_severity` is whatever severity the inventory source (the
/// `fleetmtc-clients::InventoryClient` load response) reports for this
/// host's enable alarm; it is reconciled into the degrade mask here rather
/// than trusted blindly, since the mask is this controller's own state.
///
/// Decided Open Question: a record loaded as `(unlocked, enabled,
/// degraded)` is always overridden to `available` on ingest, even when the
/// degrade mask being reconciled is itself non-empty — the degrade audit
/// FSM runs immediately after Add on the same host and re-derives the
/// correct availability from the settled mask, so the override here never
/// produces a lasting wrong state, only a same-tick correction.
pub fn add_host(host: &Host, enable_alarm_severity: Severity) -> Vec<Effect> {
    let mut effects = vec![if enable_alarm_severity == Severity::Clear {
        Effect::ClearAlarm { id: AlarmId::Enable }
    } else {
        Effect::RaiseAlarm { id: AlarmId::Enable, severity: enable_alarm_severity }
    }];

    if host.state.admin == AdminState::Unlocked
        && host.state.oper == OperState::Enabled
        && host.state.avail == AvailStatus::Degraded
    {
        effects.push(Effect::PublishStateChange {
            admin: AdminState::Unlocked,
            oper: OperState::Enabled,
            avail: AvailStatus::Available,
        });
    }

    effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::Heartbeat, command: DownstreamOp::AddHost });
    if host.topology.bmc_provisioned {
        effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::Hwmon, command: DownstreamOp::AddHost });
    }
    if host.topology.node_type.worker {
        effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::Guest, command: DownstreamOp::AddHost });
    }
    effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::LogShipper, command: DownstreamOp::AddHost });

    effects
}

/// Tears down a host record being removed from inventory: the BMC thread
/// is killed and the BMC unprovisioned before the delete notification goes
/// out, so no in-flight BMC interaction can race the host's departure.
pub fn delete_host(host: &Host) -> Vec<Effect> {
    let mut effects = vec![Effect::KillBmcWorker, Effect::UnprovisionBmc];

    effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::Heartbeat, command: DownstreamOp::DelHost });
    if host.topology.bmc_provisioned {
        effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::Hwmon, command: DownstreamOp::DelHost });
    }
    if host.topology.node_type.worker {
        effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::Guest, command: DownstreamOp::DelHost });
    }
    effects.push(Effect::PushDownstream { daemon: DownstreamDaemon::LogShipper, command: DownstreamOp::DelHost });

    effects.push(Effect::ClearAllAlarms);
    effects
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-5"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 15)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn degraded_enabled_unlocked_load_is_overridden_to_available() {
        let mut h = host();
        h.state = fleetmtc_inventory::StateTriplet::new(AdminState::Unlocked, OperState::Enabled, AvailStatus::Degraded);
        let effects = add_host(&h, Severity::Clear);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::PublishStateChange { avail: AvailStatus::Available, .. })));
    }

    #[test]
    fn add_pushes_guest_daemon_only_for_worker_hosts() {
        let h = host();
        let effects = add_host(&h, Severity::Clear);
        assert!(effects
            .iter()
            .any(|e| matches!(e, Effect::PushDownstream { daemon: DownstreamDaemon::Guest, .. })));
    }

    #[test]
    fn delete_kills_bmc_worker_before_announcing_departure() {
        let h = host();
        let effects = delete_host(&h);
        let kill_pos = effects.iter().position(|e| matches!(e, Effect::KillBmcWorker)).unwrap();
        let del_pos = effects
            .iter()
            .position(|e| matches!(e, Effect::PushDownstream { command: DownstreamOp::DelHost, .. }))
            .unwrap();
        assert!(kill_pos < del_pos);
    }
}
