//! Offline audit (spec.md §4.4.9).
//!
//! Alternating `SEND_MTCALIVE / WAIT` ticks for an `(unlocked, enabled)`
//! host that has gone quiet; declares the host offline once
//! `OFFLINE_PROBE_WINDOWS` consecutive windows show no mtcAlive on either
//! the management or cluster-host network.

use fleetmtc_inventory::{Host, OfflineAuditStage};
use fleetmtc_types::AvailStatus;

use crate::constants::OFFLINE_PROBE_WINDOWS;
use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot, WorkingCounter};
use crate::event::Event;

pub fn step(stage: OfflineAuditStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<OfflineAuditStage> {
    use OfflineAuditStage::*;
    match stage {
        Start => start(host, ctx),
        SendMtcalive => send_mtcalive(host, ctx),
        Wait => wait(host, event),
    }
}

fn probe_period_secs(host: &Host, ctx: &FsmContext) -> u64 {
    u64::from(if host.topology.node_type.controller {
        ctx.timeouts.controller_mtcalive_timeout
    } else {
        ctx.timeouts.compute_mtcalive_timeout
    })
}

fn start(host: &Host, ctx: &FsmContext) -> StepResult<OfflineAuditStage> {
    StepResult::with(
        OfflineAuditStage::SendMtcalive,
        vec![
            Effect::SetCounter { counter: WorkingCounter::OfflineProbeMisses, value: 0 },
            Effect::ArmTimer { timer: TimerSlot::Offline, seconds: probe_period_secs(host, ctx) },
        ],
    )
}

fn send_mtcalive(host: &Host, ctx: &FsmContext) -> StepResult<OfflineAuditStage> {
    StepResult::with(
        OfflineAuditStage::Wait,
        vec![
            Effect::RequestMtcAlive,
            Effect::ArmTimer { timer: TimerSlot::Offline, seconds: probe_period_secs(host, ctx) },
        ],
    )
}

fn wait(host: &Host, event: Event) -> StepResult<OfflineAuditStage> {
    match event {
        Event::MtcAliveReceived { .. } => StepResult::with(
            OfflineAuditStage::SendMtcalive,
            vec![Effect::SetCounter { counter: WorkingCounter::OfflineProbeMisses, value: 0 }],
        ),
        Event::TimerExpired(TimerSlot::Offline) => {
            if host.counters.offline_probe_misses + 1 >= OFFLINE_PROBE_WINDOWS {
                StepResult::with(
                    OfflineAuditStage::SendMtcalive,
                    vec![Effect::PublishAvailStatus(AvailStatus::Offline), Effect::PurgeQueues],
                )
            } else {
                StepResult::with(
                    OfflineAuditStage::SendMtcalive,
                    vec![Effect::IncrementCounter { counter: WorkingCounter::OfflineProbeMisses }],
                )
            }
        }
        _ => StepResult::to(OfflineAuditStage::Wait),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-6"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 16)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn mtcalive_arriving_resets_the_miss_counter() {
        let mut h = host();
        h.counters.offline_probe_misses = 2;
        let r = wait(&h, Event::MtcAliveReceived { uptime_secs: 10, flags: Default::default() });
        assert!(r.effects.iter().any(|e| matches!(e, Effect::SetCounter { value: 0, .. })));
    }

    #[test]
    fn three_consecutive_misses_declare_offline() {
        let mut h = host();
        h.counters.offline_probe_misses = OFFLINE_PROBE_WINDOWS - 1;
        let r = wait(&h, Event::TimerExpired(TimerSlot::Offline));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Offline))));
    }

    #[test]
    fn miss_below_threshold_just_increments() {
        let mut h = host();
        h.counters.offline_probe_misses = 0;
        let r = wait(&h, Event::TimerExpired(TimerSlot::Offline));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::IncrementCounter { counter: WorkingCounter::OfflineProbeMisses })));
    }
}
