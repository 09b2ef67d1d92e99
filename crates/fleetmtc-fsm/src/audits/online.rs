//! Online audit (spec.md §4.4.9).
//!
//! Mirrors the offline audit for a `locked`/`powered-off` host: probes for
//! mtcAlive and requires `MTC_MTCALIVE_HITS_TO_GO_ONLINE` consecutive hits
//! before leaving `powered-off`. While waiting, periodically refreshes the
//! "host is locked" marker file on the target.

use fleetmtc_inventory::{Host, OnlineAuditStage};
use fleetmtc_types::AvailStatus;

use crate::constants::MTC_MTCALIVE_HITS_TO_GO_ONLINE;
use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, TimerSlot, WorkingCounter};
use crate::event::Event;

pub fn step(stage: OnlineAuditStage, host: &Host, ctx: &FsmContext, event: Event) -> StepResult<OnlineAuditStage> {
    use OnlineAuditStage::*;
    match stage {
        Start => start(ctx),
        SendMtcalive => send_mtcalive(ctx),
        Wait => wait(host, event),
    }
}

fn start(ctx: &FsmContext) -> StepResult<OnlineAuditStage> {
    StepResult::with(
        OnlineAuditStage::SendMtcalive,
        vec![
            Effect::SetCounter { counter: WorkingCounter::OnlineHits, value: 0 },
            Effect::ArmTimer { timer: TimerSlot::Offline, seconds: u64::from(ctx.timeouts.compute_mtcalive_timeout) },
        ],
    )
}

fn send_mtcalive(ctx: &FsmContext) -> StepResult<OnlineAuditStage> {
    StepResult::with(
        OnlineAuditStage::Wait,
        vec![
            Effect::RequestMtcAlive,
            Effect::RefreshLockedFile,
            Effect::ArmTimer { timer: TimerSlot::Offline, seconds: u64::from(ctx.timeouts.compute_mtcalive_timeout) },
        ],
    )
}

fn wait(host: &Host, event: Event) -> StepResult<OnlineAuditStage> {
    match event {
        Event::MtcAliveReceived { .. } => {
            if host.counters.online_hits + 1 >= MTC_MTCALIVE_HITS_TO_GO_ONLINE {
                StepResult::with(
                    OnlineAuditStage::SendMtcalive,
                    vec![
                        Effect::SetCounter { counter: WorkingCounter::OnlineHits, value: 0 },
                        Effect::PublishAvailStatus(AvailStatus::Online),
                    ],
                )
            } else {
                StepResult::with(
                    OnlineAuditStage::SendMtcalive,
                    vec![Effect::IncrementCounter { counter: WorkingCounter::OnlineHits }],
                )
            }
        }
        Event::TimerExpired(TimerSlot::Offline) => StepResult::with(
            OnlineAuditStage::SendMtcalive,
            vec![Effect::SetCounter { counter: WorkingCounter::OnlineHits, value: 0 }],
        ),
        _ => StepResult::to(OnlineAuditStage::Wait),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-7"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 17)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn third_consecutive_hit_brings_host_online() {
        let mut h = host();
        h.counters.online_hits = MTC_MTCALIVE_HITS_TO_GO_ONLINE - 1;
        let r = wait(&h, Event::MtcAliveReceived { uptime_secs: 5, flags: Default::default() });
        assert!(r.effects.iter().any(|e| matches!(e, Effect::PublishAvailStatus(AvailStatus::Online))));
    }

    #[test]
    fn a_miss_resets_the_hit_counter() {
        let mut h = host();
        h.counters.online_hits = 2;
        let r = wait(&h, Event::TimerExpired(TimerSlot::Offline));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::SetCounter { counter: WorkingCounter::OnlineHits, value: 0 })));
    }
}
