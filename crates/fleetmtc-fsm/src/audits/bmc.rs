//! BMC audit (spec.md §4.4.9).
//!
//! Monitors BMC reachability with a periodic accessibility ping. On the
//! unreachable-to-reachable transition it re-runs the MC-info/
//! restart-cause/power-status triplet before clearing the BMC alarm; the
//! alarm itself is only raised after `BMC_ALARM_GRACE_SECS` of continuous
//! unreachability, so a brief blip never pages anyone.

use fleetmtc_bmc::BmcCommand;
use fleetmtc_inventory::{BmcAuditStage, Host};
use fleetmtc_types::{AlarmId, Severity};

use crate::constants::BMC_ALARM_GRACE_SECS;
use crate::effects::{Effect, StepResult, TimerSlot, WorkingCounter};
use crate::event::Event;

pub fn step(stage: BmcAuditStage, host: &Host, event: Event) -> StepResult<BmcAuditStage> {
    use BmcAuditStage::*;
    match stage {
        Start => start(),
        Ping => ping(),
        Wait => wait(host, event),
        Verify => verify(event),
    }
}

fn start() -> StepResult<BmcAuditStage> {
    StepResult::with(
        BmcAuditStage::Ping,
        vec![Effect::SetCounter { counter: WorkingCounter::BmcAlarmGraceElapsedSecs, value: 0 }],
    )
}

fn ping() -> StepResult<BmcAuditStage> {
    StepResult::with(
        BmcAuditStage::Wait,
        vec![Effect::SendBmcCommand(BmcCommand::Ping), Effect::ArmTimer { timer: TimerSlot::BmcAccess, seconds: 30 }],
    )
}

fn wait(host: &Host, event: Event) -> StepResult<BmcAuditStage> {
    match event {
        Event::BmcResult(fleetmtc_bmc::BmcStatus::Pass) => {
            let mut effects = vec![Effect::SetCounter { counter: WorkingCounter::BmcAlarmGraceElapsedSecs, value: 0 }];
            if host.alarms.get(&AlarmId::Bm).is_some() {
                // Reachable again after an outage: re-verify identity
                // before clearing the alarm.
                return StepResult::with(BmcAuditStage::Verify, {
                    effects.push(Effect::SendBmcCommand(BmcCommand::InfoQuery));
                    effects
                });
            }
            StepResult::with(BmcAuditStage::Ping, effects)
        }
        Event::BmcResult(fleetmtc_bmc::BmcStatus::Fail) | Event::TimerExpired(TimerSlot::BmcAccess) => {
            if host.counters.bmc_alarm_grace_elapsed_secs + 30 >= BMC_ALARM_GRACE_SECS {
                StepResult::with(
                    BmcAuditStage::Ping,
                    vec![Effect::RaiseAlarm { id: AlarmId::Bm, severity: Severity::Major }],
                )
            } else {
                StepResult::with(
                    BmcAuditStage::Ping,
                    vec![Effect::IncrementCounter { counter: WorkingCounter::BmcAlarmGraceElapsedSecs }],
                )
            }
        }
        _ => StepResult::to(BmcAuditStage::Wait),
    }
}

fn verify(event: Event) -> StepResult<BmcAuditStage> {
    match event {
        Event::BmcResult(fleetmtc_bmc::BmcStatus::Pass) => {
            StepResult::with(BmcAuditStage::Ping, vec![Effect::ClearAlarm { id: AlarmId::Bm }])
        }
        Event::BmcResult(fleetmtc_bmc::BmcStatus::Fail) => StepResult::to(BmcAuditStage::Ping),
        _ => StepResult::to(BmcAuditStage::Verify),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_bmc::BmcStatus;
    use fleetmtc_types::{HostName, HostUuid, NodeType, Severity as Sev};
    use std::net::{IpAddr, Ipv4Addr};

    fn host() -> Host {
        Host::new(
            HostName::from("compute-10"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 21)),
            NodeType::WORKER,
        )
    }

    #[test]
    fn alarm_is_not_raised_before_grace_elapses() {
        let mut h = host();
        h.counters.bmc_alarm_grace_elapsed_secs = 0;
        let r = wait(&h, Event::BmcResult(BmcStatus::Fail));
        assert!(!r.effects.iter().any(|e| matches!(e, Effect::RaiseAlarm { .. })));
    }

    #[test]
    fn alarm_raised_once_grace_elapses() {
        let mut h = host();
        h.counters.bmc_alarm_grace_elapsed_secs = BMC_ALARM_GRACE_SECS;
        let r = wait(&h, Event::BmcResult(BmcStatus::Fail));
        assert!(r.effects.iter().any(|e| matches!(e, Effect::RaiseAlarm { id: AlarmId::Bm, severity: Sev::Major })));
    }

    #[test]
    fn recovering_from_an_active_alarm_reverifies_before_clearing() {
        let mut h = host();
        h.alarms.insert(AlarmId::Bm, Sev::Major);
        let r = wait(&h, Event::BmcResult(BmcStatus::Pass));
        assert!(matches!(r.next, BmcAuditStage::Verify));
    }
}
