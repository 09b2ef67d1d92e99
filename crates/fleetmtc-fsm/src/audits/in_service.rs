//! In-service test (spec.md §4.4.9).
//!
//! Runs every tick against any `(unlocked, enabled)` host: manages the
//! Enable / Compute-subfunction alarms, schedules Start-Host-Services,
//! thresholds `NOT_HEALTHY` into a forced re-enable (for any other host)
//! or a critical config alarm (for this host), manages the SM degrade
//! bit, and — for the active controller pair only — toggles
//! `ar_disabled` on peer health.

use fleetmtc_inventory::Host;
use fleetmtc_types::{AdminState, AlarmId, DegradeCause, HostFlags, OperState, Severity};

use crate::constants::IN_SERVICE_HOST_SERVICES_PERIOD_TICKS;
use crate::context::FsmContext;
use crate::effects::{Effect, StepResult, WorkingCounter};
use crate::event::Event;

pub fn run(host: &Host, ctx: &FsmContext, event: Event) -> StepResult<()> {
    if !matches!(event, Event::Tick) {
        return StepResult::to(());
    }
    if host.state.admin != AdminState::Unlocked || host.state.oper != OperState::Enabled {
        return StepResult::to(());
    }

    let mut effects = Vec::new();
    let unhealthy = host.flags.contains(HostFlags::SM_UNHEALTHY);
    let degraded_sm = host.flags.contains(HostFlags::SM_DEGRADED);

    effects.push(Effect::SetDegradeCause { cause: DegradeCause::Sm, active: degraded_sm });

    if unhealthy {
        if ctx.is_active_controller {
            // Threshold NOT_HEALTHY into a critical config alarm on self
            // rather than trying to re-enable the core this audit is
            // itself running on.
            effects.push(Effect::RaiseAlarm { id: AlarmId::Config, severity: Severity::Critical });
        } else {
            effects.push(Effect::ForceReenable);
        }
    } else {
        effects.push(Effect::ClearAlarm { id: AlarmId::Config });
    }

    if ctx.is_active_controller && host.is_active_controller_capable() {
        // Decided Open Question (c): disable auto-recovery on self only
        // while the peer controller is not itself enabled — a flapping
        // host must never be allowed to reboot-loop the last standing
        // controller.
        if ctx.peer_enabled {
            effects.push(Effect::ClearArDisabled);
        } else {
            effects.push(Effect::DisableAutoRecovery);
        }
    }

    // Scheduled Start-Host-Services (spec.md §4.4.9), suppressed during
    // the Dead-Office-Recovery window to avoid a fleet-wide stampede of
    // simultaneous host returns (spec.md §4.4.10).
    if ctx.dor_active {
        return StepResult::with((), effects);
    }
    let elapsed = host.counters.start_services_retries + 1;
    if elapsed >= IN_SERVICE_HOST_SERVICES_PERIOD_TICKS {
        effects.push(Effect::StartHostServices);
        effects.push(Effect::SetCounter { counter: WorkingCounter::StartServicesRetries, value: 0 });
    } else {
        effects.push(Effect::SetCounter { counter: WorkingCounter::StartServicesRetries, value: elapsed });
    }

    StepResult::with((), effects)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetmtc_types::{HostName, HostUuid, NodeType};
    use std::net::{IpAddr, Ipv4Addr};

    fn enabled_host(node_type: NodeType) -> Host {
        let mut h = Host::new(
            HostName::from("controller-1"),
            HostUuid::generate(),
            IpAddr::V4(Ipv4Addr::new(192, 168, 1, 19)),
            node_type,
        );
        h.state.admin = AdminState::Unlocked;
        h.state.oper = OperState::Enabled;
        h
    }

    #[test]
    fn unhealthy_non_self_host_is_forced_through_reenable() {
        let mut h = enabled_host(NodeType::WORKER);
        h.flags = HostFlags::SM_UNHEALTHY;
        let ctx = FsmContext { is_active_controller: false, ..FsmContext::test_default() };
        let r = run(&h, &ctx, Event::Tick);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::ForceReenable)));
    }

    #[test]
    fn unhealthy_self_host_raises_critical_config_alarm_instead() {
        let mut h = enabled_host(NodeType::CONTROLLER);
        h.flags = HostFlags::SM_UNHEALTHY;
        let ctx = FsmContext { is_active_controller: true, ..FsmContext::test_default() };
        let r = run(&h, &ctx, Event::Tick);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::RaiseAlarm { id: AlarmId::Config, severity: Severity::Critical })));
        assert!(!r.effects.iter().any(|e| matches!(e, Effect::ForceReenable)));
    }

    #[test]
    fn unhealthy_peer_disables_auto_recovery_on_self() {
        let h = enabled_host(NodeType::CONTROLLER);
        let ctx = FsmContext { is_active_controller: true, peer_enabled: false, ..FsmContext::test_default() };
        let r = run(&h, &ctx, Event::Tick);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::DisableAutoRecovery)));
    }

    #[test]
    fn start_host_services_fires_once_the_schedule_elapses() {
        let mut h = enabled_host(NodeType::WORKER);
        h.counters.start_services_retries = IN_SERVICE_HOST_SERVICES_PERIOD_TICKS - 1;
        let ctx = FsmContext::test_default();
        let r = run(&h, &ctx, Event::Tick);
        assert!(r.effects.iter().any(|e| matches!(e, Effect::StartHostServices)));
        assert!(r
            .effects
            .iter()
            .any(|e| matches!(e, Effect::SetCounter { counter: WorkingCounter::StartServicesRetries, value: 0 })));
    }

    #[test]
    fn start_host_services_schedule_counter_advances_otherwise() {
        let h = enabled_host(NodeType::WORKER);
        let ctx = FsmContext::test_default();
        let r = run(&h, &ctx, Event::Tick);
        assert!(!r.effects.iter().any(|e| matches!(e, Effect::StartHostServices)));
        assert!(r
            .effects
            .iter()
            .any(|e| matches!(e, Effect::SetCounter { counter: WorkingCounter::StartServicesRetries, value: 1 })));
    }

    #[test]
    fn dor_window_suppresses_start_host_services_entirely() {
        let mut h = enabled_host(NodeType::WORKER);
        h.counters.start_services_retries = IN_SERVICE_HOST_SERVICES_PERIOD_TICKS - 1;
        let ctx = FsmContext { dor_active: true, ..FsmContext::test_default() };
        let r = run(&h, &ctx, Event::Tick);
        assert!(!r.effects.iter().any(|e| matches!(e, Effect::StartHostServices)));
        assert!(!r.effects.iter().any(|e| matches!(e, Effect::SetCounter { counter: WorkingCounter::StartServicesRetries, .. })));
    }
}
