//! Uptime audit (spec.md §4.4.9).
//!
//! Refreshes a host's uptime in inventory every `uptime_period` while it
//! has been up less than an hour; slows to a 5-minute period afterward to
//! cut chatter on long-running fleets.

use crate::constants::{UPTIME_AUDIT_FAST_PERIOD_SECS, UPTIME_AUDIT_SLOWDOWN_AFTER_SECS, UPTIME_AUDIT_SLOW_PERIOD_SECS};
use crate::effects::{Effect, StepResult, TimerSlot};
use crate::event::Event;

pub fn run(uptime_secs: u64, event: Event) -> StepResult<()> {
    match event {
        Event::TimerExpired(TimerSlot::General) | Event::Tick => tick(uptime_secs),
        _ => StepResult::to(()),
    }
}

fn period_for(uptime_secs: u64) -> u64 {
    if uptime_secs >= UPTIME_AUDIT_SLOWDOWN_AFTER_SECS {
        UPTIME_AUDIT_SLOW_PERIOD_SECS
    } else {
        UPTIME_AUDIT_FAST_PERIOD_SECS
    }
}

fn tick(uptime_secs: u64) -> StepResult<()> {
    StepResult::with(
        (),
        vec![
            Effect::RefreshInventoryUptime(uptime_secs),
            Effect::ArmTimer { timer: TimerSlot::General, seconds: period_for(uptime_secs) },
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slows_down_after_an_hour_of_uptime() {
        assert_eq!(period_for(UPTIME_AUDIT_SLOWDOWN_AFTER_SECS - 1), UPTIME_AUDIT_FAST_PERIOD_SECS);
        assert_eq!(period_for(UPTIME_AUDIT_SLOWDOWN_AFTER_SECS), UPTIME_AUDIT_SLOW_PERIOD_SECS);
    }
}
