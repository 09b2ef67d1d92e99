//! Per-action FSM stage enums.
//!
//! Each action FSM (spec.md §4.4) is represented as one of these typed
//! enums, defaulting to its `Start` stage. `fleetmtc-fsm` owns the `step`
//! functions that transition them; this crate only owns the stage value
//! itself, since it lives on the [`crate::Host`] record.

use serde::{Deserialize, Serialize};

macro_rules! stage_enum {
    ($name:ident { $($variant:ident),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        pub enum $name {
            #[default]
            Start,
            $($variant,)+
        }

        impl $name {
            pub fn is_start(self) -> bool {
                matches!(self, Self::Start)
            }
        }
    };
}

stage_enum!(EnableStage {
    HeartbeatStopCmd,
    ResetProgression,
    ResetWait,
    IntestStart,
    MtcalivePurge,
    MtcaliveWait,
    GoenabledTimer,
    GoenabledWait,
    HostServicesStart,
    HostServicesWait,
    HeartbeatWait,
    HeartbeatSoak,
    StateChange,
    WorkqueueWait,
    Enabled,
    Failure,
    FailureSwactWait,
    FailureWait,
    RecoveryTimer,
    RecoveryWait,
});

stage_enum!(GracefulRecoveryStage {
    ReqMtcalive,
    ReqMtcaliveWait,
    MtcaliveTimer,
    ResetRecvWait,
    MtcaliveWait,
    GoenabledTimer,
    GoenabledWait,
    HostServicesStart,
    HostServicesWait,
    ConfigCompleteWait,
    SubfGoenabledTimer,
    SubfGoenabledWait,
    SubfServicesStart,
    SubfServicesWait,
    HeartbeatStart,
    HeartbeatSoak,
    StateChange,
    WorkqueueWait,
    EnableStart,
    EnableWait,
});

stage_enum!(DisableStage {
    DisServicesWait,
    HandlePoweronSend,
    HandlePoweronRecv,
    HandleForceLock,
    ResetHostWait,
    TaskStateUpdate,
    WorkqueueWait,
    Disabled,
});

/// Shared by Reset, Power, and Powercycle — all three dispatch through the
/// BMC worker and reap via the same `PASS/FAIL/RETRY` contract, differing
/// only in which command they send and how many outer/inner attempts they
/// allow (tracked separately on the [`crate::Host`] counters, not here).
stage_enum!(BmcActionStage {
    Send,
    Recv,
    PingVerify,
    Holdoff,
    Soak,
    Done,
    Failed,
});

stage_enum!(ReinstallStage {
    RespWait,
    OfflineWait,
    OnlineWait,
    MsgDisplay,
    Done,
});

stage_enum!(SwactStage {
    Query,
    QueryRecv,
    Swact,
    SwactRecv,
    SwactPoll,
    Done,
});

stage_enum!(SubfunctionEnableStage {
    WaitSubfConfigured,
    GoenabledTest,
    ServicesStart,
    ServicesWait,
    HeartbeatSoak,
    Enabled,
    Failed,
});

/// Alternates `SEND_MTCALIVE`/`WAIT` ticks while probing an enabled host
/// that has gone quiet, counting consecutive misses on
/// [`crate::HostCounters::offline_probe_misses`].
stage_enum!(OfflineAuditStage { SendMtcalive, Wait });

/// Mirrors [`OfflineAuditStage`] for locked/powered-off hosts, counting
/// consecutive hits on [`crate::HostCounters::online_hits`] instead of
/// misses.
stage_enum!(OnlineAuditStage { SendMtcalive, Wait });

/// Alternates a BMC accessibility ping with a settle wait; a transition
/// from unreachable to reachable re-runs the MC-info/restart-cause/
/// power-status triplet before clearing the BMC alarm.
stage_enum!(BmcAuditStage { Ping, Wait, Verify });

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_stage_enum_defaults_to_start() {
        assert!(EnableStage::default().is_start());
        assert!(GracefulRecoveryStage::default().is_start());
        assert!(DisableStage::default().is_start());
        assert!(BmcActionStage::default().is_start());
        assert!(ReinstallStage::default().is_start());
        assert!(SwactStage::default().is_start());
        assert!(SubfunctionEnableStage::default().is_start());
        assert!(OfflineAuditStage::default().is_start());
        assert!(OnlineAuditStage::default().is_start());
        assert!(BmcAuditStage::default().is_start());
    }
}
