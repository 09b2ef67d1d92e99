//! The effect vocabulary every FSM step function emits instead of
//! performing I/O directly.
//!
//! Per design note §9 ("Express each action FSM as a typed state value
//! plus a pure `step(state, event) -> (state, effects)` function, where
//! effects are emitted as messages for the I/O layer to perform"):
//! [`Effect`] is that closed message set, matching a decide/do split
//! between the data plane that decides and the runtime that does. The
//! main loop (`fleetmtc` facade, orchestrated by `fleetmtc-cli`) is the
//! only place these are executed.

use fleetmtc_inventory::CommandPayload;
use fleetmtc_types::{AdminAction, AdminState, AlarmId, AvailStatus, DegradeCause, OperState, Severity};

use fleetmtc_bmc::BmcCommand;

/// Names a per-host timer slot ([`fleetmtc_inventory::HostTimers`]'s
/// fields) without requiring the effect to carry a resolved [`fleetmtc_types::TimerId`] —
/// the main loop resolves the slot to the host's actual id before calling
/// into `fleetmtc-timer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSlot {
    General,
    MtcAlive,
    Offline,
    Swact,
    Config,
    Command,
    Bmc,
    BmcAccess,
    HostServices,
    Http,
    Thread,
    InServiceTest,
    OutOfServiceTest,
    Recovery,
}

/// A single effect a step function asks the main loop to perform. Step
/// functions never open sockets, start threads, or call `tracing`
/// themselves — they only decide.
#[derive(Debug, Clone)]
pub enum Effect {
    ArmTimer { timer: TimerSlot, seconds: u64 },
    ArmTimerMs { timer: TimerSlot, millis: u64 },
    StopTimer { timer: TimerSlot },

    EnqueueWork { command: String, payload: CommandPayload },
    EnqueueNodeCommand { command: String, payload: CommandPayload },
    /// Mandatory on every FSM failure path before the action restarts
    /// (spec.md §4.2 "a purge is mandatory on every FSM failure path").
    PurgeQueues,

    PublishStateChange { admin: AdminState, oper: OperState, avail: AvailStatus },
    PublishSubfStateChange { oper: OperState, avail: AvailStatus },
    PublishAvailStatus(AvailStatus),
    PublishAdminAction(AdminAction),

    RaiseAlarm { id: AlarmId, severity: Severity },
    ClearAlarm { id: AlarmId },

    SendBmcCommand(BmcCommand),

    RequestSwact,
    RequestMtcAlive,
    SendGoenabledTest,
    SendSubfGoenabledTest,
    StartHostServices,
    StartSubfHostServices,
    StartHeartbeat,
    StopHeartbeat,
    /// Active-controller self-reboot interception of Unlock in
    /// `EnableStage::Start` (spec.md §4.4.1): issues the lazy reboot
    /// command and does not return.
    RebootSelf,

    SetTask(String),
    ClearTask,

    RecordAutoRecoveryFailure(fleetmtc_inventory::AutoRecoveryCause),
    ResetAutoRecovery(fleetmtc_inventory::AutoRecoveryCause),
    ClearArDisabled,
    /// Blocks auto-recovery reboots for this controller while its peer is
    /// not itself enabled, so a flapping host never strands the pair with
    /// zero controllers in service.
    DisableAutoRecovery,

    /// Sets or clears one bit of the degrade mask directly; the degrade
    /// audit derives `availStatus` from the resulting mask, it never sets
    /// bits itself.
    SetDegradeCause { cause: DegradeCause, active: bool },
    /// Drives a host that is unlocked-enabled but reporting unhealthy back
    /// through the Enable FSM from `Start`.
    ForceReenable,

    RequestRootCredentialSignature,
    ModifyRootCredentialSignature(String),

    /// `mtcAlive_gate` control (spec.md §3 invariant 5): closed only while
    /// a deliberate reboot/reset is in progress.
    CloseMtcAliveGate,
    OpenMtcAliveGate,

    RefreshInventoryUptime(u64),
    RefreshLockedFile,
    RememberUptime(u64),

    SetCounter { counter: WorkingCounter, value: u32 },
    IncrementCounter { counter: WorkingCounter },

    PushDownstream { daemon: DownstreamDaemon, command: DownstreamOp },
    KillBmcWorker,
    UnprovisionBmc,
    ClearAllAlarms,
}

/// Mirrors `fleetmtc_clients::Downstream` without requiring this crate to
/// depend on the client crate — the main loop resolves the daemon to its
/// configured UDP address before calling into `fleetmtc-clients`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamDaemon {
    Heartbeat,
    Hwmon,
    Guest,
    LogShipper,
}

/// Mirrors `fleetmtc_clients::DownstreamCommand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamOp {
    AddHost,
    DelHost,
    StartHost,
    StopHost,
    ActiveCtrl,
}

/// Names one of [`fleetmtc_inventory::HostCounters`]'s working-counter
/// fields, so a stage-spanning tally (retries, purge ticks, probe misses)
/// can be persisted on the host record without the stage enums themselves
/// carrying any data (spec.md §9: "a typed state value").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkingCounter {
    MtcAlivePurgeTicksRemaining,
    ResetProgressionRetries,
    BmcActionRetries,
    BmcActionAttempts,
    FastEnableAttempts,
    SwactQueryRetries,
    OfflineProbeMisses,
    OnlineHits,
    BmcAlarmGraceElapsedSecs,
    StartServicesRetries,
}

/// What a `step` call returns: the FSM's next stage plus whatever it
/// wants performed. `next` is always set, even when unchanged — step
/// functions never leave a stage implicit.
#[derive(Debug, Clone)]
pub struct StepResult<S> {
    pub next: S,
    pub effects: Vec<Effect>,
}

impl<S> StepResult<S> {
    pub fn to(next: S) -> Self {
        Self { next, effects: Vec::new() }
    }

    pub fn with(next: S, effects: Vec<Effect>) -> Self {
        Self { next, effects }
    }

    pub fn and(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}
