//! Named constants the source spec calls out by name but leaves
//! unspecified in magnitude beyond "a small bounded number". Kept in one
//! place so every FSM module refers to the same values.

/// spec.md §4.4.2: "After `MAX_FAST_ENABLES` attempts in a short window,
/// fall back to the full Enable FSM."
pub const MAX_FAST_ENABLES: u32 = 3;

/// spec.md §4.4.1: "MTCALIVE_PURGE explicitly discards 20 audit ticks of
/// stale liveness before reopening the gate."
pub const MTCALIVE_PURGE_TICKS: u32 = 20;

/// spec.md §4.4.4: "On exceeding `MAX_POWERCYCLE_ATTEMPT_RETRIES`, the
/// host is left powered down with recovery blocked."
pub const MAX_POWERCYCLE_ATTEMPT_RETRIES: u32 = 3;

/// Bounded retries for a single Reset/Power BMC round trip between
/// re-verifying BMC access (spec.md §4.4.4).
pub const MAX_BMC_ACTION_RETRIES: u32 = 2;

/// spec.md §4.4.9: "requires `MTC_MTCALIVE_HITS_TO_GO_ONLINE` consecutive
/// hits to leave `powered-off`."
pub const MTC_MTCALIVE_HITS_TO_GO_ONLINE: u32 = 3;

/// spec.md §4.4.9 Offline handler: "declares offline when N consecutive
/// probe windows show no mtcAlive."
pub const OFFLINE_PROBE_WINDOWS: u32 = 3;

/// spec.md §4.4.9 BMC audit: "raises the BMC alarm after a 2-minute
/// grace."
pub const BMC_ALARM_GRACE_SECS: u32 = 120;

/// spec.md §4.4.1: "active-controller failure... retries the Enable FSM
/// after a 30-second delay."
pub const ACTIVE_CONTROLLER_RETRY_DELAY_SECS: u64 = 30;

/// spec.md §4.4.8 Swact FSM: polling cadence while waiting on the HA
/// manager.
pub const SWACT_POLL_TIMER_SECS: u64 = 5;

/// Bounded query/fail thresholds for the Swact FSM's `QUERY_RECV` stage
/// (spec.md §4.4.8: "with retry/fail thresholds").
pub const SWACT_QUERY_MAX_RETRIES: u32 = 3;

/// spec.md §4.4.10 DOR: "if controller uptime < 15 minutes, activate DOR
/// mode."
pub const DOR_UPTIME_THRESHOLD_SECS: u64 = 15 * 60;

/// spec.md §4.4.9 Uptime audit: "after 1 hour since boot, only every 5
/// minutes."
pub const UPTIME_AUDIT_FAST_PERIOD_SECS: u64 = 60;
pub const UPTIME_AUDIT_SLOW_PERIOD_SECS: u64 = 300;
pub const UPTIME_AUDIT_SLOWDOWN_AFTER_SECS: u64 = 3600;

/// Management-network reboot leg of reset progression's overall deadline
/// formula (spec.md §4.4.1): `(mgmnt_reset_to + bmc_reset_to + 4·enable_tick)
/// · (retries+1)`. `bmc_reset_to` comes from `[agent] bmc_reset_delay`.
pub const MGMNT_RESET_TIMEOUT_SECS: u64 = 60;
pub const ENABLE_TICK_SECS: u64 = 5;

/// spec.md §4.4.1: reset progression's own retry bound, independent of
/// the per-attempt BMC retry bound.
pub const MAX_RESET_PROGRESSION_RETRIES: u32 = 2;

/// spec.md §4.4.9 In-service test: "triggers Start-Host-Services when
/// scheduled" — cadence between invocations, counted in audit-pass ticks
/// the same way `MTCALIVE_PURGE_TICKS` counts ticks rather than wall
/// time.
pub const IN_SERVICE_HOST_SERVICES_PERIOD_TICKS: u32 = 600;
