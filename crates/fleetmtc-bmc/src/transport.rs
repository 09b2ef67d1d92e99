//! Request/response contract between the main loop and a [`crate::BmcWorker`].

use fleetmtc_types::HostName;

/// Commands the FSM engine's Reset/Power/Powercycle stages send to the
/// worker (spec.md §4.4.4, §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmcCommand {
    Reset,
    PowerOn,
    PowerOff,
    Powercycle,
    /// Accessibility ping used by the BMC audit (spec.md §4.4.9).
    Ping,
    /// MC-info / restart-cause / power-status triplet the BMC audit polls
    /// after an accessibility transition.
    InfoQuery,
}

#[derive(Debug, Clone)]
pub struct BmcRequest {
    pub host: HostName,
    pub command: BmcCommand,
}

/// Mirrors the `PASS/FAIL/RETRY` contract `bmc_command_recv` returns
/// (spec.md §4.4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BmcStatus {
    Pass,
    Fail,
    Retry,
}

#[derive(Debug, Clone)]
pub struct BmcResponse {
    pub host: HostName,
    pub command: BmcCommand,
    pub status: BmcStatus,
    /// Free-form diagnostic payload (e.g. the info-query triplet,
    /// serialized), matching the `data` field of the `{command, status,
    /// data, kill}` contract in design note §9.
    pub data: String,
}
