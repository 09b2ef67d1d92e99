//! The host state triplet, the action enum, and host topology/type tags.
//!
//! Grounded on spec.md §3: `adminState`, `operState`, `availStatus`,
//! `adminAction`, node type and BMC type.

use serde::{Deserialize, Serialize};

/// Administrative state. Operator-controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminState {
    Locked,
    Unlocked,
}

/// Operational state. Derived by the FSM engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperState {
    Enabled,
    Disabled,
}

/// Availability status. Derived by the FSM engine and audits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvailStatus {
    Available,
    Degraded,
    InTest,
    Failed,
    Offline,
    Online,
    OffDuty,
    PoweredOff,
    NotInstalled,
}

/// The action currently driving a host's FSM, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AdminAction {
    None,
    Unlock,
    Lock,
    ForceLock,
    Reboot,
    Reset,
    Reinstall,
    PowerOn,
    PowerOff,
    Swact,
    Enable,
    EnableSubf,
    Add,
}

impl Default for AdminAction {
    fn default() -> Self {
        Self::None
    }
}

/// A host's node type. Hosts may combine controller function with a worker
/// subfunction (spec.md §3, §4.4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeType {
    pub controller: bool,
    pub worker: bool,
    pub storage: bool,
}

impl NodeType {
    pub const CONTROLLER: Self = Self {
        controller: true,
        worker: false,
        storage: false,
    };
    pub const WORKER: Self = Self {
        controller: false,
        worker: true,
        storage: false,
    };
    pub const STORAGE: Self = Self {
        controller: false,
        worker: false,
        storage: true,
    };
    pub const CONTROLLER_WORKER: Self = Self {
        controller: true,
        worker: true,
        storage: false,
    };

    /// True for a controller that also runs the worker subfunction — the
    /// combined-host case the Subfunction-Enable FSM exists for.
    pub fn has_worker_subfunction(&self) -> bool {
        self.controller && self.worker
    }
}

/// BMC (Baseboard Management Controller) transport type. The specific
/// protocol is an external concern (spec.md §1); this enum only records
/// which one a host is provisioned with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BmcType {
    None,
    Ipmi,
    Redfish,
}

impl AvailStatus {
    /// Availability classes the Disable FSM treats as "already down" when
    /// deciding the post-disable availability (spec.md §4.4.3).
    pub fn is_down(&self) -> bool {
        matches!(self, Self::Failed | Self::PoweredOff | Self::Offline)
    }

    /// Wire-string form used by the outgoing API clients and the HTTP
    /// callback parsers (spec.md §4.6 "All responses are JSON; parsed by
    /// key extraction").
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Degraded => "degraded",
            Self::InTest => "intest",
            Self::Failed => "failed",
            Self::Offline => "offline",
            Self::Online => "online",
            Self::OffDuty => "offduty",
            Self::PoweredOff => "power-off",
            Self::NotInstalled => "not-installed",
        }
    }
}

impl AdminState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }
}

impl OperState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forbidden_triplet_is_expressible_but_flagged_by_invariant_checks() {
        // Invariant 1 (spec.md §3): {unlocked, enabled, not-installed} is
        // forbidden. The type system can't rule it out (it's a runtime
        // invariant over three independently-settable fields); callers
        // assert it via `fleetmtc_inventory::Host::check_invariants`.
        let admin = AdminState::Unlocked;
        let oper = OperState::Enabled;
        let avail = AvailStatus::NotInstalled;
        assert!(matches!(admin, AdminState::Unlocked));
        assert!(matches!(oper, OperState::Enabled));
        assert!(matches!(avail, AvailStatus::NotInstalled));
    }

    #[test]
    fn combined_controller_worker_reports_subfunction() {
        assert!(NodeType::CONTROLLER_WORKER.has_worker_subfunction());
        assert!(!NodeType::CONTROLLER.has_worker_subfunction());
        assert!(!NodeType::WORKER.has_worker_subfunction());
    }

    #[test]
    fn down_classes() {
        assert!(AvailStatus::Failed.is_down());
        assert!(AvailStatus::PoweredOff.is_down());
        assert!(AvailStatus::Offline.is_down());
        assert!(!AvailStatus::Online.is_down());
        assert!(!AvailStatus::Available.is_down());
    }
}
