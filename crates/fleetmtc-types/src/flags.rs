//! Host-reported flags bitfield and the degrade-cause mask.
//!
//! Grounded on spec.md §3 ("Flags bitfield", "Degrade mask") and invariant
//! 3 (`degrade_mask = 0 ∧ availStatus = degraded` is transient).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Flags a host reports about itself in its mtcAlive / command-response
    /// traffic.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct HostFlags: u32 {
        const I_AM_CONFIGURED = 1 << 0;
        const I_AM_HEALTHY    = 1 << 1;
        const I_AM_LOCKED     = 1 << 2;
        const SUBF_CONFIGURED = 1 << 3;
        const SM_DEGRADED     = 1 << 4;
        const SM_UNHEALTHY    = 1 << 5;
    }
}

bitflags! {
    /// Causes contributing to a host's degrade mask (spec.md §3, §4.4.9).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct DegradeMask: u32 {
        const SENSOR    = 1 << 0;
        const HEARTBEAT = 1 << 1;
        const CONFIG    = 1 << 2;
        const SUBF      = 1 << 3;
        const SM        = 1 << 4;
        const ENABLE    = 1 << 5;
        const INSERVICE = 1 << 6;
    }
}

/// A single named degrade cause, for logging and the in-service test's
/// per-cause bookkeeping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DegradeCause {
    Sensor,
    Heartbeat,
    Config,
    Subf,
    Sm,
    Enable,
    InService,
}

impl DegradeCause {
    pub fn mask(self) -> DegradeMask {
        match self {
            Self::Sensor => DegradeMask::SENSOR,
            Self::Heartbeat => DegradeMask::HEARTBEAT,
            Self::Config => DegradeMask::CONFIG,
            Self::Subf => DegradeMask::SUBF,
            Self::Sm => DegradeMask::SM,
            Self::Enable => DegradeMask::ENABLE,
            Self::InService => DegradeMask::INSERVICE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degrade_mask_empty_iff_no_causes() {
        let mut mask = DegradeMask::empty();
        assert!(mask.is_empty());
        mask.insert(DegradeCause::Heartbeat.mask());
        assert!(!mask.is_empty());
        assert!(mask.contains(DegradeMask::HEARTBEAT));
        mask.remove(DegradeCause::Heartbeat.mask());
        assert!(mask.is_empty());
    }

    #[test]
    fn host_flags_compose() {
        let flags = HostFlags::I_AM_CONFIGURED | HostFlags::I_AM_HEALTHY;
        assert!(flags.contains(HostFlags::I_AM_CONFIGURED));
        assert!(flags.contains(HostFlags::I_AM_HEALTHY));
        assert!(!flags.contains(HostFlags::SM_DEGRADED));
    }
}
