//! Coordinator-level constants (spec.md §4.4.10).

/// "On startup, if controller uptime < 15 minutes, activate DOR mode."
pub const DOR_UPTIME_THRESHOLD_SECS: u64 = 15 * 60;
