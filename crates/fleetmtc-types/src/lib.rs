//! Shared identifiers and enums for the fleetmtc maintenance controller.
//!
//! This crate has no behavior of its own: it is the common vocabulary that
//! every other `fleetmtc-*` crate builds on. Keep it free of I/O and free
//! of any crate-specific logic.

mod alarm;
mod flags;
mod ids;
mod state;

pub use alarm::{AlarmClass, AlarmId, AlarmInfo, Severity};
pub use flags::{DegradeCause, DegradeMask, HostFlags};
pub use ids::{HostName, HostUuid, SequenceNumber, TimerId};
pub use state::{AdminAction, AdminState, AvailStatus, BmcType, NodeType, OperState};
