//! Fleet-level coordination sitting above the per-host FSMs: Multi-Node
//! Failure Avoidance, the Dead-Office-Recovery startup window, and
//! active/inactive controller tracking for Swact orchestration
//! (spec.md §4.4.10).

pub mod constants;
pub mod controller;
pub mod dor;
pub mod mnfa;

pub use controller::{ControllerTracker, SwactOrchestrator};
pub use dor::DorWindow;
pub use mnfa::MnfaTracker;
