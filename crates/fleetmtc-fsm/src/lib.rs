//! Per-host action and audit FSM engine for the fleetmtc maintenance
//! controller.
//!
//! Every FSM here is a typed stage value (owned by [`fleetmtc_inventory`])
//! plus a pure `step(stage, host, context, event) -> StepResult<Stage>`
//! function: no step function performs I/O, starts a thread, or holds a
//! lock, it only reads a [`fleetmtc_inventory::Host`] snapshot and returns
//! the next stage plus the effects the main loop (the `fleetmtc` facade)
//! should carry out. [`dispatch::step`] is the single entry point that
//! routes one event to whichever FSM currently owns a host.

pub mod add_delete;
pub mod audits;
pub mod bmc_action;
pub mod constants;
pub mod context;
pub mod disable;
pub mod dispatch;
pub mod effects;
pub mod enable;
pub mod event;
pub mod graceful_recovery;
pub mod reinstall;
pub mod subfunction;
pub mod swact;

pub use context::FsmContext;
pub use dispatch::{active_fsm, step, ActiveFsm, DispatchResult};
pub use effects::{DownstreamDaemon, DownstreamOp, Effect, StepResult, TimerSlot, WorkingCounter};
pub use event::Event;
