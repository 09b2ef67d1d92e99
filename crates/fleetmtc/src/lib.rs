//! The fleetmtc maintenance controller facade.
//!
//! Per design note §9 ("Model as a `Controller` value owning the
//! inventory, socket registry, and client handles; pass a handle to every
//! function"): [`MaintenanceController`] is that value. It owns the node
//! inventory, the timer registry, the BMC worker pool, the outgoing API
//! clients, and the fleet coordinator, and drives one tick of the main
//! loop (spec.md §4.8 / §8's data-flow diagram): drain inputs into the
//! inventory, run the per-host FSM pass, execute the effects that pass
//! emitted.
//!
//! This crate has no `main` of its own — `fleetmtc-cli` owns process
//! startup (config load, daemonization, signal handling) and calls into
//! `MaintenanceController` from its run loop: an embeddable control-plane
//! crate with no process lifecycle of its own, plus a separate binary
//! crate that owns startup and the run loop.

mod effects;
mod engine;
mod error;
mod http_client;
mod metrics;

pub use engine::{BaseUrls, MaintenanceController};
pub use error::{FleetmtcError, Result};
pub use http_client::HttpClient;
pub use metrics::Metrics;
