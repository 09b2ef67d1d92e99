//! Timer service for the fleetmtc maintenance controller.
//!
//! Every FSM stage, audit pass, and recovery action in this daemon is
//! gated by a timeout. Historically those timeouts rang via a Unix signal
//! delivered straight into the owning struct's memory; we do not have (and
//! do not want) per-struct signal handlers here, so timers are driven by a
//! background [`TimerWheel`] thread that deposits expiry notices into a
//! bounded mailbox, drained synchronously by the owner on its own thread.
//! See [`TimerRegistry`] for the id-to-owner index the main loop uses to
//! resolve a drained [`TimerRing`] back to the timer record that owns it.

mod registry;
mod wheel;

pub use registry::{TimerCategory, TimerRecord, TimerRegistry};
pub use wheel::{TimerRing, TimerWheel};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("timer {0} is not registered")]
    UnknownTimer(fleetmtc_types::TimerId),

    #[error("timer wheel mailbox is full, dropping ring for timer {0}")]
    MailboxFull(fleetmtc_types::TimerId),
}
