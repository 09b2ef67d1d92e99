//! BMC worker thread.
//!
//! Per design note §9 ("BMC worker thread with ad-hoc control fields...
//! Model as a task with a request channel and a result channel carrying
//! `{command, status, data, kill}`"): one OS thread per provisioned host,
//! talking to the main loop through a pair of bounded `ArrayQueue`
//! channels: the same single-thread-plus-bounded-inbox shape and
//! start/stop/restart/is_alive lifecycle a child-process supervisor uses,
//! adapted from a child-process supervisor to an in-process worker
//! thread.

mod transport;
mod worker;

pub use transport::{BmcCommand, BmcRequest, BmcResponse, BmcStatus};
pub use worker::{BmcWorker, BmcWorkerError, BmcWorkerState};
