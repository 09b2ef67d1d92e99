//! Outgoing API clients for the fleetmtc maintenance controller.
//!
//! Spec.md §4.6: every external surface (inventory, HA manager, VIM,
//! alarms/logs, downstream daemons) is a thin builder over the generic
//! [`RequestEvent`] defined in [`request`]. None of these clients open a
//! socket or block on a reply themselves — they hand a built request to
//! the I/O layer (`fleetmtc-io`) and, for non-blocking calls, a later
//! receive step polls it.

mod request;

pub mod alarms;
pub mod downstream;
pub mod ha_manager;
pub mod inventory;
pub mod vim;

pub use alarms::AlarmClient;
pub use downstream::{Downstream, DownstreamClient, DownstreamCommand};
pub use ha_manager::{HaManagerClient, ServiceNodeAction};
pub use inventory::InventoryClient;
pub use request::{Blocking, Method, RequestEvent};
pub use vim::{VimClient, VimHostState};
