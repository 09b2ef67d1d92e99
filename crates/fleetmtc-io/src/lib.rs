//! Non-blocking message I/O layer for the fleetmtc maintenance controller.
//!
//! Four input classes, all serviced without blocking the single-threaded
//! main loop (spec.md §4.5): UDP receivers on the management and
//! cluster-host networks, an inbound HTTP server for inventory/VIM push
//! callbacks, a netlink listener for link up/down transitions, and an
//! inotify watch on the credential file. [`event_loop::IoSources`] owns
//! the shared `mio::Poll` registry; everything else in this crate is a
//! source that loop drives each tick.

mod credential_watch;
mod event_loop;
mod http;
mod message;
mod netlink;
mod udp;

pub use credential_watch::CredentialWatch;
pub use event_loop::{tick_duration, IoSources, HTTP_CLIENT_BASE, TOKEN_CLSTR_UDP, TOKEN_HTTP_LISTENER, TOKEN_MGMNT_UDP};
pub use http::{HttpConnection, HttpRequest};
pub use message::{cmd, Message, MessageError};
pub use netlink::{LinkEvent, NetlinkListener};
pub use udp::{UdpEndpoint, MAX_RX_MSG_BATCH};
