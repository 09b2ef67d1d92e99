//! Ties the four input classes together behind one `mio::Poll`.
//!
//! Per spec.md §4.5: "The selector uses a 50-100 ms tick on simplex
//! systems and a faster tick otherwise; on every wake-up the loop
//! dispatches all ready sources, then performs the FSM pass." This module
//! owns the `Poll` instance and token allocation; `fleetmtc`'s main loop
//! owns the tick-duration policy and the FSM pass itself.

use std::io;
use std::time::Duration;

use mio::{Events, Interest, Poll, Token};

use crate::credential_watch::CredentialWatch;
use crate::netlink::NetlinkListener;
use crate::udp::UdpEndpoint;

/// Fixed token assignments for the fixed set of non-accept sources. HTTP
/// client connection tokens are allocated starting at `HTTP_CLIENT_BASE`.
pub const TOKEN_MGMNT_UDP: Token = Token(0);
pub const TOKEN_CLSTR_UDP: Token = Token(1);
pub const TOKEN_HTTP_LISTENER: Token = Token(2);
pub const HTTP_CLIENT_BASE: usize = 16;

/// Ticks faster when the fleet has more than one controller reachable
/// (spec.md §4.5: "a 50-100 ms tick on simplex systems and a faster tick
/// otherwise").
pub fn tick_duration(simplex: bool) -> Duration {
    if simplex {
        Duration::from_millis(100)
    } else {
        Duration::from_millis(20)
    }
}

/// Registers the fixed I/O sources against one `Poll`. Netlink and
/// inotify are polled directly each tick rather than registered with
/// `mio`, since `neli`'s and `inotify`'s raw fds are cheap to poll
/// non-blockingly and keeping them outside the `Poll` set avoids pulling
/// in two more third-party `Source` adapters for a handful of infrequent
/// events.
pub struct IoSources {
    pub poll: Poll,
    pub mgmnt_udp: UdpEndpoint,
    pub cluster_udp: Option<UdpEndpoint>,
    pub netlink: NetlinkListener,
    pub credential_watch: CredentialWatch,
}

impl IoSources {
    pub fn new(
        mut mgmnt_udp: UdpEndpoint,
        mut cluster_udp: Option<UdpEndpoint>,
        netlink: NetlinkListener,
        credential_watch: CredentialWatch,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        poll.registry()
            .register(mgmnt_udp.mio_socket_mut(), TOKEN_MGMNT_UDP, Interest::READABLE)?;
        if let Some(cluster) = cluster_udp.as_mut() {
            poll.registry()
                .register(cluster.mio_socket_mut(), TOKEN_CLSTR_UDP, Interest::READABLE)?;
        }
        Ok(Self {
            poll,
            mgmnt_udp,
            cluster_udp,
            netlink,
            credential_watch,
        })
    }

    /// Blocks for up to `tick` waiting for any registered source to become
    /// ready, then returns. The caller (the `fleetmtc` main loop) drains
    /// every source unconditionally afterward rather than branching on
    /// which token fired, since UDP batches, netlink, and inotify are all
    /// cheap to poll non-blockingly even when idle.
    pub fn wait(&mut self, tick: Duration, events: &mut Events) -> io::Result<()> {
        match self.poll.poll(events, Some(tick)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(()),
            Err(e) => Err(e),
        }
    }
}
