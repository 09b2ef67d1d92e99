//! Netlink link-state listener.
//!
//! Subscribes to `RTNLGRP_LINK` on a `NETLINK_ROUTE` socket via `neli` and
//! surfaces management/cluster-host interface up/down transitions to the
//! main loop (spec.md §4.5.3).

use std::io;

use neli::consts::rtnl::{Iff, Rtm};
use neli::consts::socket::NlFamily;
use neli::nl::{NlPayload, Nlmsghdr};
use neli::rtnl::Ifinfomsg;
use neli::socket::NlSocketHandle;
use tracing::trace;

/// An interface state transition observed on the netlink socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEvent {
    pub if_index: i32,
    pub up: bool,
}

/// A non-blocking `NETLINK_ROUTE` listener subscribed to link-state
/// multicast group `RTNLGRP_LINK`.
pub struct NetlinkListener {
    socket: NlSocketHandle,
}

impl NetlinkListener {
    pub fn connect() -> io::Result<Self> {
        const RTNLGRP_LINK: u32 = 1;
        let socket = NlSocketHandle::connect(NlFamily::Route, None, &[RTNLGRP_LINK])
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        socket
            .set_nonblocking(true)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;
        Ok(Self { socket })
    }

    /// Drains every pending `RTM_NEWLINK`/`RTM_DELLINK` message, returning
    /// the up/down transitions it carried. Returns an empty `Vec` (not an
    /// error) on `WouldBlock` — this is the normal "nothing changed since
    /// last poll" case.
    pub fn poll(&mut self) -> Vec<LinkEvent> {
        let mut events = Vec::new();
        loop {
            let message: Result<Option<Nlmsghdr<Rtm, Ifinfomsg>>, _> = self.socket.recv();
            match message {
                Ok(Some(hdr)) => {
                    if hdr.nl_type == Rtm::Newlink || hdr.nl_type == Rtm::Dellink {
                        if let NlPayload::Payload(info) = hdr.nl_payload {
                            let up = info.ifi_flags.contains(&Iff::Up);
                            trace!(if_index = info.ifi_index, up, "netlink link event");
                            events.push(LinkEvent {
                                if_index: info.ifi_index,
                                up,
                            });
                        }
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    // neli surfaces WouldBlock as a generic socket error on
                    // a non-blocking handle; treat anything here as "no
                    // more messages right now" rather than a fatal error,
                    // matching the best-effort posture of the other
                    // non-blocking sources in this crate.
                    trace!(error = %e, "netlink poll yielded no message");
                    break;
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_event_equality() {
        let a = LinkEvent { if_index: 2, up: true };
        let b = LinkEvent { if_index: 2, up: true };
        assert_eq!(a, b);
    }
}
