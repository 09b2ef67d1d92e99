//! Non-blocking UDP receivers on the management (and optionally
//! cluster-host) networks.
//!
//! Built on the same WouldBlock-draining handling pattern used for the
//! byte-stream HTTP connection, adapted from a TCP byte-stream to discrete
//! UDP datagrams: each `recv_batch` call drains up to `MAX_RX_MSG_BATCH`
//! messages per wake-up and stops at the first `WouldBlock`, never
//! blocking the single-threaded main loop.

use std::io::{self, ErrorKind};
use std::net::SocketAddr;

use mio::net::UdpSocket as MioUdpSocket;
use socket2::{Domain, Socket, Type};
use tracing::{trace, warn};

use crate::message::{Message, MessageError};

/// Per spec.md §4.5: "Each receive drains up to `MAX_RX_MSG_BATCH`
/// messages per wake-up."
pub const MAX_RX_MSG_BATCH: usize = 64;

const RECV_BUF_SIZE: usize = 65_536;

/// A single non-blocking UDP endpoint. One instance per network
/// (management, cluster-host) per logical port.
pub struct UdpEndpoint {
    socket: MioUdpSocket,
    local_addr: SocketAddr,
}

impl UdpEndpoint {
    /// Binds and configures an explicit receive-buffer size via `socket2`
    /// before handing the fd to `mio` (spec.md §4.5: "Socket receive-buffer
    /// sizes are set explicitly").
    pub fn bind(addr: SocketAddr, recv_buffer_bytes: usize) -> io::Result<Self> {
        let domain = if addr.is_ipv4() { Domain::IPV4 } else { Domain::IPV6 };
        let socket = Socket::new(domain, Type::DGRAM, None)?;
        socket.set_nonblocking(true)?;
        socket.set_recv_buffer_size(recv_buffer_bytes.max(RECV_BUF_SIZE))?;
        socket.bind(&addr.into())?;

        let std_socket: std::net::UdpSocket = socket.into();
        let socket = MioUdpSocket::from_std(std_socket);
        let local_addr = socket.local_addr()?;

        Ok(Self { socket, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn mio_socket_mut(&mut self) -> &mut MioUdpSocket {
        &mut self.socket
    }

    /// Drains up to [`MAX_RX_MSG_BATCH`] datagrams. Malformed datagrams
    /// are logged and skipped rather than aborting the whole batch — one
    /// bad peer should not starve the others.
    pub fn recv_batch(&mut self) -> Vec<(SocketAddr, Message)> {
        let mut out = Vec::new();
        let mut buf = [0u8; RECV_BUF_SIZE];

        for _ in 0..MAX_RX_MSG_BATCH {
            match self.socket.recv_from(&mut buf) {
                Ok((len, from)) => match Message::decode(&buf[..len]) {
                    Ok(message) => {
                        trace!(%from, cmd = message.cmd, "received message");
                        out.push((from, message));
                    }
                    Err(MessageError::TooShort(n)) => {
                        warn!(%from, bytes = n, "dropping malformed datagram");
                    }
                },
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "UDP receive error");
                    break;
                }
            }
        }
        out
    }

    /// Best-effort send, matching spec.md §6 ("send is best-effort"): a
    /// `WouldBlock` or transient error is logged and dropped, never
    /// retried synchronously.
    pub fn send_best_effort(&mut self, to: SocketAddr, message: &Message) {
        let wire = message.encode();
        match self.socket.send_to(&wire, to) {
            Ok(_) => {}
            Err(e) if e.kind() == ErrorKind::WouldBlock => {
                warn!(%to, "UDP send would block, dropping");
            }
            Err(e) => warn!(%to, error = %e, "UDP send failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn bind_picks_an_ephemeral_local_port_when_zero_is_requested() {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
        let endpoint = UdpEndpoint::bind(addr, RECV_BUF_SIZE).unwrap();
        assert_ne!(endpoint.local_addr().port(), 0);
    }

    #[test]
    fn send_then_recv_round_trip_between_two_endpoints() {
        let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let mut a = UdpEndpoint::bind(SocketAddr::new(loopback, 0), RECV_BUF_SIZE).unwrap();
        let mut b = UdpEndpoint::bind(SocketAddr::new(loopback, 0), RECV_BUF_SIZE).unwrap();
        let b_addr = b.local_addr();

        let msg = Message::new(42, vec![0; 32], b"hello".to_vec());
        a.send_best_effort(b_addr, &msg);

        // mio non-blocking sockets need a moment for loopback delivery in
        // tests without a real event loop driving readiness.
        std::thread::sleep(std::time::Duration::from_millis(50));
        let received = b.recv_batch();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].1.cmd, 42);
    }
}
