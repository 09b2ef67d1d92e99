//! Downstream-daemon UDP command client (spec.md §4.6 "Downstream
//! daemons").
//!
//! Heartbeat, hwmon, guest, and log-shipper collaborators all speak the
//! same idempotent command set over the UDP message record `fleetmtc-io`
//! defines. Each daemon gets its own destination port (from
//! `[client]`/`[agent]` config) but shares this one builder.

use std::net::SocketAddr;

use fleetmtc_io::Message;
use fleetmtc_types::HostName;

/// Idempotent node-directed commands (spec.md §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownstreamCommand {
    AddHost = 1,
    DelHost = 2,
    StartHost = 3,
    StopHost = 4,
    ActiveCtrl = 5,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Downstream {
    Heartbeat,
    Hwmon,
    Guest,
    LogShipper,
}

pub struct DownstreamClient {
    heartbeat_addr: SocketAddr,
    hwmon_addr: SocketAddr,
    guest_addr: SocketAddr,
    log_shipper_addr: SocketAddr,
}

impl DownstreamClient {
    pub fn new(
        heartbeat_addr: SocketAddr,
        hwmon_addr: SocketAddr,
        guest_addr: SocketAddr,
        log_shipper_addr: SocketAddr,
    ) -> Self {
        Self {
            heartbeat_addr,
            hwmon_addr,
            guest_addr,
            log_shipper_addr,
        }
    }

    fn addr_for(&self, daemon: Downstream) -> SocketAddr {
        match daemon {
            Downstream::Heartbeat => self.heartbeat_addr,
            Downstream::Hwmon => self.hwmon_addr,
            Downstream::Guest => self.guest_addr,
            Downstream::LogShipper => self.log_shipper_addr,
        }
    }

    /// Builds the `(destination, message)` pair for a node-directed
    /// command. The caller hands this straight to
    /// `fleetmtc_io::UdpEndpoint::send_best_effort`.
    pub fn command(&self, daemon: Downstream, command: DownstreamCommand, host: &HostName) -> (SocketAddr, Message) {
        let hdr = {
            let mut hdr = host.as_str().as_bytes().to_vec();
            hdr.resize(32, 0);
            hdr
        };
        (self.addr_for(daemon), Message::new(command as u32, hdr, Vec::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn command_targets_the_right_daemon_port() {
        let loopback = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let client = DownstreamClient::new(
            SocketAddr::new(loopback, 2112),
            SocketAddr::new(loopback, 2122),
            SocketAddr::new(loopback, 2103),
            SocketAddr::new(loopback, 2144),
        );
        let (addr, message) = client.command(Downstream::Hwmon, DownstreamCommand::AddHost, &HostName::from("compute-0"));
        assert_eq!(addr.port(), 2122);
        assert_eq!(message.cmd, DownstreamCommand::AddHost as u32);
    }
}
