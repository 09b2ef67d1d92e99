//! The fixed-size UDP message record (spec.md §6).

use thiserror::Error;

/// Minimum wire size: a `u32` command tag plus an empty header/body.
const HEADER_LEN: usize = 4;

/// Command enumerants carried in [`Message::cmd`]. Node-directed commands
/// (sent to a host's own mtce client) and downstream-daemon commands
/// (`fleetmtc_clients::DownstreamCommand`) share this one wire format but
/// occupy disjoint id ranges so a stray datagram on the wrong socket is
/// obviously malformed rather than silently misinterpreted.
pub mod cmd {
    /// Liveness datagram from a host (spec.md glossary "mtcAlive").
    pub const MTC_ALIVE: u32 = 100;
    /// Request a host send an out-of-cycle mtcAlive immediately.
    pub const REQ_MTC_ALIVE: u32 = 101;
    /// Out-of-service go-enabled test request/result.
    pub const GOENABLED: u32 = 102;
    pub const SUBF_GOENABLED: u32 = 103;
    /// Host-services start request/result.
    pub const HOST_SERVICES: u32 = 104;
    pub const SUBF_HOST_SERVICES: u32 = 105;
    /// Refreshes the "host is locked" marker file on the target host.
    pub const REFRESH_LOCKED_FILE: u32 = 106;
    /// Generic command-response envelope (reset/reboot/wipe-disk acks).
    pub const COMMAND_RESPONSE: u32 = 107;
}

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("message too short: {0} bytes, need at least {HEADER_LEN}")]
    TooShort(usize),
}

/// `{ cmd:uint32, hdr[], buf[] }`, interpreted by `cmd` on receive
/// (spec.md §6). `hdr` and `buf` are left as raw byte slices of the
/// datagram; each command enumerant's builder (`fleetmtc-clients`) is
/// responsible for parsing its own payload shape out of them.
#[derive(Debug, Clone)]
pub struct Message {
    pub cmd: u32,
    pub hdr: Vec<u8>,
    pub buf: Vec<u8>,
}

impl Message {
    pub fn new(cmd: u32, hdr: Vec<u8>, buf: Vec<u8>) -> Self {
        Self { cmd, hdr, buf }
    }

    /// Parses a received datagram. The header/body split point is fixed
    /// by convention at a 32-byte header region, matching the original
    /// daemon's fixed-size header record; anything shorter than the
    /// command tag itself is rejected outright.
    pub fn decode(datagram: &[u8]) -> Result<Self, MessageError> {
        if datagram.len() < HEADER_LEN {
            return Err(MessageError::TooShort(datagram.len()));
        }
        let cmd = u32::from_be_bytes([datagram[0], datagram[1], datagram[2], datagram[3]]);
        const HDR_REGION: usize = 32;
        let rest = &datagram[HEADER_LEN..];
        let (hdr, buf) = if rest.len() >= HDR_REGION {
            rest.split_at(HDR_REGION)
        } else {
            (rest, &rest[rest.len()..])
        };
        Ok(Self {
            cmd,
            hdr: hdr.to_vec(),
            buf: buf.to_vec(),
        })
    }

    /// Best-effort wire encoding for send.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.hdr.len() + self.buf.len());
        out.extend_from_slice(&self.cmd.to_be_bytes());
        out.extend_from_slice(&self.hdr);
        out.extend_from_slice(&self.buf);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_encode_decode() {
        let msg = Message::new(7, vec![1; 32], b"payload".to_vec());
        let wire = msg.encode();
        let decoded = Message::decode(&wire).unwrap();
        assert_eq!(decoded.cmd, 7);
        assert_eq!(decoded.buf, b"payload");
    }

    #[test]
    fn rejects_datagrams_shorter_than_the_command_tag() {
        assert!(matches!(Message::decode(&[1, 2]), Err(MessageError::TooShort(2))));
    }
}
