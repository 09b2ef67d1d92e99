//! Inbound HTTP server for inventory/VIM push callbacks (spec.md §4.5.2).
//!
//! A minimal non-blocking HTTP/1.1 request reader built around a
//! `BytesMut` read buffer accumulated across `WouldBlock` wake-ups, parsed
//! once a full header block (`\r\n\r\n`) plus `Content-Length` bytes have
//! arrived. This is intentionally not a general-purpose HTTP
//! implementation — only the inbound push-callback surface spec.md §6
//! names (PATCH/POST against a handful of fixed paths) is needed.

use std::collections::HashMap;
use std::io::{self, ErrorKind, Read, Write};

use bytes::BytesMut;
use mio::net::TcpStream;
use mio::{Interest, Token};
use tracing::{trace, warn};

/// A fully parsed inbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Per-connection buffering state for one accepted HTTP client.
pub struct HttpConnection {
    pub token: Token,
    pub stream: TcpStream,
    read_buf: BytesMut,
    write_buf: BytesMut,
    pub closing: bool,
}

impl HttpConnection {
    pub fn new(token: Token, stream: TcpStream) -> Self {
        Self {
            token,
            stream,
            read_buf: BytesMut::with_capacity(8192),
            write_buf: BytesMut::new(),
            closing: false,
        }
    }

    pub fn interest(&self) -> Interest {
        if self.write_buf.is_empty() {
            Interest::READABLE
        } else {
            Interest::READABLE | Interest::WRITABLE
        }
    }

    /// Reads as much as is available without blocking, accumulating into
    /// `read_buf`. Returns a parsed request once a complete one has
    /// arrived; returns `Ok(None)` if more data is still needed.
    pub fn try_read_request(&mut self) -> io::Result<Option<HttpRequest>> {
        let mut chunk = [0u8; 4096];
        loop {
            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    self.closing = true;
                    return Ok(None);
                }
                Ok(n) => self.read_buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        parse_request(&mut self.read_buf)
    }

    /// Queues a response for the next writable wake-up.
    pub fn queue_response(&mut self, status: u16, body: &str) {
        let reason = match status {
            200 => "OK",
            400 => "Bad Request",
            404 => "Not Found",
            _ => "Internal Server Error",
        };
        let response = format!(
            "HTTP/1.1 {status} {reason}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        self.write_buf.extend_from_slice(response.as_bytes());
    }

    pub fn flush(&mut self) -> io::Result<()> {
        while !self.write_buf.is_empty() {
            match self.stream.write(&self.write_buf) {
                Ok(0) => break,
                Ok(n) => {
                    let _ = self.write_buf.split_to(n);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => break,
                Err(e) => return Err(e),
            }
        }
        if self.write_buf.is_empty() {
            self.closing = true;
        }
        Ok(())
    }
}

fn parse_request(buf: &mut BytesMut) -> io::Result<Option<HttpRequest>> {
    let header_end = match find_subslice(buf, b"\r\n\r\n") {
        Some(idx) => idx,
        None => return Ok(None),
    };

    let header_text = String::from_utf8_lossy(&buf[..header_end]).into_owned();
    let mut lines = header_text.split("\r\n");
    let request_line = lines.next().unwrap_or_default();
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let mut headers = HashMap::new();
    for line in lines {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    let body_start = header_end + 4;
    if buf.len() < body_start + content_length {
        return Ok(None);
    }

    let body = buf[body_start..body_start + content_length].to_vec();
    let consumed = body_start + content_length;
    let _ = buf.split_to(consumed);

    if method.is_empty() {
        warn!("malformed HTTP request line, dropping connection buffer");
        return Ok(None);
    }

    trace!(%method, %path, "parsed HTTP request");
    Ok(Some(HttpRequest {
        method,
        path,
        headers,
        body,
    }))
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_request_with_body() {
        let mut buf = BytesMut::from(
            &b"PATCH /v1/hosts/compute-0 HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"[..],
        );
        let request = parse_request(&mut buf).unwrap().unwrap();
        assert_eq!(request.method, "PATCH");
        assert_eq!(request.path, "/v1/hosts/compute-0");
        assert_eq!(request.body, b"hello");
        assert!(buf.is_empty());
    }

    #[test]
    fn returns_none_until_full_body_arrives() {
        let mut buf = BytesMut::from(&b"POST /v1/events HTTP/1.1\r\nContent-Length: 10\r\n\r\npartial"[..]);
        assert!(parse_request(&mut buf).unwrap().is_none());
    }
}
