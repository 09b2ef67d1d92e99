//! Generic outgoing HTTP request event.
//!
//! Spec.md §4.6: "Outgoing surfaces, each a thin builder over a generic
//! HTTP helper with a per-request event struct holding URL, payload,
//! status, retries, blocking flag, and response. For non-blocking calls, a
//! receive step must later be polled." Every client in this crate builds
//! one of these and hands it to the I/O layer; none of them open a socket
//! themselves.

use std::time::{Duration, Instant};

use serde::Serialize;

/// HTTP verb used by an outgoing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Patch,
    Post,
}

/// Whether the caller's stage blocks (spins a retry loop inline, bounded
/// by `timeout`) or splits into separate send/recv stages driven by a
/// timer (spec.md §5: "callers that truly need to await a reply split
/// into 'send' and 'recv' stages separated by a timer").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocking {
    Blocking,
    NonBlocking,
}

/// A single outgoing HTTP request and its lifecycle.
#[derive(Debug, Clone)]
pub struct RequestEvent {
    pub method: Method,
    pub url: String,
    pub payload: Vec<u8>,
    pub blocking: Blocking,
    pub timeout: Duration,
    pub retries_remaining: u32,
    pub status: Option<u16>,
    pub response: Option<Vec<u8>>,
    issued_at: Option<Instant>,
}

impl RequestEvent {
    pub fn new(method: Method, url: impl Into<String>, blocking: Blocking, timeout: Duration, max_retries: u32) -> Self {
        Self {
            method,
            url: url.into(),
            payload: Vec::new(),
            blocking,
            timeout,
            retries_remaining: max_retries,
            status: None,
            response: None,
            issued_at: None,
        }
    }

    pub fn with_json_payload<T: Serialize>(mut self, body: &T) -> Self {
        self.payload = serde_json::to_vec(body).unwrap_or_default();
        self
    }

    pub fn mark_issued(&mut self, at: Instant) {
        self.issued_at = Some(at);
    }

    /// True once `timeout` has elapsed since the request was issued
    /// without a response — the caller maps this to its own `RETRY`/`FAIL`
    /// policy.
    pub fn has_timed_out(&self, now: Instant) -> bool {
        match self.issued_at {
            Some(issued) => now.duration_since(issued) >= self.timeout,
            None => false,
        }
    }

    pub fn complete(&mut self, status: u16, response: Vec<u8>) {
        self.status = Some(status);
        self.response = Some(response);
    }

    pub fn is_success(&self) -> bool {
        matches!(self.status, Some(200..=299))
    }

    /// Consumes one retry attempt. Returns `false` once retries are
    /// exhausted.
    pub fn retry(&mut self) -> bool {
        if self.retries_remaining == 0 {
            return false;
        }
        self.retries_remaining -= 1;
        self.status = None;
        self.response = None;
        self.issued_at = None;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn times_out_after_the_configured_duration() {
        let mut req = RequestEvent::new(Method::Get, "http://x", Blocking::NonBlocking, Duration::from_millis(10), 1);
        let start = Instant::now();
        req.mark_issued(start);
        assert!(!req.has_timed_out(start));
        assert!(req.has_timed_out(start + Duration::from_millis(20)));
    }

    #[test]
    fn retry_is_bounded() {
        let mut req = RequestEvent::new(Method::Post, "http://x", Blocking::Blocking, Duration::from_secs(1), 1);
        assert!(req.retry());
        assert!(!req.retry());
    }
}
