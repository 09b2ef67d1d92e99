//! Executes a [`fleetmtc_clients::RequestEvent`] against the network.
//!
//! Design note §9: "Libevent HTTP callback freeing its own base inside the
//! handler... Model as a request/future: the handler only stores the
//! response and a completion flag; the main loop reaps." This is that
//! reaping step. Every call here is bounded by the request's own timeout
//! (spec.md §5: "blocking HTTP calls must carry a per-call timeout no
//! greater than one tick plus the configured API deadline"), so even a
//! `Blocking` request never stalls the main loop past its own deadline.

use fleetmtc_clients::{Method, RequestEvent};
use tracing::{debug, warn};

/// A single `reqwest::blocking::Client`, reused across calls so connection
/// pooling amortizes across the many small requests this daemon issues
/// per tick (one inventory client per `[timeouts]` class would be
/// overkill; the per-request timeout is what actually bounds each call).
pub struct HttpClient {
    inner: reqwest::blocking::Client,
}

impl HttpClient {
    pub fn new() -> Self {
        Self {
            inner: reqwest::blocking::Client::builder()
                .build()
                .expect("reqwest blocking client must build with default TLS backend"),
        }
    }

    /// Issues `request` synchronously, bounded by its own `timeout` field,
    /// and records the outcome on it in place. Transport failures (DNS,
    /// connection refused, timeout) are mapped to a synthetic `0` status
    /// rather than propagated — the caller's stage treats `is_success()`
    /// as the only signal and retries through its own bounded loop.
    pub fn execute(&self, request: &mut RequestEvent) {
        let builder = match request.method {
            Method::Get => self.inner.get(&request.url),
            Method::Patch => self.inner.patch(&request.url),
            Method::Post => self.inner.post(&request.url),
        };

        let builder = builder
            .timeout(request.timeout)
            .header("content-type", "application/json")
            .body(request.payload.clone());

        match builder.send() {
            Ok(response) => {
                let status = response.status().as_u16();
                let body = response.bytes().map(|b| b.to_vec()).unwrap_or_default();
                debug!(url = %request.url, status, "outbound request completed");
                request.complete(status, body);
            }
            Err(err) => {
                warn!(url = %request.url, error = %err, "outbound request failed");
                request.complete(0, Vec::new());
            }
        }
    }
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}
