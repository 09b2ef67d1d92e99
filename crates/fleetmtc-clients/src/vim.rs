//! Virtual Infrastructure Manager API client (spec.md §4.6 "VIM").
//!
//! Fire-and-forget host state-change events; the VIM reconciles workload
//! placement on its own schedule, so these are always non-blocking.

use std::time::Duration;

use serde::Serialize;

use fleetmtc_types::HostName;

use crate::request::{Blocking, Method, RequestEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VimHostState {
    Enabled,
    Disabled,
    Failed,
    Offline,
}

impl VimHostState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Failed => "failed",
            Self::Offline => "offline",
        }
    }
}

#[derive(Debug, Serialize)]
struct VimEvent<'a> {
    hostname: &'a str,
    state: &'a str,
}

pub struct VimClient {
    base_url: String,
}

impl VimClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    pub fn host_state_change(&self, host: &HostName, state: VimHostState) -> RequestEvent {
        let url = format!("{}/v1/events/host-state-change", self.base_url);
        RequestEvent::new(Method::Post, url, Blocking::NonBlocking, Duration::from_secs(5), 1)
            .with_json_payload(&VimEvent {
                hostname: host.as_str(),
                state: state.as_str(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_state_change_is_always_non_blocking() {
        let client = VimClient::new("http://vim-api");
        let req = client.host_state_change(&HostName::from("compute-0"), VimHostState::Failed);
        assert_eq!(req.blocking, Blocking::NonBlocking);
    }
}
