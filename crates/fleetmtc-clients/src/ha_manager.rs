//! HA-Service-Manager API client (spec.md §4.6 "HA manager").
//!
//! Query/Swact are non-blocking (split send/recv over the Swact FSM's
//! polling stages); Enabled/Disabled/Locked/Unlocked notifications are
//! blocking with retry. Simplex systems skip all HA calls entirely —
//! callers check [`HaManagerClient::simplex`] before issuing anything.

use std::time::Duration;

use serde::Serialize;

use fleetmtc_types::HostName;

use crate::request::{Blocking, Method, RequestEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceNodeAction {
    Query,
    Swact,
    Enabled,
    Disabled,
    Locked,
    Unlocked,
}

impl ServiceNodeAction {
    fn as_str(self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Swact => "swact",
            Self::Enabled => "enabled",
            Self::Disabled => "disabled",
            Self::Locked => "locked",
            Self::Unlocked => "unlocked",
        }
    }

    fn is_blocking(self) -> bool {
        !matches!(self, Self::Query | Self::Swact)
    }
}

#[derive(Debug, Serialize)]
struct ServiceNodeRequest<'a> {
    origin: &'a str,
    action: &'a str,
    admin: &'a str,
    oper: &'a str,
    avail: &'a str,
}

pub struct HaManagerClient {
    base_url: String,
    swact_timeout: Duration,
    origin: String,
    simplex: bool,
}

impl HaManagerClient {
    pub fn new(base_url: impl Into<String>, swact_timeout_secs: u64, origin: impl Into<String>, simplex: bool) -> Self {
        Self {
            base_url: base_url.into(),
            swact_timeout: Duration::from_secs(swact_timeout_secs),
            origin: origin.into(),
            simplex,
        }
    }

    pub fn simplex(&self) -> bool {
        self.simplex
    }

    /// `POST /v1/servicenode/<hostname>` (spec.md §6).
    pub fn servicenode_request(&self, host: &HostName, action: ServiceNodeAction, admin: &str, oper: &str, avail: &str) -> RequestEvent {
        let blocking = if action.is_blocking() { Blocking::Blocking } else { Blocking::NonBlocking };
        let url = format!("{}/v1/servicenode/{}", self.base_url, host);
        RequestEvent::new(Method::Post, url, blocking, self.swact_timeout, 3)
            .with_json_payload(&ServiceNodeRequest {
                origin: &self.origin,
                action: action.as_str(),
                admin,
                oper,
                avail,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplex_mode_is_exposed_for_callers_to_gate_on() {
        let client = HaManagerClient::new("http://sm-api", 300, "controller-0", true);
        assert!(client.simplex());
    }

    #[test]
    fn query_and_swact_are_non_blocking() {
        let client = HaManagerClient::new("http://sm-api", 300, "controller-0", false);
        let req = client.servicenode_request(&HostName::from("controller-1"), ServiceNodeAction::Swact, "unlocked", "enabled", "available");
        assert_eq!(req.blocking, Blocking::NonBlocking);
    }
}
