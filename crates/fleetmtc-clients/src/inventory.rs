//! Inventory API client (spec.md §4.6 "Inventory").
//!
//! Critical calls (state/task/uptime updates) use `sysinv_timeout`;
//! non-critical calls (uptime refresh) use `sysinv_noncrit_timeout`.
//! Retries are bounded by `api_retries` from `[agent]`.

use std::time::Duration;

use serde::Serialize;

use fleetmtc_types::HostName;

use crate::request::{Blocking, Method, RequestEvent};

#[derive(Debug, Serialize)]
struct StateUpdate<'a> {
    admin: &'a str,
    oper: &'a str,
    avail: &'a str,
}

#[derive(Debug, Serialize)]
struct TaskUpdate<'a> {
    task: &'a str,
}

#[derive(Debug, Serialize)]
struct UptimeUpdate {
    uptime: u64,
}

#[derive(Debug, Serialize)]
struct SubfStateUpdate<'a> {
    subfunction_oper: &'a str,
    subfunction_avail: &'a str,
}

#[derive(Debug, Serialize)]
struct RootCredentialUpdate<'a> {
    signature: &'a str,
}

pub struct InventoryClient {
    base_url: String,
    sysinv_timeout: Duration,
    sysinv_noncrit_timeout: Duration,
    api_retries: u32,
}

impl InventoryClient {
    pub fn new(base_url: impl Into<String>, sysinv_timeout_secs: u64, sysinv_noncrit_timeout_secs: u64, api_retries: u32) -> Self {
        Self {
            base_url: base_url.into(),
            sysinv_timeout: Duration::from_secs(sysinv_timeout_secs),
            sysinv_noncrit_timeout: Duration::from_secs(sysinv_noncrit_timeout_secs),
            api_retries,
        }
    }

    fn host_url(&self, host: &HostName) -> String {
        format!("{}/v1/ihosts/{}", self.base_url, host)
    }

    /// Critical: state-triplet update.
    pub fn state_update(&self, host: &HostName, admin: &str, oper: &str, avail: &str) -> RequestEvent {
        RequestEvent::new(Method::Patch, self.host_url(host), Blocking::Blocking, self.sysinv_timeout, self.api_retries)
            .with_json_payload(&StateUpdate { admin, oper, avail })
    }

    /// Critical: subfunction state-pair update.
    pub fn subf_state_update(&self, host: &HostName, oper: &str, avail: &str) -> RequestEvent {
        RequestEvent::new(Method::Patch, self.host_url(host), Blocking::Blocking, self.sysinv_timeout, self.api_retries)
            .with_json_payload(&SubfStateUpdate {
                subfunction_oper: oper,
                subfunction_avail: avail,
            })
    }

    /// Critical: user-visible task-string update.
    pub fn task_update(&self, host: &HostName, task: &str) -> RequestEvent {
        RequestEvent::new(Method::Patch, self.host_url(host), Blocking::Blocking, self.sysinv_timeout, self.api_retries)
            .with_json_payload(&TaskUpdate { task })
    }

    /// Non-critical: periodic uptime refresh (spec.md §4.4.9 "Uptime audit").
    pub fn uptime_update(&self, host: &HostName, uptime_secs: u64) -> RequestEvent {
        RequestEvent::new(Method::Patch, self.host_url(host), Blocking::NonBlocking, self.sysinv_noncrit_timeout, self.api_retries)
            .with_json_payload(&UptimeUpdate { uptime: uptime_secs })
    }

    /// Critical: full host record load (Add FSM).
    pub fn load_host(&self, host: &HostName) -> RequestEvent {
        RequestEvent::new(Method::Get, self.host_url(host), Blocking::Blocking, self.sysinv_timeout, self.api_retries)
    }

    /// Critical: root credential signature modify (config audit, spec.md
    /// §4.4.9).
    pub fn modify_root_credential(&self, host: &HostName, signature: &str) -> RequestEvent {
        let url = format!("{}/modify", self.host_url(host));
        RequestEvent::new(Method::Patch, url, Blocking::Blocking, self.sysinv_timeout, self.api_retries)
            .with_json_payload(&RootCredentialUpdate { signature })
    }

    /// Critical: root credential signature lookup (config audit, spec.md
    /// §4.4.9 "Requests the root credential signature from inventory").
    pub fn root_credential_signature(&self, host: &HostName) -> RequestEvent {
        let url = format!("{}/signature", self.host_url(host));
        RequestEvent::new(Method::Get, url, Blocking::Blocking, self.sysinv_timeout, self.api_retries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_update_targets_the_host_resource() {
        let client = InventoryClient::new("http://sysinv:6385", 10, 30, 3);
        let req = client.state_update(&HostName::from("compute-0"), "unlocked", "enabled", "available");
        assert_eq!(req.url, "http://sysinv:6385/v1/ihosts/compute-0");
        assert_eq!(req.retries_remaining, 3);
    }
}
