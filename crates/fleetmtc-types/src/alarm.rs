//! Alarm identifiers and severities.
//!
//! Grounded on `mtcAlarm.h`/`mtcAlarm.cpp` (original_source) and spec.md §6
//! ("Alarm IDs (stable set)"). The abstract reference IDs and their static
//! metadata (canonical name, probable cause, reason text, repair action,
//! log-vs-alarm classification) are preserved; the publication transport
//! itself is out of scope (spec.md §1).

use serde::{Deserialize, Serialize};

/// Alarm severities, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Clear,
    Warning,
    Minor,
    Major,
    Critical,
}

/// Whether an `AlarmId` is raised/cleared against the fault-management
/// alarm service, or only ever written as a log record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlarmClass {
    Alarm,
    Log,
}

/// Stable alarm/log reference IDs (spec.md §6, `mtcAlarm.h`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmId {
    Lock,
    Config,
    Enable,
    Bm,
    ComboHostControllerFailure,
    ComboHostComputeFailure,
    LogEvent,
    LogCommand,
    LogStateChange,
}

impl AlarmId {
    /// Static metadata for this alarm, matching the fields `mtcAlarm.cpp`
    /// attaches to every raise/clear call.
    pub fn info(self) -> AlarmInfo {
        match self {
            Self::Lock => AlarmInfo {
                id: self,
                name: "host-lock",
                probable_cause: "Host has been administratively locked.",
                reason_template: "{hostname} has been locked.",
                repair_action: "Unlock the host to bring it back into service.",
                class: AlarmClass::Alarm,
            },
            Self::Config => AlarmInfo {
                id: self,
                name: "host-configuration-failure",
                probable_cause: "Host configuration does not match the expected signature.",
                reason_template: "{hostname} configuration is out of date or failed to apply.",
                repair_action: "Investigate the host's configuration agent and re-apply.",
                class: AlarmClass::Alarm,
            },
            Self::Enable => AlarmInfo {
                id: self,
                name: "host-enable-failure",
                probable_cause: "Host failed to enable within the expected time.",
                reason_template: "{hostname} failed to enable.",
                repair_action: "Investigate host services; unlock again to retry.",
                class: AlarmClass::Alarm,
            },
            Self::Bm => AlarmInfo {
                id: self,
                name: "board-management-unreachable",
                probable_cause: "The host's BMC did not respond to accessibility probes.",
                reason_template: "{hostname} board management controller is unreachable.",
                repair_action: "Verify BMC network connectivity and credentials.",
                class: AlarmClass::Alarm,
            },
            Self::ComboHostControllerFailure => AlarmInfo {
                id: self,
                name: "combo-host-controller-failure",
                probable_cause: "A combined controller+worker host's controller function failed with an active compute workload.",
                reason_template: "{hostname} controller function degraded while hosting active workloads.",
                repair_action: "Investigate controller services on this combined host.",
                class: AlarmClass::Alarm,
            },
            Self::ComboHostComputeFailure => AlarmInfo {
                id: self,
                name: "combo-host-compute-failure",
                probable_cause: "A combined controller+worker host's compute subfunction failed on the last remaining controller.",
                reason_template: "{hostname} compute subfunction degraded on the last controller.",
                repair_action: "Investigate worker services on this combined host.",
                class: AlarmClass::Alarm,
            },
            Self::LogEvent => AlarmInfo {
                id: self,
                name: "event",
                probable_cause: "",
                reason_template: "{hostname} event recorded.",
                repair_action: "",
                class: AlarmClass::Log,
            },
            Self::LogCommand => AlarmInfo {
                id: self,
                name: "command",
                probable_cause: "",
                reason_template: "{hostname} command recorded.",
                repair_action: "",
                class: AlarmClass::Log,
            },
            Self::LogStateChange => AlarmInfo {
                id: self,
                name: "state-change",
                probable_cause: "",
                reason_template: "{hostname} state change recorded.",
                repair_action: "",
                class: AlarmClass::Log,
            },
        }
    }
}

/// Full static metadata for an [`AlarmId`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmInfo {
    pub id: AlarmId,
    pub name: &'static str,
    pub probable_cause: &'static str,
    pub reason_template: &'static str,
    pub repair_action: &'static str,
    pub class: AlarmClass,
}

impl AlarmInfo {
    /// Renders the reason text template against a hostname, matching the
    /// `{hostname}` substitution `mtcAlarm.cpp` performs.
    pub fn reason_for(&self, hostname: &str) -> String {
        self.reason_template.replace("{hostname}", hostname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severities_order_clear_lowest_critical_highest() {
        assert!(Severity::Clear < Severity::Warning);
        assert!(Severity::Warning < Severity::Minor);
        assert!(Severity::Minor < Severity::Major);
        assert!(Severity::Major < Severity::Critical);
    }

    #[test]
    fn alarm_reason_substitutes_hostname() {
        let info = AlarmId::Enable.info();
        assert_eq!(info.reason_for("compute-0"), "compute-0 failed to enable.");
    }

    #[test]
    fn log_only_ids_are_not_classified_as_alarms() {
        assert_eq!(AlarmId::LogEvent.info().class, AlarmClass::Log);
        assert_eq!(AlarmId::Lock.info().class, AlarmClass::Alarm);
    }
}
