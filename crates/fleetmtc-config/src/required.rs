//! Required-key validation.
//!
//! Spec.md §6: "A bitmask of required keys is validated after load; missing
//! required keys fail startup." We validate against the raw merged
//! `config::Config` (before typed deserialization) so a key that's present
//! but of the wrong shape still fails deserialization separately, and a key
//! that's simply absent is reported here with its name.

use bitflags::bitflags;

use crate::error::ConfigError;

bitflags! {
    /// One bit per required key. A key's absence after the multi-source
    /// merge clears its bit; any cleared bit fails startup.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RequiredKeys: u32 {
        const MTC_AGENT_PORT           = 1 << 0;
        const MTC_RX_MGMNT_PORT        = 1 << 1;
        const GOENABLED_TIMEOUT        = 1 << 2;
        const SWACT_TIMEOUT            = 1 << 3;
        const WORK_QUEUE_TIMEOUT       = 1 << 4;
        const SYSINV_TIMEOUT           = 1 << 5;
        const MNFA_THRESHOLD           = 1 << 6;
        const MNFA_TIMEOUT             = 1 << 7;
    }
}

/// The full set of required keys, with the config path used to look each
/// one up and report a readable error on failure.
pub const REQUIRED: &[(RequiredKeys, &str)] = &[
    (RequiredKeys::MTC_AGENT_PORT, "agent.mtc_agent_port"),
    (RequiredKeys::MTC_RX_MGMNT_PORT, "client.mtc_rx_mgmnt_port"),
    (RequiredKeys::GOENABLED_TIMEOUT, "timeouts.goenabled_timeout"),
    (RequiredKeys::SWACT_TIMEOUT, "timeouts.swact_timeout"),
    (RequiredKeys::WORK_QUEUE_TIMEOUT, "timeouts.work_queue_timeout"),
    (RequiredKeys::SYSINV_TIMEOUT, "timeouts.sysinv_timeout"),
    (RequiredKeys::MNFA_THRESHOLD, "agent.mnfa_threshold"),
    (RequiredKeys::MNFA_TIMEOUT, "timeouts.mnfa_timeout"),
];

/// Validates that every required key resolved to a value in the merged
/// configuration. Returns the set of keys that were actually present.
pub fn validate(merged: &config::Config) -> Result<RequiredKeys, ConfigError> {
    let mut present = RequiredKeys::empty();
    let mut missing = Vec::new();

    for (bit, path) in REQUIRED {
        if merged.get_string(path).is_ok() || merged.get::<i64>(path).is_ok() {
            present.insert(*bit);
        } else {
            missing.push(*path);
        }
    }

    if !missing.is_empty() {
        return Err(ConfigError::MissingRequiredKeys(missing.join(", ")));
    }

    Ok(present)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_keys_bitmask_has_one_bit_per_entry() {
        let mut seen = RequiredKeys::empty();
        for (bit, _) in REQUIRED {
            assert!(!seen.contains(*bit), "duplicate bit in REQUIRED table");
            seen.insert(*bit);
        }
        assert_eq!(seen, RequiredKeys::all());
    }

    #[test]
    fn validate_passes_against_defaults() {
        let defaults = crate::sections::FleetmtcConfig::default();
        let builder = config::Config::builder()
            .add_source(config::Config::try_from(&defaults).unwrap())
            .build()
            .unwrap();
        let present = validate(&builder).unwrap();
        assert_eq!(present, RequiredKeys::all());
    }
}
