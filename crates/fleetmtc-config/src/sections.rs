//! Typed configuration sections, matching spec.md §6's `[agent]`,
//! `[client]`, and `[timeouts]` INI sections.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `[agent]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub mtc_agent_port: u16,
    pub mtc_to_hbs_cmd_port: u16,
    pub mtc_to_guest_cmd_port: u16,
    pub hbs_to_mtc_event_port: u16,
    pub keystone_port: u16,
    pub ha_port: u16,
    pub inv_event_port: u16,
    pub token_refresh_rate: u32,
    pub api_retries: u32,
    pub bmc_reset_delay: u32,
    pub autorecovery_threshold: u32,
    pub offline_period: u32,
    pub offline_threshold: u32,
    pub heartbeat_failure_action: String,
    pub mnfa_threshold: u32,
    /// Per-cause auto-recovery thresholds/intervals (`ar_<cause>_threshold`,
    /// `ar_<cause>_interval`), keyed by cause name (config, goenable,
    /// host-services, heartbeat, luks).
    pub auto_recovery: HashMap<String, AutoRecoveryPolicy>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        let mut auto_recovery = HashMap::new();
        for cause in ["config", "goenable", "host-services", "heartbeat", "luks"] {
            auto_recovery.insert(cause.to_string(), AutoRecoveryPolicy::default());
        }
        Self {
            mtc_agent_port: 2101,
            mtc_to_hbs_cmd_port: 2102,
            mtc_to_guest_cmd_port: 2103,
            hbs_to_mtc_event_port: 2104,
            keystone_port: 5000,
            ha_port: 2112,
            inv_event_port: 2110,
            token_refresh_rate: 120,
            api_retries: 3,
            bmc_reset_delay: 10,
            autorecovery_threshold: 3,
            offline_period: 10,
            offline_threshold: 3,
            heartbeat_failure_action: "failure".to_string(),
            mnfa_threshold: 2,
            auto_recovery,
        }
    }
}

/// A per-cause auto-recovery threshold/interval pair (spec.md §4.4.1
/// "Simplex auto-recovery is thresholded").
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoRecoveryPolicy {
    pub threshold: u32,
    pub interval_secs: u32,
}

impl Default for AutoRecoveryPolicy {
    fn default() -> Self {
        Self {
            threshold: 3,
            interval_secs: 600,
        }
    }
}

/// `[client]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub hwmon_cmd_port: u16,
    pub daemon_log_port: u16,
    pub mtc_rx_mgmnt_port: u16,
    pub mtc_rx_clstr_port: u16,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            hwmon_cmd_port: 2122,
            daemon_log_port: 2144,
            mtc_rx_mgmnt_port: 2101,
            mtc_rx_clstr_port: 2160,
        }
    }
}

/// `[timeouts]` section. All values are seconds unless noted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    pub failsafe_shutdown_delay: u32,
    pub mnfa_timeout: u32,
    pub dor_mode_timeout: u32,
    pub loc_recovery_timeout: u32,
    pub goenabled_timeout: u32,
    pub controller_mtcalive_timeout: u32,
    pub compute_mtcalive_timeout: u32,
    pub node_reinstall_timeout: u32,
    pub swact_timeout: u32,
    pub work_queue_timeout: u32,
    pub sysinv_timeout: u32,
    pub sysinv_noncrit_timeout: u32,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            failsafe_shutdown_delay: 30,
            mnfa_timeout: 300,
            dor_mode_timeout: 1800,
            loc_recovery_timeout: 120,
            goenabled_timeout: 300,
            controller_mtcalive_timeout: 30,
            compute_mtcalive_timeout: 30,
            node_reinstall_timeout: 1200,
            swact_timeout: 300,
            work_queue_timeout: 30,
            sysinv_timeout: 10,
            sysinv_noncrit_timeout: 30,
        }
    }
}

/// The fully merged configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetmtcConfig {
    pub agent: AgentConfig,
    pub client: ClientConfig,
    pub timeouts: TimeoutsConfig,
}
