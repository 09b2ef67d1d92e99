//! INI configuration loading and validation for the fleetmtc maintenance
//! controller.
//!
//! Sections mirror spec.md §6's `[agent]`, `[client]`, and `[timeouts]`
//! groups. Loading goes through [`ConfigLoader`], which merges compiled-in
//! defaults, an on-disk INI file, and environment overrides using the
//! `config` crate, then validates a bitmask of required keys before
//! deserializing into [`FleetmtcConfig`].

mod error;
mod loader;
mod required;
mod sections;

pub use error::ConfigError;
pub use loader::{load_default, load_from_file, ConfigLoader, DEFAULT_CONFIG_PATH};
pub use required::{RequiredKeys, REQUIRED};
pub use sections::{AgentConfig, AutoRecoveryPolicy, ClientConfig, FleetmtcConfig, TimeoutsConfig};
