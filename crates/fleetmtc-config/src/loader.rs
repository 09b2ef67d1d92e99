//! Multi-source configuration loading.
//!
//! A builder-of-sources approach, layered per the INI file format spec.md
//! §6 specifies: defaults are
//! supplied as an in-memory source, the on-disk `.conf` file is layered on
//! top via `config::File` with `FileFormat::Ini`, and environment variables
//! (`FLEETMTC_<SECTION>_<KEY>`) take final precedence. We never hand-roll an
//! INI parser; the `config` crate does that.

use std::path::{Path, PathBuf};

use config::{Environment, File, FileFormat};
use tracing::{debug, info, warn};

use crate::error::ConfigError;
use crate::required;
use crate::sections::FleetmtcConfig;

/// The conventional install location, matching spec.md §6.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/fleetmtc/fleetmtc.conf";

const ENV_PREFIX: &str = "FLEETMTC";

/// Builds a [`FleetmtcConfig`] by layering sources in ascending precedence:
/// compiled-in defaults, an optional INI file, then environment overrides.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { path: None }
    }

    /// Points the loader at a specific config file instead of
    /// [`DEFAULT_CONFIG_PATH`]. Absent entirely is fine — defaults plus env
    /// overrides are a valid configuration on their own, matching the
    /// teacher loader's tolerance for a missing project/local file.
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn load(&self) -> Result<FleetmtcConfig, ConfigError> {
        let defaults = FleetmtcConfig::default();

        let mut builder = config::Config::builder().add_source(
            config::Config::try_from(&defaults)
                .map_err(|e| ConfigError::MergeError(e.to_string()))?,
        );

        let path = self
            .path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));

        if path.exists() {
            debug!(path = %path.display(), "loading fleetmtc config file");
            builder = builder.add_source(File::from(path.clone()).format(FileFormat::Ini));
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("_")
                .try_parsing(true),
        );

        let merged = builder
            .build()
            .map_err(|e| ConfigError::MergeError(e.to_string()))?;

        required::validate(&merged)?;

        let config: FleetmtcConfig = merged
            .try_deserialize()
            .map_err(|e| ConfigError::DeserializeError(e.to_string()))?;

        info!(
            mtc_agent_port = config.agent.mtc_agent_port,
            mnfa_threshold = config.agent.mnfa_threshold,
            "fleetmtc configuration loaded"
        );

        Ok(config)
    }
}

/// Convenience wrapper for the common case: load from the default path.
pub fn load_default() -> Result<FleetmtcConfig, ConfigError> {
    ConfigLoader::new().load()
}

/// Loads from an explicit path, failing loudly if it doesn't exist — used
/// by the CLI's `config check <path>` subcommand where a missing file is a
/// user error rather than "fall back to defaults".
pub fn load_from_file(path: &Path) -> Result<FleetmtcConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ReadError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
        });
    }
    ConfigLoader::new().with_path(path.to_path_buf()).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_defaults_when_file_absent() {
        let loader = ConfigLoader::new().with_path("/nonexistent/fleetmtc.conf");
        let config = loader.load().expect("defaults alone must validate");
        assert_eq!(config.agent.mtc_agent_port, 2101);
        assert_eq!(config.timeouts.swact_timeout, 300);
    }

    #[test]
    fn file_values_override_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[agent]\nmtc_agent_port = 3101\nmnfa_threshold = 5\n"
        )
        .unwrap();

        let config = ConfigLoader::new()
            .with_path(file.path())
            .load()
            .expect("file-backed load must succeed");

        assert_eq!(config.agent.mtc_agent_port, 3101);
        assert_eq!(config.agent.mnfa_threshold, 5);
        // untouched keys still come from defaults
        assert_eq!(config.client.hwmon_cmd_port, 2122);
    }

    #[test]
    fn load_from_file_rejects_missing_path() {
        let err = load_from_file(Path::new("/nonexistent/fleetmtc.conf")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadError { .. }));
    }
}
