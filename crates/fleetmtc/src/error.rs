use thiserror::Error;

use fleetmtc_inventory::InventoryError;
use fleetmtc_types::HostName;

#[derive(Debug, Error)]
pub enum FleetmtcError {
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    #[error(transparent)]
    Config(#[from] fleetmtc_config::ConfigError),

    #[error("I/O setup failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("host {0} has no BMC worker provisioned")]
    NoBmcWorker(HostName),

    #[error("metrics registration failed: {0}")]
    Metrics(#[from] prometheus::Error),
}

pub type Result<T> = std::result::Result<T, FleetmtcError>;
