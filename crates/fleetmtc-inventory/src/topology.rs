//! Host identity and network topology.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

use fleetmtc_types::{BmcType, NodeType};

/// Static-ish identity/topology attributes a host reports at Add time and
/// rarely changes thereafter (spec.md §3 "Identity & topology").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Topology {
    pub management_ip: IpAddr,
    pub cluster_host_ip: Option<IpAddr>,
    pub mac: String,
    pub node_type: NodeType,
    pub bmc_type: BmcType,
    pub bmc_ip: Option<IpAddr>,
    /// Opaque reference to BMC credentials; the credential bytes
    /// themselves never live on the host record (spec.md §9's shadow
    /// digest contract keeps passwords out of long-lived structs).
    pub bmc_credentials_ref: Option<String>,
    pub bmc_provisioned: bool,
}

impl Topology {
    pub fn new(management_ip: IpAddr, node_type: NodeType) -> Self {
        Self {
            management_ip,
            cluster_host_ip: None,
            mac: String::new(),
            node_type,
            bmc_type: BmcType::None,
            bmc_ip: None,
            bmc_credentials_ref: None,
            bmc_provisioned: false,
        }
    }
}
