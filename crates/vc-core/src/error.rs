//! Error types for connector operations

use std::time::Duration;

use thiserror::Error;
use vc_shared_types::SharedTypeError;

use crate::client::RemoteError;

/// Main error type for connector operations
#[derive(Debug, Error)]
pub enum VCenterError {
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("VM {vm} has no vNIC with a MAC address")]
    NoVnics { vm: String },

    #[error("No vNIC available on VM {vm}")]
    NoVnicAvailable { vm: String },

    #[error("vNIC '{vnic}' of VM {vm} is not attached to any network")]
    VnicWithoutNetwork { vnic: String, vm: String },

    #[error("VMWare Tools are not installed or running on VM '{vm}'")]
    VmwareToolsNotInstalled { vm: String },

    #[error("Task '{operation}' failed: {message}")]
    TaskFault { operation: String, message: String },

    #[error("Invalid VLAN '{value}': {reason}")]
    InvalidVlan { value: String, reason: String },

    #[error("vCenter call {operation} failed: {source}")]
    Remote {
        operation: String,
        #[source]
        source: RemoteError,
    },

    #[error("Invalid request: {0}")]
    Request(#[from] SharedTypeError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Missing or wrong resource settings, detected before any remote call
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("For connectivity actions you have to specify default DvSwitch")]
    DvSwitchNameEmpty,

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid configuration value for {field}: {value}")]
    InvalidValue { field: String, value: String },
}

/// Objects absent from the inventory
#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("Datacenter '{name}' not found")]
    Datacenter { name: String },

    #[error("Cluster '{name}' not found in {entity}")]
    Cluster { name: String, entity: String },

    #[error("VM with the uuid {uuid} in the {entity} not found")]
    Vm { uuid: String, entity: String },

    #[error("Network {name} not found in {entity}")]
    Network { name: String, entity: String },

    #[error("DistributedVirtualSwitch with name {name} not found in {entity}")]
    DvSwitch { name: String, entity: String },

    #[error("vSwitch with name {name} not found in {entity}")]
    VSwitch { name: String, entity: String },

    #[error("Distributed Virtual Port Group {name} not found in {entity}")]
    DvPortGroup { name: String, entity: String },

    #[error("Host Port Group with name {name} not found in {entity}")]
    HostPortGroup { name: String, entity: String },

    #[error("Port Group {name} not found in {entity} after waiting {waited:?}")]
    PortGroupNotVisible {
        name: String,
        entity: String,
        waited: Duration,
    },

    #[error("vNIC with mac address {mac} not found in the {entity}")]
    VnicWithMac { mac: String, entity: String },
}

impl VCenterError {
    pub fn remote(operation: impl Into<String>, source: RemoteError) -> Self {
        VCenterError::Remote {
            operation: operation.into(),
            source,
        }
    }

    /// True for every flavour of "port group not found", including the
    /// visibility timeout
    pub fn is_port_group_not_found(&self) -> bool {
        matches!(
            self,
            VCenterError::NotFound(
                NotFoundError::DvPortGroup { .. }
                    | NotFoundError::HostPortGroup { .. }
                    | NotFoundError::PortGroupNotVisible { .. }
            )
        )
    }

    pub fn is_dv_switch_not_found(&self) -> bool {
        matches!(self, VCenterError::NotFound(NotFoundError::DvSwitch { .. }))
    }
}
