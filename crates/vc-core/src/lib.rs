//! vCenter connector core
//!
//! Handlers over the remote vSphere client, task waiting, VLAN encoding and
//! the port group naming rule shared by connect and disconnect.

pub mod client;
pub mod dc;
pub mod error;
pub mod naming;
pub mod network;
pub mod poll;
pub mod port_group;
pub mod switch;
pub mod task;
pub mod vlan;
pub mod vm;
pub mod vnic;

pub use client::{RemoteError, RemoteResult, VSphereClient};
pub use dc::{ClusterHandler, DcHandler};
pub use error::{ConfigError, NotFoundError, VCenterError};
pub use naming::{generate_port_group_name, is_network_generated_name};
pub use network::NetworkHandler;
pub use port_group::{DestroyOutcome, DvPortGroupHandler, HostPortGroupHandler, PortGroupHandler};
pub use switch::{
    CreatedPortGroup, DvSwitchHandler, HostSwitchHandler, PortGroupLookup, SwitchHandler,
};
pub use task::TaskWaiter;
pub use vlan::get_vlan_spec;
pub use vm::VmHandler;
pub use vnic::VnicHandler;

/// Result type for connector operations
pub type Result<T> = std::result::Result<T, VCenterError>;
