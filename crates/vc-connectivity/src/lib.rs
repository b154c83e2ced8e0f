//! Connectivity orchestration
//!
//! Wires VM adapters into per-VLAN port groups and takes them out again.
//! Port groups are shared by every VM on the same VLAN and mode: the first
//! connect creates one, the last disconnect destroys it.

pub mod compensation;
pub mod flow;
pub mod request;


pub use compensation::{
    remove_port_group_if_unused, DestroyPortGroupCommand, PendingAttaches, PortGroupLock,
};
pub use flow::{ConnectResult, ConnectivityFlow, DisconnectResult};
pub use request::{REMOVE_VLAN_MESSAGE, SET_VLAN_MESSAGE};
