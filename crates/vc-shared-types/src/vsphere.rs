//! Snapshots of the vSphere managed objects the connector works with.
//!
//! These mirror the subset of the vSphere object model that the
//! connectivity flow reads or submits. They are plain data; all behaviour
//! lives in the handlers of `vc-core`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Managed object reference (`vm-42`, `dvportgroup-17`, `task-903`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MoRef(pub String);

impl MoRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MoRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Tasks are managed objects as well
pub type TaskRef = MoRef;

/// Remote task lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskState {
    Queued,
    Running,
    Success,
    Error,
}

impl TaskState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskState::Success | TaskState::Error)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskError {
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub fault_messages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub key: TaskRef,
    pub description: String,
    pub state: TaskState,
    /// Object produced by the task, e.g. a cloned VM
    #[serde(default)]
    pub result: Option<MoRef>,
    #[serde(default)]
    pub error: Option<TaskError>,
    #[serde(default)]
    pub cancelable: bool,
    #[serde(default)]
    pub cancelled: bool,
    pub queue_time: DateTime<Utc>,
    #[serde(default)]
    pub complete_time: Option<DateTime<Utc>>,
}

/// What a network entry of a datacenter or VM actually is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum NetworkKind {
    /// Plain network, including networks backed by host port groups
    Standard,
    /// Distributed virtual port group
    #[serde(rename_all = "camelCase")]
    DistributedPortGroup { key: String, switch_uuid: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInfo {
    pub moref: MoRef,
    pub name: String,
    pub kind: NetworkKind,
}

impl NetworkInfo {
    pub fn port_group_key(&self) -> Option<&str> {
        match &self.kind {
            NetworkKind::DistributedPortGroup { key, .. } => Some(key),
            NetworkKind::Standard => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DvSwitchInfo {
    pub moref: MoRef,
    pub name: String,
    pub uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterInfo {
    pub moref: MoRef,
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<MoRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostVSwitchInfo {
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityPolicy {
    pub allow_promiscuous: bool,
    pub forged_transmits: bool,
    pub mac_changes: bool,
}

impl SecurityPolicy {
    /// Policy applied to every port group the connector creates
    pub fn for_sandbox(promiscuous: bool) -> Self {
        Self {
            allow_promiscuous: promiscuous,
            forged_transmits: true,
            mac_changes: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumericRange {
    pub start: u16,
    pub end: u16,
}

/// VLAN policy of a distributed port group.
///
/// `VlanId` corresponds to `VlanIdSpec` (access ports), `Trunk` to
/// `TrunkVlanSpec`, a list of inclusive numeric ranges.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VlanSpec {
    VlanId(u16),
    Trunk(Vec<NumericRange>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PortGroupBinding {
    EarlyBinding,
    LateBinding,
    Ephemeral,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DvPortGroupSpec {
    pub name: String,
    pub num_ports: u32,
    pub binding: PortGroupBinding,
    pub vlan: VlanSpec,
    pub security: SecurityPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DvPortGroupInfo {
    pub moref: MoRef,
    pub key: String,
    pub name: String,
    pub switch_uuid: String,
    pub vlan: VlanSpec,
    pub num_ports: u32,
    pub security: SecurityPolicy,
    /// VMs with at least one adapter on this port group
    #[serde(default)]
    pub vms: Vec<MoRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPortGroupSpec {
    pub name: String,
    pub vswitch_name: String,
    pub vlan_id: u16,
    pub security: SecurityPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostPortGroupInfo {
    pub key: String,
    pub name: String,
    pub vswitch_name: String,
    pub vlan_id: u16,
    pub security: SecurityPolicy,
    #[serde(default)]
    pub vms: Vec<MoRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectInfo {
    pub connected: bool,
    pub start_connected: bool,
}

/// Backing of a virtual ethernet card
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum VnicBacking {
    #[default]
    None,
    #[serde(rename_all = "camelCase")]
    Network { network: MoRef, device_name: String },
    #[serde(rename_all = "camelCase")]
    DistributedPort {
        port_group_key: String,
        switch_uuid: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNicDevice {
    pub key: i32,
    pub label: String,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub backing: VnicBacking,
    #[serde(default)]
    pub connectable: ConnectInfo,
    #[serde(default)]
    pub wake_on_lan_enabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeviceOperation {
    Add,
    Edit,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualDeviceSpec {
    pub operation: DeviceOperation,
    pub device: VirtualNicDevice,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmConfigSpec {
    pub device_change: Vec<VirtualDeviceSpec>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerState {
    PoweredOn,
    PoweredOff,
    Suspended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ToolsStatus {
    ToolsOk,
    ToolsOld,
    ToolsNotRunning,
    ToolsNotInstalled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmInfo {
    pub moref: MoRef,
    pub name: String,
    pub uuid: String,
    pub host: MoRef,
    pub power_state: PowerState,
    pub tools_status: ToolsStatus,
    /// Networks the VM is attached to
    #[serde(default)]
    pub networks: Vec<NetworkInfo>,
    #[serde(default)]
    pub nics: Vec<VirtualNicDevice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_state_terminality() {
        assert!(!TaskState::Queued.is_terminal());
        assert!(!TaskState::Running.is_terminal());
        assert!(TaskState::Success.is_terminal());
        assert!(TaskState::Error.is_terminal());
    }

    #[test]
    fn vnic_backing_wire_shape() {
        let backing = VnicBacking::DistributedPort {
            port_group_key: "dvportgroup-10".to_string(),
            switch_uuid: "50 2a".to_string(),
        };
        let value = serde_json::to_value(&backing).unwrap();
        assert_eq!(value["type"], "distributedPort");
        assert_eq!(value["portGroupKey"], "dvportgroup-10");
    }

    #[test]
    fn network_port_group_key() {
        let net = NetworkInfo {
            moref: MoRef::new("dvportgroup-10"),
            name: "QS_dvs_VLAN_10_access".to_string(),
            kind: NetworkKind::DistributedPortGroup {
                key: "dvportgroup-10".to_string(),
                switch_uuid: "uuid".to_string(),
            },
        };
        assert_eq!(net.port_group_key(), Some("dvportgroup-10"));
    }
}
