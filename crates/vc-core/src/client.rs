//! Remote vSphere SDK surface consumed by the handlers

use async_trait::async_trait;
use thiserror::Error;
use vc_shared_types::{
    ClusterInfo, DvPortGroupInfo, DvPortGroupSpec, DvSwitchInfo, HostPortGroupInfo,
    HostPortGroupSpec, HostVSwitchInfo, MoRef, NetworkInfo, TaskInfo, TaskRef, VmConfigSpec,
    VmInfo,
};

/// Faults raised by the remote system for a single call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    #[error("resource in use: {0}")]
    ResourceInUse(String),

    #[error("managed object not found: {0}")]
    ObjectNotFound(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("{0}")]
    Other(String),
}

pub type RemoteResult<T> = std::result::Result<T, RemoteError>;

/// Calls the connector issues against vCenter.
///
/// Lookups return `Ok(None)` or an empty list when nothing matches; turning
/// that into a not-found error is the handlers' job. Mutating calls that
/// vCenter runs as tasks return the task reference without waiting.
#[cfg_attr(any(test, feature = "mock"), mockall::automock)]
#[async_trait]
pub trait VSphereClient: Send + Sync {
    async fn find_datacenter(&self, name: &str) -> RemoteResult<Option<MoRef>>;

    async fn datacenter_networks(&self, dc: &MoRef) -> RemoteResult<Vec<NetworkInfo>>;

    async fn datacenter_clusters(&self, dc: &MoRef) -> RemoteResult<Vec<ClusterInfo>>;

    async fn datacenter_dv_switches(&self, dc: &MoRef) -> RemoteResult<Vec<DvSwitchInfo>>;

    async fn find_vm_by_uuid(&self, dc: &MoRef, uuid: &str) -> RemoteResult<Option<VmInfo>>;

    async fn vm_info(&self, vm: &MoRef) -> RemoteResult<VmInfo>;

    async fn host_vswitches(&self, host: &MoRef) -> RemoteResult<Vec<HostVSwitchInfo>>;

    async fn host_port_groups(&self, host: &MoRef) -> RemoteResult<Vec<HostPortGroupInfo>>;

    /// Port groups of a distributed switch. Eventually consistent with
    /// completed `AddDVPortgroup_Task` runs.
    async fn dv_port_groups(&self, switch: &MoRef) -> RemoteResult<Vec<DvPortGroupInfo>>;

    async fn add_dv_port_group(
        &self,
        switch: &MoRef,
        spec: DvPortGroupSpec,
    ) -> RemoteResult<TaskRef>;

    async fn destroy_dv_port_group(&self, port_group: &MoRef) -> RemoteResult<()>;

    async fn add_host_port_group(&self, host: &MoRef, spec: HostPortGroupSpec)
        -> RemoteResult<()>;

    async fn remove_host_port_group(&self, host: &MoRef, name: &str) -> RemoteResult<()>;

    async fn reconfigure_vm(&self, vm: &MoRef, spec: VmConfigSpec) -> RemoteResult<TaskRef>;

    async fn task_info(&self, task: &TaskRef) -> RemoteResult<TaskInfo>;

    async fn cancel_task(&self, task: &TaskRef) -> RemoteResult<()>;
}
