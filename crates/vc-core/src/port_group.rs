//! Distributed and host port groups

use std::sync::Arc;

use log::{info, warn};
use vc_shared_types::{DvPortGroupInfo, HostPortGroupInfo, MoRef, VlanSpec};

use crate::client::{RemoteError, RemoteResult, VSphereClient};
use crate::error::VCenterError;
use crate::Result;

/// What a destroy request did on vCenter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestroyOutcome {
    Destroyed,
    /// vCenter refused: a VM still uses the port group
    InUse,
    AlreadyGone,
}

impl DestroyOutcome {
    pub fn is_destroyed(self) -> bool {
        self == DestroyOutcome::Destroyed
    }
}

/// Destroy a distributed port group by reference, listed or not
pub(crate) async fn destroy_dv_port_group(
    client: &dyn VSphereClient,
    port_group: &MoRef,
    name: &str,
) -> Result<DestroyOutcome> {
    let outcome = client.destroy_dv_port_group(port_group).await;
    classify_destroy(outcome, name).map_err(|e| {
        VCenterError::remote(
            format!("destroy Distributed Virtual Port Group '{}'", name),
            e,
        )
    })
}

/// Remove a host port group through the host network system
pub(crate) async fn remove_host_port_group(
    client: &dyn VSphereClient,
    host: &MoRef,
    name: &str,
) -> Result<DestroyOutcome> {
    let outcome = client.remove_host_port_group(host, name).await;
    classify_destroy(outcome, name).map_err(|e| {
        VCenterError::remote(format!("destroy Host Port Group '{}' on {}", name, host), e)
    })
}

/// Port group living on a distributed virtual switch
#[derive(Clone)]
pub struct DvPortGroupHandler {
    client: Arc<dyn VSphereClient>,
    switch: MoRef,
    info: DvPortGroupInfo,
}

impl DvPortGroupHandler {
    pub fn new(client: Arc<dyn VSphereClient>, switch: MoRef, info: DvPortGroupInfo) -> Self {
        Self {
            client,
            switch,
            info,
        }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn key(&self) -> &str {
        &self.info.key
    }

    pub fn switch_uuid(&self) -> &str {
        &self.info.switch_uuid
    }

    pub fn moref(&self) -> &MoRef {
        &self.info.moref
    }

    pub fn vlan(&self) -> &VlanSpec {
        &self.info.vlan
    }

    /// Whether any VM references the port group right now
    pub async fn is_connected(&self) -> Result<bool> {
        let port_groups = self
            .client
            .dv_port_groups(&self.switch)
            .await
            .map_err(|e| VCenterError::remote(format!("list port groups of {}", self.switch), e))?;
        Ok(port_groups
            .iter()
            .find(|pg| pg.moref == self.info.moref)
            .map(|pg| !pg.vms.is_empty())
            .unwrap_or(false))
    }

    pub async fn destroy(&self) -> Result<DestroyOutcome> {
        destroy_dv_port_group(self.client.as_ref(), &self.info.moref, &self.info.name).await
    }
}

impl std::fmt::Display for DvPortGroupHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Distributed Virtual Port Group '{}'", self.info.name)
    }
}

impl std::fmt::Debug for DvPortGroupHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DvPortGroupHandler")
            .field("switch", &self.switch)
            .field("info", &self.info)
            .finish()
    }
}

/// Port group defined on one host's standard vSwitch
#[derive(Clone)]
pub struct HostPortGroupHandler {
    client: Arc<dyn VSphereClient>,
    host: MoRef,
    info: HostPortGroupInfo,
}

impl HostPortGroupHandler {
    pub fn new(client: Arc<dyn VSphereClient>, host: MoRef, info: HostPortGroupInfo) -> Self {
        Self { client, host, info }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn vswitch_name(&self) -> &str {
        &self.info.vswitch_name
    }

    pub fn vlan_id(&self) -> u16 {
        self.info.vlan_id
    }

    pub fn host(&self) -> &MoRef {
        &self.host
    }

    pub async fn is_connected(&self) -> Result<bool> {
        let port_groups = self
            .client
            .host_port_groups(&self.host)
            .await
            .map_err(|e| VCenterError::remote(format!("list port groups of {}", self.host), e))?;
        Ok(port_groups
            .iter()
            .find(|pg| pg.name == self.info.name)
            .map(|pg| !pg.vms.is_empty())
            .unwrap_or(false))
    }

    /// Removal goes through the host network system and completes inline
    pub async fn destroy(&self) -> Result<DestroyOutcome> {
        remove_host_port_group(self.client.as_ref(), &self.host, &self.info.name).await
    }
}

impl std::fmt::Display for HostPortGroupHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Host Port Group '{}' on {}", self.info.name, self.host)
    }
}

impl std::fmt::Debug for HostPortGroupHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostPortGroupHandler")
            .field("host", &self.host)
            .field("info", &self.info)
            .finish()
    }
}

/// Either kind of port group; callers branch only to build attach specs
#[derive(Debug, Clone)]
pub enum PortGroupHandler {
    Distributed(DvPortGroupHandler),
    Host(HostPortGroupHandler),
}

impl PortGroupHandler {
    pub fn name(&self) -> &str {
        match self {
            PortGroupHandler::Distributed(pg) => pg.name(),
            PortGroupHandler::Host(pg) => pg.name(),
        }
    }

    pub async fn is_connected(&self) -> Result<bool> {
        match self {
            PortGroupHandler::Distributed(pg) => pg.is_connected().await,
            PortGroupHandler::Host(pg) => pg.is_connected().await,
        }
    }

    pub async fn destroy(&self) -> Result<DestroyOutcome> {
        match self {
            PortGroupHandler::Distributed(pg) => pg.destroy().await,
            PortGroupHandler::Host(pg) => pg.destroy().await,
        }
    }
}

impl std::fmt::Display for PortGroupHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortGroupHandler::Distributed(pg) => std::fmt::Display::fmt(pg, f),
            PortGroupHandler::Host(pg) => std::fmt::Display::fmt(pg, f),
        }
    }
}

/// In-use and not-found faults are outcomes, not errors
fn classify_destroy(outcome: RemoteResult<()>, name: &str) -> RemoteResult<DestroyOutcome> {
    match outcome {
        Ok(()) => {
            info!("Port group '{}' destroyed", name);
            Ok(DestroyOutcome::Destroyed)
        }
        Err(RemoteError::ResourceInUse(msg)) => {
            warn!("Port group '{}' is still in use, left in place: {}", name, msg);
            Ok(DestroyOutcome::InUse)
        }
        Err(RemoteError::ObjectNotFound(msg)) => {
            warn!("Port group '{}' is already gone: {}", name, msg);
            Ok(DestroyOutcome::AlreadyGone)
        }
        Err(e) => Err(e),
    }
}
