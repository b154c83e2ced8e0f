//! Datacenter and cluster inventory lookups

use std::sync::Arc;

use log::debug;
use vc_shared_types::{ClusterInfo, MoRef};

use crate::client::VSphereClient;
use crate::error::{NotFoundError, VCenterError};
use crate::network::NetworkHandler;
use crate::switch::{DvSwitchHandler, HostSwitchHandler};
use crate::vm::VmHandler;
use crate::Result;

/// Entry point for exact-name lookups inside one datacenter
#[derive(Clone)]
pub struct DcHandler {
    client: Arc<dyn VSphereClient>,
    moref: MoRef,
    name: String,
}

impl DcHandler {
    pub async fn get(client: Arc<dyn VSphereClient>, name: &str) -> Result<Self> {
        let moref = client
            .find_datacenter(name)
            .await
            .map_err(|e| VCenterError::remote(format!("find datacenter '{}'", name), e))?
            .ok_or_else(|| NotFoundError::Datacenter {
                name: name.to_string(),
            })?;
        debug!("Resolved datacenter '{}' to {}", name, moref);
        Ok(Self {
            client,
            moref,
            name: name.to_string(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn moref(&self) -> &MoRef {
        &self.moref
    }

    pub fn client(&self) -> &Arc<dyn VSphereClient> {
        &self.client
    }

    pub async fn get_network(&self, name: &str) -> Result<NetworkHandler> {
        let networks = self
            .client
            .datacenter_networks(&self.moref)
            .await
            .map_err(|e| VCenterError::remote(format!("list networks of {}", self), e))?;
        networks
            .into_iter()
            .find(|net| net.name == name)
            .map(NetworkHandler::new)
            .ok_or_else(|| {
                NotFoundError::Network {
                    name: name.to_string(),
                    entity: self.to_string(),
                }
                .into()
            })
    }

    pub async fn get_cluster(&self, name: &str) -> Result<ClusterHandler> {
        let clusters = self
            .client
            .datacenter_clusters(&self.moref)
            .await
            .map_err(|e| VCenterError::remote(format!("list clusters of {}", self), e))?;
        clusters
            .into_iter()
            .find(|cluster| cluster.name == name)
            .map(|info| ClusterHandler::new(self.client.clone(), info))
            .ok_or_else(|| {
                NotFoundError::Cluster {
                    name: name.to_string(),
                    entity: self.to_string(),
                }
                .into()
            })
    }

    pub async fn get_dv_switch(&self, name: &str) -> Result<DvSwitchHandler> {
        let switches = self
            .client
            .datacenter_dv_switches(&self.moref)
            .await
            .map_err(|e| VCenterError::remote(format!("list switches of {}", self), e))?;
        switches
            .into_iter()
            .find(|switch| switch.name == name)
            .map(|info| DvSwitchHandler::new(self.client.clone(), info))
            .ok_or_else(|| {
                NotFoundError::DvSwitch {
                    name: name.to_string(),
                    entity: self.to_string(),
                }
                .into()
            })
    }

    pub async fn get_vm_by_uuid(&self, uuid: &str) -> Result<VmHandler> {
        self.client
            .find_vm_by_uuid(&self.moref, uuid)
            .await
            .map_err(|e| VCenterError::remote(format!("find VM {} in {}", uuid, self), e))?
            .map(|info| VmHandler::new(self.client.clone(), info))
            .ok_or_else(|| {
                NotFoundError::Vm {
                    uuid: uuid.to_string(),
                    entity: self.to_string(),
                }
                .into()
            })
    }
}

impl std::fmt::Display for DcHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Datacenter '{}'", self.name)
    }
}

#[derive(Clone)]
pub struct ClusterHandler {
    client: Arc<dyn VSphereClient>,
    info: ClusterInfo,
}

impl ClusterHandler {
    pub fn new(client: Arc<dyn VSphereClient>, info: ClusterInfo) -> Self {
        Self { client, info }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn hosts(&self) -> &[MoRef] {
        &self.info.hosts
    }

    /// First host in the cluster carrying a standard vSwitch with this name
    pub async fn get_v_switch(&self, name: &str) -> Result<HostSwitchHandler> {
        for host in &self.info.hosts {
            let vswitches = self
                .client
                .host_vswitches(host)
                .await
                .map_err(|e| VCenterError::remote(format!("list vSwitches of {}", host), e))?;
            if let Some(vswitch) = vswitches.into_iter().find(|v| v.name == name) {
                return Ok(HostSwitchHandler::new(
                    self.client.clone(),
                    host.clone(),
                    vswitch,
                ));
            }
        }
        Err(NotFoundError::VSwitch {
            name: name.to_string(),
            entity: format!("Cluster '{}'", self.info.name),
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use vc_shared_types::{DvSwitchInfo, HostVSwitchInfo};

    use super::*;
    use crate::client::MockVSphereClient;

    async fn dc(mut client: MockVSphereClient) -> DcHandler {
        client
            .expect_find_datacenter()
            .returning(|name| Ok((name == "DC1").then(|| MoRef::new("datacenter-2"))));
        DcHandler::get(Arc::new(client), "DC1").await.unwrap()
    }

    #[tokio::test]
    async fn missing_datacenter_is_not_found() {
        let mut client = MockVSphereClient::new();
        client.expect_find_datacenter().returning(|_| Ok(None));
        let err = DcHandler::get(Arc::new(client), "Nope").await.err().unwrap();
        assert!(matches!(
            err,
            VCenterError::NotFound(NotFoundError::Datacenter { .. })
        ));
    }

    #[tokio::test]
    async fn missing_vm_names_uuid_and_datacenter() {
        let mut client = MockVSphereClient::new();
        client.expect_find_vm_by_uuid().returning(|_, _| Ok(None));
        let dc = dc(client).await;
        let err = dc.get_vm_by_uuid("4207-ff").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "VM with the uuid 4207-ff in the Datacenter 'DC1' not found"
        );
    }

    #[tokio::test]
    async fn dv_switch_lookup() {
        let mut client = MockVSphereClient::new();
        client.expect_datacenter_dv_switches().returning(|_| {
            Ok(vec![DvSwitchInfo {
                moref: MoRef::new("dvs-1"),
                name: "dvSwitch-01".to_string(),
                uuid: "50 2a".to_string(),
            }])
        });
        let dc = dc(client).await;
        assert_eq!(dc.get_dv_switch("dvSwitch-01").await.unwrap().uuid(), "50 2a");
        assert!(dc
            .get_dv_switch("dvSwitch-02")
            .await
            .unwrap_err()
            .is_dv_switch_not_found());
    }

    #[tokio::test]
    async fn cluster_vswitch_found_on_second_host() {
        let mut client = MockVSphereClient::new();
        client.expect_datacenter_clusters().returning(|_| {
            Ok(vec![ClusterInfo {
                moref: MoRef::new("domain-c7"),
                name: "Cluster".to_string(),
                hosts: vec![MoRef::new("host-1"), MoRef::new("host-2")],
            }])
        });
        client.expect_host_vswitches().returning(|host| {
            if host.as_str() == "host-2" {
                Ok(vec![HostVSwitchInfo {
                    key: "key-vim.host.VirtualSwitch-vSwitch1".to_string(),
                    name: "vSwitch1".to_string(),
                }])
            } else {
                Ok(vec![])
            }
        });
        let dc = dc(client).await;
        let cluster = dc.get_cluster("Cluster").await.unwrap();
        let vswitch = cluster.get_v_switch("vSwitch1").await.unwrap();
        assert_eq!(vswitch.host().as_str(), "host-2");
        assert!(cluster.get_v_switch("vSwitch9").await.is_err());
    }
}
