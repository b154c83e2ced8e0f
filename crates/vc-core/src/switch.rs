//! Distributed and host virtual switches

use std::sync::Arc;

use log::{info, warn};
use vc_shared_types::{
    DvPortGroupSpec, DvSwitchInfo, HostPortGroupSpec, HostVSwitchInfo, MoRef, PortGroupBinding,
    SecurityPolicy, TaskRef, VlanSpec,
};

use crate::client::VSphereClient;
use crate::error::{NotFoundError, VCenterError};
use crate::port_group::{
    destroy_dv_port_group, remove_host_port_group, DestroyOutcome, DvPortGroupHandler,
    HostPortGroupHandler, PortGroupHandler,
};
use crate::task::TaskWaiter;
use crate::vlan::{host_vlan_id, vlan_spec_to_string};
use crate::Result;

pub const DEFAULT_NUM_PORTS: u32 = 32;

/// Outcome of a port group lookup by name
#[derive(Debug, Clone)]
pub enum PortGroupLookup {
    Found(PortGroupHandler),
    Absent,
}

impl PortGroupLookup {
    pub fn into_option(self) -> Option<PortGroupHandler> {
        match self {
            PortGroupLookup::Found(pg) => Some(pg),
            PortGroupLookup::Absent => None,
        }
    }
}

/// A port group this process created.
///
/// Addressable before vCenter lists it, so a creation can be undone even
/// when the visibility wait gave up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPortGroup {
    pub name: String,
    /// Result of the creation task; host port groups are addressed by name
    pub moref: Option<MoRef>,
}

#[derive(Clone)]
pub struct DvSwitchHandler {
    client: Arc<dyn VSphereClient>,
    info: DvSwitchInfo,
}

impl DvSwitchHandler {
    pub fn new(client: Arc<dyn VSphereClient>, info: DvSwitchInfo) -> Self {
        Self { client, info }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn uuid(&self) -> &str {
        &self.info.uuid
    }

    pub fn moref(&self) -> &MoRef {
        &self.info.moref
    }

    pub async fn lookup_port_group(&self, name: &str) -> Result<Option<DvPortGroupHandler>> {
        let port_groups = self
            .client
            .dv_port_groups(&self.info.moref)
            .await
            .map_err(|e| VCenterError::remote(format!("list port groups of {}", self), e))?;
        Ok(port_groups
            .into_iter()
            .find(|pg| pg.name == name)
            .map(|pg| DvPortGroupHandler::new(self.client.clone(), self.info.moref.clone(), pg)))
    }

    pub async fn get_port_group(&self, name: &str) -> Result<DvPortGroupHandler> {
        self.lookup_port_group(name).await?.ok_or_else(|| {
            NotFoundError::DvPortGroup {
                name: name.to_string(),
                entity: self.to_string(),
            }
            .into()
        })
    }

    /// Submit an `AddDVPortgroup_Task`; the caller waits for it
    pub async fn create_port_group(
        &self,
        name: &str,
        vlan: &VlanSpec,
        promiscuous: bool,
        num_ports: u32,
    ) -> Result<TaskRef> {
        let spec = DvPortGroupSpec {
            name: name.to_string(),
            num_ports,
            binding: PortGroupBinding::EarlyBinding,
            vlan: vlan.clone(),
            security: SecurityPolicy::for_sandbox(promiscuous),
        };
        info!(
            "Creating port group '{}' (VLAN {}) on {}",
            name,
            vlan_spec_to_string(vlan),
            self
        );
        self.client
            .add_dv_port_group(&self.info.moref, spec)
            .await
            .map_err(|e| VCenterError::remote(format!("create port group {} on {}", name, self), e))
    }

    pub async fn destroy_port_group(
        &self,
        port_group: &MoRef,
        name: &str,
    ) -> Result<DestroyOutcome> {
        destroy_dv_port_group(self.client.as_ref(), port_group, name).await
    }
}

impl std::fmt::Display for DvSwitchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DistributedVirtualSwitch '{}'", self.info.name)
    }
}

impl std::fmt::Debug for DvSwitchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DvSwitchHandler").field("info", &self.info).finish()
    }
}

#[derive(Clone)]
pub struct HostSwitchHandler {
    client: Arc<dyn VSphereClient>,
    host: MoRef,
    info: HostVSwitchInfo,
}

impl HostSwitchHandler {
    pub fn new(client: Arc<dyn VSphereClient>, host: MoRef, info: HostVSwitchInfo) -> Self {
        Self { client, host, info }
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn host(&self) -> &MoRef {
        &self.host
    }

    pub async fn lookup_port_group(&self, name: &str) -> Result<Option<HostPortGroupHandler>> {
        let port_groups = self
            .client
            .host_port_groups(&self.host)
            .await
            .map_err(|e| VCenterError::remote(format!("list port groups of {}", self), e))?;
        Ok(port_groups
            .into_iter()
            .find(|pg| pg.name == name && pg.vswitch_name == self.info.name)
            .map(|pg| HostPortGroupHandler::new(self.client.clone(), self.host.clone(), pg)))
    }

    pub async fn get_port_group(&self, name: &str) -> Result<HostPortGroupHandler> {
        self.lookup_port_group(name).await?.ok_or_else(|| {
            NotFoundError::HostPortGroup {
                name: name.to_string(),
                entity: self.to_string(),
            }
            .into()
        })
    }

    /// Host port groups are added synchronously; there is no task to wait on
    pub async fn create_port_group(
        &self,
        name: &str,
        vlan: &VlanSpec,
        promiscuous: bool,
    ) -> Result<()> {
        let spec = HostPortGroupSpec {
            name: name.to_string(),
            vswitch_name: self.info.name.clone(),
            vlan_id: host_vlan_id(vlan),
            security: SecurityPolicy::for_sandbox(promiscuous),
        };
        info!("Creating port group '{}' (VLAN {}) on {}", name, spec.vlan_id, self);
        self.client
            .add_host_port_group(&self.host, spec)
            .await
            .map_err(|e| VCenterError::remote(format!("create port group {} on {}", name, self), e))
    }

    pub async fn remove_port_group(&self, name: &str) -> Result<DestroyOutcome> {
        remove_host_port_group(self.client.as_ref(), &self.host, name).await
    }
}

impl std::fmt::Display for HostSwitchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "vSwitch '{}' on {}", self.info.name, self.host)
    }
}

impl std::fmt::Debug for HostSwitchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostSwitchHandler")
            .field("host", &self.host)
            .field("info", &self.info)
            .finish()
    }
}

/// A switch that can hold sandbox port groups
#[derive(Clone)]
pub enum SwitchHandler {
    Distributed(DvSwitchHandler),
    Host(HostSwitchHandler),
}

impl SwitchHandler {
    pub fn name(&self) -> &str {
        match self {
            SwitchHandler::Distributed(switch) => switch.name(),
            SwitchHandler::Host(switch) => switch.name(),
        }
    }

    pub async fn lookup_port_group(&self, name: &str) -> Result<PortGroupLookup> {
        let found = match self {
            SwitchHandler::Distributed(switch) => switch
                .lookup_port_group(name)
                .await?
                .map(PortGroupHandler::Distributed),
            SwitchHandler::Host(switch) => switch
                .lookup_port_group(name)
                .await?
                .map(PortGroupHandler::Host),
        };
        Ok(match found {
            Some(pg) => PortGroupLookup::Found(pg),
            None => PortGroupLookup::Absent,
        })
    }

    /// Port group by name, failing with a not-found error when absent
    pub async fn get_port_group(&self, name: &str) -> Result<PortGroupHandler> {
        match self {
            SwitchHandler::Distributed(switch) => switch
                .get_port_group(name)
                .await
                .map(PortGroupHandler::Distributed),
            SwitchHandler::Host(switch) => switch
                .get_port_group(name)
                .await
                .map(PortGroupHandler::Host),
        }
    }

    /// Create a port group and wait for the creation task where there is one
    pub async fn create_port_group(
        &self,
        name: &str,
        vlan: &VlanSpec,
        promiscuous: bool,
        num_ports: u32,
        task_waiter: &TaskWaiter,
    ) -> Result<CreatedPortGroup> {
        match self {
            SwitchHandler::Distributed(switch) => {
                let task = switch
                    .create_port_group(name, vlan, promiscuous, num_ports)
                    .await?;
                let moref = task_waiter
                    .wait_for_task(&task, &format!("create port group '{}'", name))
                    .await?;
                if moref.is_none() {
                    warn!("Task {} created '{}' without returning a reference", task, name);
                }
                Ok(CreatedPortGroup {
                    name: name.to_string(),
                    moref,
                })
            }
            SwitchHandler::Host(switch) => {
                switch.create_port_group(name, vlan, promiscuous).await?;
                Ok(CreatedPortGroup {
                    name: name.to_string(),
                    moref: None,
                })
            }
        }
    }

    /// Undo `create_port_group` without relying on the port group being
    /// listed yet
    pub async fn destroy_created(&self, created: &CreatedPortGroup) -> Result<DestroyOutcome> {
        match (self, &created.moref) {
            (SwitchHandler::Distributed(switch), Some(moref)) => {
                switch.destroy_port_group(moref, &created.name).await
            }
            (SwitchHandler::Distributed(switch), None) => {
                match switch.lookup_port_group(&created.name).await? {
                    Some(port_group) => port_group.destroy().await,
                    None => {
                        warn!(
                            "Cannot address port group '{}' on {}, it is not listed",
                            created.name, switch
                        );
                        Ok(DestroyOutcome::AlreadyGone)
                    }
                }
            }
            (SwitchHandler::Host(switch), _) => switch.remove_port_group(&created.name).await,
        }
    }
}

impl std::fmt::Display for SwitchHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SwitchHandler::Distributed(switch) => std::fmt::Display::fmt(switch, f),
            SwitchHandler::Host(switch) => std::fmt::Display::fmt(switch, f),
        }
    }
}

#[cfg(test)]
mod tests {
    use vc_shared_types::{DvPortGroupInfo, HostPortGroupInfo};

    use super::*;
    use crate::client::MockVSphereClient;

    fn dvs(client: MockVSphereClient) -> DvSwitchHandler {
        DvSwitchHandler::new(
            Arc::new(client),
            DvSwitchInfo {
                moref: MoRef::new("dvs-1"),
                name: "dvSwitch-01".to_string(),
                uuid: "50 2a 11".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn absent_port_group_is_a_value_not_an_error() {
        let mut client = MockVSphereClient::new();
        client.expect_dv_port_groups().returning(|_| Ok(vec![]));
        let switch = SwitchHandler::Distributed(dvs(client));

        let lookup = switch.lookup_port_group("QS_x_VLAN_1_access").await.unwrap();
        assert!(matches!(lookup, PortGroupLookup::Absent));
        let err = switch.get_port_group("QS_x_VLAN_1_access").await.unwrap_err();
        assert!(err.is_port_group_not_found());
    }

    #[tokio::test]
    async fn distributed_create_uses_early_binding_and_sandbox_security() {
        let mut client = MockVSphereClient::new();
        client
            .expect_add_dv_port_group()
            .withf(|switch, spec| {
                switch.as_str() == "dvs-1"
                    && spec.name == "QS_dvSwitch-01_VLAN_100-200_trunk"
                    && spec.num_ports == DEFAULT_NUM_PORTS
                    && spec.binding == PortGroupBinding::EarlyBinding
                    && spec.security.allow_promiscuous
                    && spec.security.forged_transmits
                    && !spec.security.mac_changes
            })
            .times(1)
            .returning(|_, _| Ok(MoRef::new("task-5")));

        let vlan = crate::vlan::get_vlan_spec(vc_shared_types::ConnectionMode::Trunk, "100-200")
            .unwrap();
        let task = dvs(client)
            .create_port_group("QS_dvSwitch-01_VLAN_100-200_trunk", &vlan, true, DEFAULT_NUM_PORTS)
            .await
            .unwrap();
        assert_eq!(task, MoRef::new("task-5"));
    }

    #[tokio::test]
    async fn host_lookup_is_scoped_to_the_vswitch() {
        let mut client = MockVSphereClient::new();
        client.expect_host_port_groups().returning(|_| {
            Ok(vec![HostPortGroupInfo {
                key: "key-1".to_string(),
                name: "QS_vSwitch0_VLAN_5_access".to_string(),
                vswitch_name: "vSwitch1".to_string(),
                vlan_id: 5,
                security: SecurityPolicy::for_sandbox(false),
                vms: vec![],
            }])
        });
        let switch = HostSwitchHandler::new(
            Arc::new(client),
            MoRef::new("host-1"),
            HostVSwitchInfo {
                key: "key-vim.host.VirtualSwitch-vSwitch0".to_string(),
                name: "vSwitch0".to_string(),
            },
        );
        assert!(switch
            .lookup_port_group("QS_vSwitch0_VLAN_5_access")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn found_distributed_port_group_exposes_key_and_uuid() {
        let mut client = MockVSphereClient::new();
        client.expect_dv_port_groups().returning(|_| {
            Ok(vec![DvPortGroupInfo {
                moref: MoRef::new("dvportgroup-3"),
                key: "dvportgroup-3".to_string(),
                name: "QS_dvSwitch-01_VLAN_7_access".to_string(),
                switch_uuid: "50 2a 11".to_string(),
                vlan: VlanSpec::VlanId(7),
                num_ports: 32,
                security: SecurityPolicy::for_sandbox(false),
                vms: vec![],
            }])
        });
        let pg = dvs(client)
            .get_port_group("QS_dvSwitch-01_VLAN_7_access")
            .await
            .unwrap();
        assert_eq!(pg.key(), "dvportgroup-3");
        assert_eq!(pg.switch_uuid(), "50 2a 11");
    }

    #[tokio::test]
    async fn created_port_group_is_destroyed_by_reference() {
        // no listing expectation: the destroy must not depend on it
        let mut client = MockVSphereClient::new();
        client
            .expect_destroy_dv_port_group()
            .withf(|pg| pg.as_str() == "dvportgroup-8")
            .times(1)
            .returning(|_| Ok(()));
        let created = CreatedPortGroup {
            name: "QS_dvSwitch-01_VLAN_8_access".to_string(),
            moref: Some(MoRef::new("dvportgroup-8")),
        };

        let outcome = SwitchHandler::Distributed(dvs(client))
            .destroy_created(&created)
            .await
            .unwrap();
        assert_eq!(outcome, DestroyOutcome::Destroyed);
    }

    #[tokio::test]
    async fn created_host_port_group_is_removed_by_name() {
        let mut client = MockVSphereClient::new();
        client
            .expect_remove_host_port_group()
            .withf(|host, name| host.as_str() == "host-1" && name == "QS_vSwitch0_VLAN_5_access")
            .times(1)
            .returning(|_, _| Err(crate::client::RemoteError::ResourceInUse("vm-3".to_string())));
        let switch = SwitchHandler::Host(HostSwitchHandler::new(
            Arc::new(client),
            MoRef::new("host-1"),
            HostVSwitchInfo {
                key: "key-vim.host.VirtualSwitch-vSwitch0".to_string(),
                name: "vSwitch0".to_string(),
            },
        ));
        let created = CreatedPortGroup {
            name: "QS_vSwitch0_VLAN_5_access".to_string(),
            moref: None,
        };

        assert_eq!(
            switch.destroy_created(&created).await.unwrap(),
            DestroyOutcome::InUse
        );
    }
}
