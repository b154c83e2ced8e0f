//! Virtual machine handling

use std::sync::Arc;

use log::{debug, info};
use vc_shared_types::{MacAddr, MoRef, ToolsStatus, VmConfigSpec, VmInfo, VnicBacking};

use crate::client::VSphereClient;
use crate::error::{NotFoundError, VCenterError};
use crate::naming::is_network_generated_name;
use crate::network::NetworkHandler;
use crate::port_group::DvPortGroupHandler;
use crate::switch::HostSwitchHandler;
use crate::task::TaskWaiter;
use crate::vnic::VnicHandler;
use crate::Result;

/// A VM snapshot plus the client to act on it
#[derive(Clone)]
pub struct VmHandler {
    client: Arc<dyn VSphereClient>,
    info: VmInfo,
}

impl VmHandler {
    pub fn new(client: Arc<dyn VSphereClient>, info: VmInfo) -> Self {
        Self { client, info }
    }

    pub fn uuid(&self) -> &str {
        &self.info.uuid
    }

    pub fn name(&self) -> &str {
        &self.info.name
    }

    pub fn moref(&self) -> &MoRef {
        &self.info.moref
    }

    pub fn host(&self) -> &MoRef {
        &self.info.host
    }

    pub fn info(&self) -> &VmInfo {
        &self.info
    }

    pub fn vnics(&self) -> Vec<VnicHandler> {
        self.info.nics.iter().cloned().map(VnicHandler::new).collect()
    }

    /// At least one adapter carries a MAC; VMs still being provisioned don't
    pub fn has_vnics(&self) -> bool {
        self.vnics().iter().any(|vnic| vnic.mac_address().is_some())
    }

    pub fn validate_has_vnics(&self) -> Result<()> {
        if self.has_vnics() {
            Ok(())
        } else {
            Err(VCenterError::NoVnics {
                vm: self.to_string(),
            })
        }
    }

    pub fn get_vnic_by_mac(&self, mac_address: &str) -> Result<VnicHandler> {
        let mac: MacAddr = mac_address.parse()?;
        self.vnics()
            .into_iter()
            .find(|vnic| vnic.has_mac_address(&mac))
            .ok_or_else(|| {
                NotFoundError::VnicWithMac {
                    mac: mac_address.to_string(),
                    entity: self.to_string(),
                }
                .into()
            })
    }

    pub fn get_vnic_by_key(&self, key: i32) -> Option<VnicHandler> {
        self.vnics().into_iter().find(|vnic| vnic.key() == key)
    }

    /// Network the adapter is currently backed by, if any
    pub fn get_network_from_vnic(&self, vnic: &VnicHandler) -> Option<NetworkHandler> {
        match &vnic.device().backing {
            VnicBacking::Network { network, .. } => self
                .info
                .networks
                .iter()
                .find(|net| &net.moref == network)
                .cloned()
                .map(NetworkHandler::new),
            VnicBacking::DistributedPort { port_group_key, .. } => self
                .info
                .networks
                .iter()
                .find(|net| net.port_group_key() == Some(port_group_key.as_str()))
                .cloned()
                .map(NetworkHandler::new),
            VnicBacking::None => None,
        }
    }

    /// Name of the adapter's current network, empty when it has none
    pub fn get_network_name_from_vnic(&self, vnic: &VnicHandler) -> String {
        if let Some(name) = vnic.network_name() {
            return name.to_string();
        }
        self.get_network_from_vnic(vnic)
            .map(|net| net.name().to_string())
            .unwrap_or_default()
    }

    /// Pick an adapter to wire into a sandbox network.
    ///
    /// Adapters with no network or parked on the holding network come first,
    /// then adapters on any network that is neither reserved nor generated by
    /// this connector. A selector restricts the choice to one adapter.
    pub fn get_available_vnic(
        &self,
        holding_network: &str,
        reserved_networks: &[String],
        selector: Option<&str>,
    ) -> Result<VnicHandler> {
        let candidates: Vec<(VnicHandler, String)> = self
            .vnics()
            .into_iter()
            .filter(|vnic| selector.map(|s| vnic.matches_label(s)).unwrap_or(true))
            .map(|vnic| {
                let network = self.get_network_name_from_vnic(&vnic);
                (vnic, network)
            })
            .collect();

        let parked = candidates
            .iter()
            .find(|(_, network)| network.is_empty() || network == holding_network);
        let chosen = parked.or_else(|| {
            candidates.iter().find(|(_, network)| {
                !is_network_generated_name(network)
                    && !reserved_networks.iter().any(|reserved| reserved == network)
            })
        });

        match chosen {
            Some((vnic, network)) => {
                debug!("Selected {} on '{}' of {}", vnic, network, self);
                Ok(vnic.clone())
            }
            None => Err(VCenterError::NoVnicAvailable {
                vm: self.to_string(),
            }),
        }
    }

    pub async fn connect_vnic_to_port_group(
        &self,
        vnic: &VnicHandler,
        port_group: &DvPortGroupHandler,
        task_waiter: &TaskWaiter,
    ) -> Result<()> {
        info!("Connecting {} of {} to {}", vnic, self, port_group);
        let spec = vnic.create_spec_for_connection_port_group(port_group);
        self.reconfigure(spec, &format!("connect {} to {}", vnic, port_group), task_waiter)
            .await
    }

    /// Wire the adapter to the network backing a host port group
    pub async fn connect_vnic_to_host_port_group(
        &self,
        vnic: &VnicHandler,
        network: &NetworkHandler,
        task_waiter: &TaskWaiter,
    ) -> Result<()> {
        info!("Connecting {} of {} to {}", vnic, self, network);
        let spec = vnic.create_spec_for_connection_host_port_group(network);
        self.reconfigure(spec, &format!("connect {} to {}", vnic, network), task_waiter)
            .await
    }

    /// Park the adapter on a plain network, disconnected
    pub async fn connect_vnic_to_network(
        &self,
        vnic: &VnicHandler,
        network: &NetworkHandler,
        task_waiter: &TaskWaiter,
    ) -> Result<()> {
        info!("Moving {} of {} to {}", vnic, self, network);
        let spec = vnic.create_spec_for_connection_network(network);
        self.reconfigure(spec, &format!("connect {} to {}", vnic, network), task_waiter)
            .await
    }

    async fn reconfigure(
        &self,
        spec: VmConfigSpec,
        operation: &str,
        task_waiter: &TaskWaiter,
    ) -> Result<()> {
        let task = self
            .client
            .reconfigure_vm(&self.info.moref, spec)
            .await
            .map_err(|e| VCenterError::remote(format!("{} on {}", operation, self), e))?;
        task_waiter.wait_for_task(&task, operation).await?;
        Ok(())
    }

    /// Standard vSwitch of the VM's host
    pub async fn get_v_switch(&self, name: &str) -> Result<HostSwitchHandler> {
        let vswitches = self
            .client
            .host_vswitches(&self.info.host)
            .await
            .map_err(|e| VCenterError::remote(format!("list vSwitches of {}", self.info.host), e))?;
        vswitches
            .into_iter()
            .find(|vswitch| vswitch.name == name)
            .map(|vswitch| {
                HostSwitchHandler::new(self.client.clone(), self.info.host.clone(), vswitch)
            })
            .ok_or_else(|| {
                NotFoundError::VSwitch {
                    name: name.to_string(),
                    entity: format!("host {}", self.info.host),
                }
                .into()
            })
    }

    /// Re-read the VM so device and network changes become visible
    pub async fn refresh(&mut self) -> Result<()> {
        self.info = self
            .client
            .vm_info(&self.info.moref)
            .await
            .map_err(|e| VCenterError::remote(format!("refresh {}", self), e))?;
        Ok(())
    }

    pub fn validate_guest_tools_installed(&self) -> Result<()> {
        match self.info.tools_status {
            ToolsStatus::ToolsOk | ToolsStatus::ToolsOld => Ok(()),
            ToolsStatus::ToolsNotRunning | ToolsStatus::ToolsNotInstalled => {
                Err(VCenterError::VmwareToolsNotInstalled {
                    vm: self.info.name.clone(),
                })
            }
        }
    }
}

impl std::fmt::Display for VmHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VM '{}' ({})", self.info.name, self.info.uuid)
    }
}

impl std::fmt::Debug for VmHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VmHandler").field("info", &self.info).finish()
    }
}

#[cfg(test)]
mod tests {
    use vc_shared_types::{
        ConnectInfo, NetworkInfo, NetworkKind, PowerState, VirtualNicDevice,
    };

    use super::*;
    use crate::client::MockVSphereClient;

    fn nic(key: i32, label: &str, mac: Option<&str>, backing: VnicBacking) -> VirtualNicDevice {
        VirtualNicDevice {
            key,
            label: label.to_string(),
            mac_address: mac.map(str::to_string),
            backing,
            connectable: ConnectInfo::default(),
            wake_on_lan_enabled: false,
        }
    }

    fn on_network(moref: &str, name: &str) -> VnicBacking {
        VnicBacking::Network {
            network: MoRef::new(moref),
            device_name: name.to_string(),
        }
    }

    fn vm(nics: Vec<VirtualNicDevice>) -> VmHandler {
        VmHandler::new(
            Arc::new(MockVSphereClient::new()),
            VmInfo {
                moref: MoRef::new("vm-7"),
                name: "web-01".to_string(),
                uuid: "4207-aa".to_string(),
                host: MoRef::new("host-1"),
                power_state: PowerState::PoweredOn,
                tools_status: ToolsStatus::ToolsOk,
                networks: vec![
                    NetworkInfo {
                        moref: MoRef::new("network-1"),
                        name: "Holding".to_string(),
                        kind: NetworkKind::Standard,
                    },
                    NetworkInfo {
                        moref: MoRef::new("dvportgroup-4"),
                        name: "QS_dvs_VLAN_4_access".to_string(),
                        kind: NetworkKind::DistributedPortGroup {
                            key: "dvportgroup-4".to_string(),
                            switch_uuid: "u".to_string(),
                        },
                    },
                ],
                nics,
            },
        )
    }

    #[test]
    fn no_mac_means_no_vnics() {
        let vm = vm(vec![nic(4000, "Network adapter 1", None, VnicBacking::None)]);
        assert!(!vm.has_vnics());
        assert!(matches!(vm.validate_has_vnics(), Err(VCenterError::NoVnics { .. })));
    }

    #[test]
    fn vnic_lookup_by_mac_ignores_case() {
        let vm = vm(vec![nic(
            4000,
            "Network adapter 1",
            Some("00:50:56:aa:bb:cc"),
            on_network("network-1", "Holding"),
        )]);
        assert_eq!(vm.get_vnic_by_mac("00:50:56:AA:BB:CC").unwrap().key(), 4000);
        let err = vm.get_vnic_by_mac("00:50:56:00:00:01").unwrap_err();
        assert!(err.to_string().contains("00:50:56:00:00:01"));
    }

    #[test]
    fn distributed_backing_resolves_network_name_by_key() {
        let vm = vm(vec![nic(
            4000,
            "Network adapter 1",
            Some("00:50:56:aa:bb:cc"),
            VnicBacking::DistributedPort {
                port_group_key: "dvportgroup-4".to_string(),
                switch_uuid: "u".to_string(),
            },
        )]);
        let vnic = vm.vnics().remove(0);
        assert_eq!(vm.get_network_name_from_vnic(&vnic), "QS_dvs_VLAN_4_access");
    }

    #[test]
    fn available_vnic_skips_generated_and_reserved() {
        let vm = vm(vec![
            nic(
                4000,
                "Network adapter 1",
                Some("00:50:56:00:00:01"),
                VnicBacking::DistributedPort {
                    port_group_key: "dvportgroup-4".to_string(),
                    switch_uuid: "u".to_string(),
                },
            ),
            nic(4001, "Network adapter 2", Some("00:50:56:00:00:02"), on_network("network-5", "Mgmt")),
            nic(4002, "Network adapter 3", Some("00:50:56:00:00:03"), on_network("network-6", "Lab")),
        ]);
        let reserved = vec!["Mgmt".to_string()];
        let chosen = vm.get_available_vnic("Holding", &reserved, None).unwrap();
        assert_eq!(chosen.key(), 4002);

        let err = vm.get_available_vnic("Holding", &reserved, Some("1")).unwrap_err();
        assert!(matches!(err, VCenterError::NoVnicAvailable { .. }));
    }

    #[test]
    fn holding_network_adapters_are_preferred() {
        let vm = vm(vec![
            nic(4000, "Network adapter 1", Some("00:50:56:00:00:01"), on_network("network-6", "Lab")),
            nic(4001, "Network adapter 2", Some("00:50:56:00:00:02"), on_network("network-1", "Holding")),
        ]);
        let chosen = vm.get_available_vnic("Holding", &[], None).unwrap();
        assert_eq!(chosen.key(), 4001);
    }

    #[test]
    fn guest_tools_check() {
        let mut handler = vm(vec![]);
        assert!(handler.validate_guest_tools_installed().is_ok());
        handler.info.tools_status = ToolsStatus::ToolsNotInstalled;
        assert!(matches!(
            handler.validate_guest_tools_installed(),
            Err(VCenterError::VmwareToolsNotInstalled { .. })
        ));
    }
}
