//! Serializable inventory of the simulated vCenter

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use vc_shared_types::{
    ConnectInfo, HostVSwitchInfo, MoRef, NetworkInfo, NetworkKind, PowerState, SecurityPolicy,
    ToolsStatus, VirtualNicDevice, VlanSpec, VnicBacking,
};

use crate::{Result, SimError};

pub const FIRST_NIC_KEY: i32 = 4000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimState {
    #[serde(default)]
    pub datacenters: IndexMap<String, SimDatacenter>,
    #[serde(default)]
    pub hosts: IndexMap<String, SimHost>,
    #[serde(default)]
    pub vms: IndexMap<String, SimVm>,
    /// Sequence for managed object ids and generated MACs
    #[serde(default)]
    pub next_id: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimDatacenter {
    pub moref: MoRef,
    pub name: String,
    #[serde(default)]
    pub networks: Vec<SimNetwork>,
    #[serde(default)]
    pub clusters: Vec<SimCluster>,
    #[serde(default)]
    pub dv_switches: Vec<SimDvSwitch>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimNetwork {
    pub moref: MoRef,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimCluster {
    pub moref: MoRef,
    pub name: String,
    #[serde(default)]
    pub hosts: Vec<MoRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimDvSwitch {
    pub moref: MoRef,
    pub name: String,
    pub uuid: String,
    #[serde(default)]
    pub port_groups: Vec<SimDvPortGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimDvPortGroup {
    pub moref: MoRef,
    pub key: String,
    pub name: String,
    pub vlan: VlanSpec,
    pub num_ports: u32,
    pub security: SecurityPolicy,
    /// Enumerations still to come before the port group shows up
    #[serde(default)]
    pub hidden_listings: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimHost {
    pub moref: MoRef,
    pub name: String,
    pub datacenter: MoRef,
    #[serde(default)]
    pub vswitches: Vec<HostVSwitchInfo>,
    #[serde(default)]
    pub port_groups: Vec<SimHostPortGroup>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimHostPortGroup {
    pub key: String,
    pub name: String,
    pub vswitch_name: String,
    pub vlan_id: u16,
    pub security: SecurityPolicy,
    /// Network object backing the port group
    pub network: MoRef,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimVm {
    pub moref: MoRef,
    pub name: String,
    pub uuid: String,
    pub datacenter: MoRef,
    pub host: MoRef,
    pub power_state: PowerState,
    pub tools_status: ToolsStatus,
    #[serde(default)]
    pub nics: Vec<VirtualNicDevice>,
}

impl SimState {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn next_moref(&mut self, kind: &str) -> MoRef {
        self.next_id += 1;
        MoRef::new(format!("{}-{}", kind, self.next_id))
    }

    pub(crate) fn next_mac(&mut self) -> String {
        self.next_id += 1;
        let n = self.next_id;
        format!(
            "00:50:56:{:02x}:{:02x}:{:02x}",
            (n >> 16) & 0xff,
            (n >> 8) & 0xff,
            n & 0xff
        )
    }

    pub fn add_datacenter(&mut self, name: &str) -> MoRef {
        let moref = self.next_moref("datacenter");
        self.datacenters.insert(
            moref.to_string(),
            SimDatacenter {
                moref: moref.clone(),
                name: name.to_string(),
                networks: Vec::new(),
                clusters: Vec::new(),
                dv_switches: Vec::new(),
            },
        );
        moref
    }

    pub fn add_network(&mut self, dc: &MoRef, name: &str) -> Result<MoRef> {
        let moref = self.next_moref("network");
        self.datacenter_mut(dc)?.networks.push(SimNetwork {
            moref: moref.clone(),
            name: name.to_string(),
        });
        Ok(moref)
    }

    pub fn add_dv_switch(&mut self, dc: &MoRef, name: &str) -> Result<MoRef> {
        let moref = self.next_moref("dvs");
        self.datacenter_mut(dc)?.dv_switches.push(SimDvSwitch {
            moref: moref.clone(),
            name: name.to_string(),
            uuid: Uuid::new_v4().to_string(),
            port_groups: Vec::new(),
        });
        Ok(moref)
    }

    pub fn add_cluster(&mut self, dc: &MoRef, name: &str) -> Result<MoRef> {
        let moref = self.next_moref("domain-c");
        self.datacenter_mut(dc)?.clusters.push(SimCluster {
            moref: moref.clone(),
            name: name.to_string(),
            hosts: Vec::new(),
        });
        Ok(moref)
    }

    /// Add a host, optionally as a member of a cluster
    pub fn add_host(&mut self, dc: &MoRef, cluster: Option<&MoRef>, name: &str) -> Result<MoRef> {
        let moref = self.next_moref("host");
        let datacenter = self.datacenter_mut(dc)?;
        if let Some(cluster) = cluster {
            datacenter
                .clusters
                .iter_mut()
                .find(|c| &c.moref == cluster)
                .ok_or_else(|| SimError::UnknownObject(cluster.to_string()))?
                .hosts
                .push(moref.clone());
        }
        self.hosts.insert(
            moref.to_string(),
            SimHost {
                moref: moref.clone(),
                name: name.to_string(),
                datacenter: dc.clone(),
                vswitches: Vec::new(),
                port_groups: Vec::new(),
            },
        );
        Ok(moref)
    }

    pub fn add_vswitch(&mut self, host: &MoRef, name: &str) -> Result<()> {
        self.host_mut(host)?.vswitches.push(HostVSwitchInfo {
            key: format!("key-vim.host.VirtualSwitch-{}", name),
            name: name.to_string(),
        });
        Ok(())
    }

    /// Add a powered-on VM with `nic_count` adapters parked on `network`.
    /// Adapters get MACs unless `with_macs` is false (VM still provisioning).
    pub fn add_vm(
        &mut self,
        host: &MoRef,
        name: &str,
        uuid: &str,
        nic_count: usize,
        network: Option<&MoRef>,
        with_macs: bool,
    ) -> Result<MoRef> {
        let datacenter = self.host_mut(host)?.datacenter.clone();
        let backing = match network {
            Some(network) => {
                let name = self
                    .network_name(network)
                    .ok_or_else(|| SimError::UnknownObject(network.to_string()))?;
                VnicBacking::Network {
                    network: network.clone(),
                    device_name: name,
                }
            }
            None => VnicBacking::None,
        };

        let mut nics = Vec::with_capacity(nic_count);
        for index in 0..nic_count {
            let mac_address = if with_macs { Some(self.next_mac()) } else { None };
            nics.push(VirtualNicDevice {
                key: FIRST_NIC_KEY + index as i32,
                label: format!("Network adapter {}", index + 1),
                mac_address,
                backing: backing.clone(),
                connectable: ConnectInfo::default(),
                wake_on_lan_enabled: true,
            });
        }

        let moref = self.next_moref("vm");
        self.vms.insert(
            moref.to_string(),
            SimVm {
                moref: moref.clone(),
                name: name.to_string(),
                uuid: uuid.to_string(),
                datacenter,
                host: host.clone(),
                power_state: PowerState::PoweredOn,
                tools_status: ToolsStatus::ToolsOk,
                nics,
            },
        );
        Ok(moref)
    }

    pub(crate) fn datacenter_mut(&mut self, dc: &MoRef) -> Result<&mut SimDatacenter> {
        self.datacenters
            .get_mut(dc.as_str())
            .ok_or_else(|| SimError::UnknownObject(dc.to_string()))
    }

    pub(crate) fn host_mut(&mut self, host: &MoRef) -> Result<&mut SimHost> {
        self.hosts
            .get_mut(host.as_str())
            .ok_or_else(|| SimError::UnknownObject(host.to_string()))
    }

    pub(crate) fn dv_switch(&self, switch: &MoRef) -> Option<&SimDvSwitch> {
        self.datacenters
            .values()
            .flat_map(|dc| dc.dv_switches.iter())
            .find(|s| &s.moref == switch)
    }

    pub(crate) fn dv_switch_mut(&mut self, switch: &MoRef) -> Option<&mut SimDvSwitch> {
        self.datacenters
            .values_mut()
            .flat_map(|dc| dc.dv_switches.iter_mut())
            .find(|s| &s.moref == switch)
    }

    /// Every network object known to the inventory, visible or not
    pub fn all_networks(&self) -> Vec<NetworkInfo> {
        let mut networks = Vec::new();
        for dc in self.datacenters.values() {
            networks.extend(self.datacenter_network_infos(dc, true));
        }
        networks
    }

    /// Networks of a datacenter: standard networks, host port group networks
    /// and distributed port groups
    pub(crate) fn datacenter_network_infos(
        &self,
        dc: &SimDatacenter,
        include_hidden: bool,
    ) -> Vec<NetworkInfo> {
        let mut networks: Vec<NetworkInfo> = dc
            .networks
            .iter()
            .map(|net| NetworkInfo {
                moref: net.moref.clone(),
                name: net.name.clone(),
                kind: NetworkKind::Standard,
            })
            .collect();

        for host in self.hosts.values().filter(|h| h.datacenter == dc.moref) {
            for pg in &host.port_groups {
                if !networks.iter().any(|n| n.moref == pg.network) {
                    networks.push(NetworkInfo {
                        moref: pg.network.clone(),
                        name: pg.name.clone(),
                        kind: NetworkKind::Standard,
                    });
                }
            }
        }

        for switch in &dc.dv_switches {
            for pg in &switch.port_groups {
                if include_hidden || pg.hidden_listings == 0 {
                    networks.push(NetworkInfo {
                        moref: pg.moref.clone(),
                        name: pg.name.clone(),
                        kind: NetworkKind::DistributedPortGroup {
                            key: pg.key.clone(),
                            switch_uuid: switch.uuid.clone(),
                        },
                    });
                }
            }
        }
        networks
    }

    pub fn network_name(&self, network: &MoRef) -> Option<String> {
        self.all_networks()
            .into_iter()
            .find(|net| &net.moref == network)
            .map(|net| net.name)
    }

    /// VMs with an adapter backed by the distributed port group `key`
    pub(crate) fn vms_on_port_group_key(&self, key: &str) -> Vec<MoRef> {
        self.vms
            .values()
            .filter(|vm| {
                vm.nics.iter().any(|nic| {
                    matches!(&nic.backing, VnicBacking::DistributedPort { port_group_key, .. } if port_group_key == key)
                })
            })
            .map(|vm| vm.moref.clone())
            .collect()
    }

    /// VMs with an adapter backed by the plain network `network`
    pub(crate) fn vms_on_network(&self, network: &MoRef) -> Vec<MoRef> {
        self.vms
            .values()
            .filter(|vm| {
                vm.nics.iter().any(|nic| {
                    matches!(&nic.backing, VnicBacking::Network { network: n, .. } if n == network)
                })
            })
            .map(|vm| vm.moref.clone())
            .collect()
    }

    pub fn find_vm_by_uuid(&self, uuid: &str) -> Option<&SimVm> {
        self.vms.values().find(|vm| vm.uuid.eq_ignore_ascii_case(uuid))
    }

    /// Names of every distributed and host port group, visible or not
    pub fn port_group_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .datacenters
            .values()
            .flat_map(|dc| dc.dv_switches.iter())
            .flat_map(|s| s.port_groups.iter().map(|pg| pg.name.clone()))
            .collect();
        names.extend(
            self.hosts
                .values()
                .flat_map(|h| h.port_groups.iter().map(|pg| pg.name.clone())),
        );
        names
    }
}
