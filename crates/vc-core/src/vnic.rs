//! Virtual network adapter handling

use vc_shared_types::{
    ConnectInfo, DeviceOperation, MacAddr, VirtualDeviceSpec, VirtualNicDevice,
    VmConfigSpec, VnicBacking,
};

use crate::network::NetworkHandler;
use crate::port_group::DvPortGroupHandler;

const VNIC_LABEL_PREFIX: &str = "Network adapter";

/// Snapshot of one virtual ethernet card of a VM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VnicHandler {
    device: VirtualNicDevice,
}

impl VnicHandler {
    pub fn new(device: VirtualNicDevice) -> Self {
        Self { device }
    }

    pub fn key(&self) -> i32 {
        self.device.key
    }

    pub fn label(&self) -> &str {
        &self.device.label
    }

    /// Empty until the adapter has been connected at least once
    pub fn mac_address(&self) -> Option<&str> {
        self.device
            .mac_address
            .as_deref()
            .filter(|mac| !mac.is_empty())
    }

    pub fn has_mac_address(&self, mac: &MacAddr) -> bool {
        self.mac_address().map(|raw| mac.matches(raw)).unwrap_or(false)
    }

    /// Network name of a plain network backing
    pub fn network_name(&self) -> Option<&str> {
        match &self.device.backing {
            VnicBacking::Network { device_name, .. } => Some(device_name),
            _ => None,
        }
    }

    /// Port group key of a distributed port backing
    pub fn port_group_key(&self) -> Option<&str> {
        match &self.device.backing {
            VnicBacking::DistributedPort { port_group_key, .. } => Some(port_group_key),
            _ => None,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.device.connectable.connected
    }

    /// Match an adapter selector: the full label ("Network adapter 2") in any
    /// case, or just the adapter number ("2")
    pub fn matches_label(&self, selector: &str) -> bool {
        let selector = selector.trim();
        if selector.is_empty() {
            return false;
        }
        if self.device.label.eq_ignore_ascii_case(selector) {
            return true;
        }
        selector.chars().all(|c| c.is_ascii_digit())
            && self
                .device
                .label
                .eq_ignore_ascii_case(&format!("{} {}", VNIC_LABEL_PREFIX, selector))
    }

    /// Reconfiguration putting this adapter on a distributed port group,
    /// connected now and at power on
    pub fn create_spec_for_connection_port_group(
        &self,
        port_group: &DvPortGroupHandler,
    ) -> VmConfigSpec {
        let mut device = self.device.clone();
        device.backing = VnicBacking::DistributedPort {
            port_group_key: port_group.key().to_string(),
            switch_uuid: port_group.switch_uuid().to_string(),
        };
        device.connectable = ConnectInfo {
            connected: true,
            start_connected: true,
        };
        Self::edit_spec(device)
    }

    /// Reconfiguration parking this adapter on a plain network, disconnected
    pub fn create_spec_for_connection_network(&self, network: &NetworkHandler) -> VmConfigSpec {
        let mut device = self.device.clone();
        device.backing = VnicBacking::Network {
            network: network.moref().clone(),
            device_name: network.name().to_string(),
        };
        device.wake_on_lan_enabled = true;
        device.connectable = ConnectInfo {
            connected: false,
            start_connected: false,
        };
        Self::edit_spec(device)
    }

    /// Reconfiguration wiring this adapter to a host port group's network,
    /// connected now and at power on
    pub fn create_spec_for_connection_host_port_group(
        &self,
        network: &NetworkHandler,
    ) -> VmConfigSpec {
        let mut spec = self.create_spec_for_connection_network(network);
        for change in &mut spec.device_change {
            change.device.connectable = ConnectInfo {
                connected: true,
                start_connected: true,
            };
        }
        spec
    }

    fn edit_spec(device: VirtualNicDevice) -> VmConfigSpec {
        VmConfigSpec {
            device_change: vec![VirtualDeviceSpec {
                operation: DeviceOperation::Edit,
                device,
            }],
        }
    }

    pub fn device(&self) -> &VirtualNicDevice {
        &self.device
    }
}

impl std::fmt::Display for VnicHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.mac_address() {
            Some(mac) => write!(f, "vNIC '{}' ({})", self.device.label, mac),
            None => write!(f, "vNIC '{}'", self.device.label),
        }
    }
}

#[cfg(test)]
mod tests {
    use vc_shared_types::{MoRef, NetworkInfo, NetworkKind};

    use super::*;

    fn vnic(label: &str, mac: Option<&str>) -> VnicHandler {
        VnicHandler::new(VirtualNicDevice {
            key: 4000,
            label: label.to_string(),
            mac_address: mac.map(str::to_string),
            backing: VnicBacking::Network {
                network: MoRef::new("network-1"),
                device_name: "VM Network".to_string(),
            },
            connectable: ConnectInfo {
                connected: true,
                start_connected: true,
            },
            wake_on_lan_enabled: false,
        })
    }

    #[test]
    fn label_selection_accepts_bare_number() {
        let nic = vnic("Network adapter 2", None);
        assert!(nic.matches_label("network adapter 2"));
        assert!(nic.matches_label("2"));
        assert!(!nic.matches_label("1"));
        assert!(!nic.matches_label(""));
    }

    #[test]
    fn backing_classification() {
        let nic = vnic("Network adapter 1", Some("00:50:56:AA:BB:CC"));
        assert_eq!(nic.network_name(), Some("VM Network"));
        assert_eq!(nic.port_group_key(), None);
        assert!(nic.has_mac_address(&"00:50:56:aa:bb:cc".parse().unwrap()));
        assert_eq!(vnic("x", Some("")).mac_address(), None);
    }

    #[test]
    fn network_spec_parks_adapter_disconnected() {
        let nic = vnic("Network adapter 1", Some("00:50:56:aa:bb:cc"));
        let holding = NetworkHandler::new(NetworkInfo {
            moref: MoRef::new("network-9"),
            name: "Holding".to_string(),
            kind: NetworkKind::Standard,
        });
        let spec = nic.create_spec_for_connection_network(&holding);
        let change = &spec.device_change[0];
        assert_eq!(change.operation, DeviceOperation::Edit);
        assert_eq!(change.device.key, 4000);
        assert!(!change.device.connectable.connected);
        assert!(!change.device.connectable.start_connected);
        assert!(change.device.wake_on_lan_enabled);
        assert_eq!(
            change.device.backing,
            VnicBacking::Network {
                network: MoRef::new("network-9"),
                device_name: "Holding".to_string(),
            }
        );
    }
}
