//! Port group name command

use anyhow::{Context, Result};
use vc_core::vlan::vlan_spec_to_string;
use vc_core::{generate_port_group_name, get_vlan_spec, is_network_generated_name};
use vc_shared_types::ConnectionMode;

pub struct PortGroupNameCommand;

impl PortGroupNameCommand {
    pub fn new() -> Self {
        Self
    }

    /// Name the connectivity flow uses for `vlan` in `mode` on `switch`.
    /// The VLAN is checked the same way a connect would check it.
    pub fn render(&self, switch: &str, vlan: &str, mode: ConnectionMode) -> Result<String> {
        let spec = get_vlan_spec(mode, vlan)
            .with_context(|| format!("Invalid VLAN for {} mode", mode))?;
        let name = generate_port_group_name(switch, vlan, mode);
        log::debug!("VLAN '{}' parsed as {}", vlan, vlan_spec_to_string(&spec));
        Ok(name)
    }

    pub fn execute(&self, switch: &str, vlan: &str, mode: ConnectionMode) -> Result<()> {
        println!("{}", self.render(switch, vlan, mode)?);
        Ok(())
    }

    /// Whether a disconnect without VLAN would tear `network` down
    pub fn classify(&self, network: &str) -> Result<()> {
        if is_network_generated_name(network) {
            println!("'{}' is a generated port group", network);
        } else {
            println!("'{}' is not managed by the connector", network);
        }
        Ok(())
    }
}

impl Default for PortGroupNameCommand {
    fn default() -> Self {
        Self::new()
    }
}
