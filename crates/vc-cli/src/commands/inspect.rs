//! Inspect command

use std::fmt::Write as _;
use std::fs;
use std::str::FromStr;

use anyhow::{Context, Result};
use vc_core::is_network_generated_name;
use vc_core::vlan::vlan_spec_to_string;
use vc_shared_types::VnicBacking;
use vc_sim::SimState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            other => anyhow::bail!("Unknown output format: {} (expected text, json or yaml)", other),
        }
    }
}

/// Show switches, port groups and VM wiring of an inventory file
pub struct InspectCommand;

impl InspectCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn load(&self, inventory_path: &str) -> Result<SimState> {
        let raw = fs::read_to_string(inventory_path)
            .with_context(|| format!("Failed to read inventory: {}", inventory_path))?;
        serde_json::from_str(&raw).with_context(|| format!("Invalid inventory: {}", inventory_path))
    }

    pub fn render(&self, state: &SimState, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(state)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(state)?),
            OutputFormat::Text => Ok(Self::render_text(state)?),
        }
    }

    pub fn execute(&self, inventory_path: &str, format: OutputFormat) -> Result<()> {
        let state = self.load(inventory_path)?;
        print!("{}", self.render(&state, format)?);
        Ok(())
    }

    fn render_text(state: &SimState) -> Result<String, std::fmt::Error> {
        let mut out = String::new();
        let marker = |name: &str| if is_network_generated_name(name) { " *" } else { "" };

        for dc in state.datacenters.values() {
            writeln!(out, "Datacenter {} ({})", dc.name, dc.moref)?;
            for network in &dc.networks {
                writeln!(out, "  network {}{}", network.name, marker(&network.name))?;
            }
            for switch in &dc.dv_switches {
                writeln!(out, "  dvSwitch {} [{}]", switch.name, switch.uuid)?;
                for pg in &switch.port_groups {
                    writeln!(
                        out,
                        "    {:<50} vlan {:<12} key {}{}",
                        pg.name,
                        vlan_spec_to_string(&pg.vlan),
                        pg.key,
                        marker(&pg.name)
                    )?;
                }
            }
        }

        for host in state.hosts.values() {
            writeln!(out, "Host {} ({})", host.name, host.moref)?;
            for vswitch in &host.vswitches {
                writeln!(out, "  vSwitch {}", vswitch.name)?;
                for pg in host.port_groups.iter().filter(|pg| pg.vswitch_name == vswitch.name) {
                    writeln!(
                        out,
                        "    {:<50} vlan {:<12}{}",
                        pg.name,
                        pg.vlan_id,
                        marker(&pg.name)
                    )?;
                }
            }
        }

        if !state.vms.is_empty() {
            writeln!(
                out,
                "{:<20} {:<20} {:<19} {}",
                "VM", "Adapter", "MAC", "Network"
            )?;
            writeln!(out, "{}", "-".repeat(80))?;
        }
        for vm in state.vms.values() {
            for nic in &vm.nics {
                let network = match &nic.backing {
                    VnicBacking::Network { device_name, .. } => device_name.clone(),
                    VnicBacking::DistributedPort { port_group_key, .. } => state
                        .datacenters
                        .values()
                        .flat_map(|dc| dc.dv_switches.iter())
                        .flat_map(|s| s.port_groups.iter())
                        .find(|pg| &pg.key == port_group_key)
                        .map(|pg| pg.name.clone())
                        .unwrap_or_else(|| format!("<{}>", port_group_key)),
                    VnicBacking::None => "-".to_string(),
                };
                writeln!(
                    out,
                    "{:<20} {:<20} {:<19} {}",
                    vm.name,
                    nic.label,
                    nic.mac_address.as_deref().unwrap_or("-"),
                    network
                )?;
            }
        }
        Ok(out)
    }
}

impl Default for InspectCommand {
    fn default() -> Self {
        Self::new()
    }
}
