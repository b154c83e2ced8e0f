//! Configuration commands

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use vc_config::ResourceConfig;

/// Load a resource configuration and report what is missing
pub struct CheckConfigCommand;

impl CheckConfigCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, config_path: &str) -> Result<()> {
        println!("Checking resource configuration: {}", config_path);

        if !Path::new(config_path).exists() {
            anyhow::bail!("Configuration file not found: {}", config_path);
        }

        let config = ResourceConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load configuration file: {}", config_path))?;
        println!("✓ Configuration parsed");

        let missing = config.missing_attributes();
        if !missing.is_empty() {
            anyhow::bail!("Missing required attributes: {}", missing.join(", "));
        }
        println!("✓ Required attributes present");

        println!("  datacenter:       {}", config.default_datacenter);
        println!("  switch:           {}", config.default_dv_switch);
        println!("  holding network:  {}", config.holding_network);
        if !config.reserved_networks.is_empty() {
            println!("  reserved:         {}", config.reserved_networks.join(", "));
        }
        println!(
            "  visibility wait:  {:?} every {:?}",
            config.port_group_wait_timeout(),
            config.port_group_poll_interval()
        );
        println!("Configuration is valid");
        Ok(())
    }
}

impl Default for CheckConfigCommand {
    fn default() -> Self {
        Self::new()
    }
}

/// Write a configuration file with every key set
pub struct GenerateConfigCommand;

impl GenerateConfigCommand {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, datacenter: &str, switch: &str, holding_network: &str) -> Result<String> {
        let config = ResourceConfig {
            default_datacenter: datacenter.to_string(),
            default_dv_switch: switch.to_string(),
            holding_network: holding_network.to_string(),
            ..Default::default()
        };
        config.to_toml().context("Failed to render configuration")
    }

    pub fn execute(
        &self,
        datacenter: &str,
        switch: &str,
        holding_network: &str,
        output: Option<&str>,
    ) -> Result<()> {
        let rendered = self.render(datacenter, switch, holding_network)?;
        match output {
            Some(path) => {
                fs::write(path, rendered)
                    .with_context(|| format!("Failed to write configuration file: {}", path))?;
                println!("Configuration written to {}", path);
            }
            None => print!("{}", rendered),
        }
        Ok(())
    }
}

impl Default for GenerateConfigCommand {
    fn default() -> Self {
        Self::new()
    }
}
