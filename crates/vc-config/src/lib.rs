//! Resource configuration
//!
//! Attributes of the vCenter resource the connectivity flow runs against,
//! loaded from a TOML file with `VCENTER_` environment overrides.

use std::path::Path;
use std::time::Duration;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_PREFIX: &str = "VCENTER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Failed to render configuration: {0}")]
    Render(#[from] toml::ser::Error),

    #[error("Invalid configuration value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Polling and waiting intervals, in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub task_poll_interval_ms: u64,
    pub port_group_poll_interval_ms: u64,
    pub port_group_wait_timeout_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            task_poll_interval_ms: 2_000,
            port_group_poll_interval_ms: 2_000,
            port_group_wait_timeout_ms: 300_000,
        }
    }
}

/// Settings of one vCenter resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    pub default_datacenter: String,
    /// Distributed switch, or host vSwitch name, holding sandbox port groups
    pub default_dv_switch: String,
    /// Network idle adapters are parked on
    pub holding_network: String,
    /// Networks never handed out as free adapters
    pub reserved_networks: Vec<String>,
    pub promiscuous_mode: bool,
    pub port_group_num_ports: u32,
    pub timeouts: Timeouts,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            default_datacenter: String::new(),
            default_dv_switch: String::new(),
            holding_network: String::new(),
            reserved_networks: Vec::new(),
            promiscuous_mode: false,
            port_group_num_ports: 32,
            timeouts: Timeouts::default(),
        }
    }
}

impl ResourceConfig {
    /// Load a TOML file, then apply environment overrides
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading resource configuration from {}", path.display());
        let settings = config::Config::builder()
            .add_source(config::File::from(path).format(config::FileFormat::Toml))
            .add_source(Self::environment())
            .build()?;

        let config: ResourceConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides, without a file
    pub fn load_from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()?;

        let config: ResourceConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .list_separator(";")
            .with_list_parse_key("reserved_networks")
            .try_parsing(true)
    }

    /// Structural checks. An empty default switch is reported by the
    /// connectivity flow itself, before it touches vCenter.
    pub fn validate(&self) -> Result<()> {
        if self.port_group_num_ports == 0 {
            return Err(ConfigError::Invalid {
                field: "port_group_num_ports",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.timeouts.task_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timeouts.task_poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.timeouts.port_group_poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "timeouts.port_group_poll_interval_ms",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Names of required attributes that are still empty
    pub fn missing_attributes(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.default_datacenter.trim().is_empty() {
            missing.push("default_datacenter");
        }
        if self.default_dv_switch.trim().is_empty() {
            missing.push("default_dv_switch");
        }
        if self.holding_network.trim().is_empty() {
            missing.push("holding_network");
        }
        missing
    }

    pub fn is_reserved(&self, network: &str) -> bool {
        self.reserved_networks.iter().any(|reserved| reserved == network)
    }

    pub fn task_poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.task_poll_interval_ms)
    }

    pub fn port_group_poll_interval(&self) -> Duration {
        Duration::from_millis(self.timeouts.port_group_poll_interval_ms)
    }

    pub fn port_group_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.timeouts.port_group_wait_timeout_ms)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
