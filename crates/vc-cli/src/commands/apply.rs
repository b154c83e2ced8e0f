//! Apply command

use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{info, warn};
use vc_config::ResourceConfig;
use vc_connectivity::ConnectivityFlow;
use vc_event_bus::{ConnectivityListener, EventBus, EventJournal};
use vc_shared_types::{ConnectivityActionType, ConnectivityResponse};
use vc_sim::{SimSettings, SimulatedVCenter};

/// Logs every connector event
pub struct EventLogger;

#[async_trait]
impl ConnectivityListener for EventLogger {
    async fn port_group_created(&self, switch: &str, name: &str) -> anyhow::Result<()> {
        info!("port group '{}' created on '{}'", name, switch);
        Ok(())
    }

    async fn port_group_destroyed(&self, switch: &str, name: &str) -> anyhow::Result<()> {
        info!("port group '{}' destroyed on '{}'", name, switch);
        Ok(())
    }

    async fn vnic_connected(
        &self,
        vm_uuid: &str,
        mac_address: Option<&str>,
        network: &str,
    ) -> anyhow::Result<()> {
        info!(
            "VM {} adapter {} connected to '{}'",
            vm_uuid,
            mac_address.unwrap_or("-"),
            network
        );
        Ok(())
    }

    async fn vnic_disconnected(
        &self,
        vm_uuid: &str,
        mac_address: &str,
        network: &str,
    ) -> anyhow::Result<()> {
        info!(
            "VM {} adapter {} disconnected from '{}'",
            vm_uuid, mac_address, network
        );
        Ok(())
    }

    async fn action_failed(
        &self,
        action_id: &str,
        action_type: ConnectivityActionType,
        error: &str,
    ) -> anyhow::Result<()> {
        warn!("{} action {} failed: {}", action_type, action_id, error);
        Ok(())
    }
}

/// Run a connectivity request against a simulated inventory
pub struct ApplyCommand {
    settings: SimSettings,
    journal_path: Option<String>,
}

impl ApplyCommand {
    pub fn new(settings: SimSettings) -> Self {
        Self {
            settings,
            journal_path: None,
        }
    }

    /// Also write every event of the run to `path` as JSON lines
    pub fn with_journal(mut self, path: Option<String>) -> Self {
        self.journal_path = path;
        self
    }

    /// Apply the request and return the rendered response. With
    /// `write_back` the resulting inventory replaces the state file.
    pub async fn run(
        &self,
        config_path: &str,
        inventory_path: &str,
        request_path: &str,
        write_back: bool,
    ) -> Result<ConnectivityResponse> {
        let config = ResourceConfig::load_from_file(config_path)
            .with_context(|| format!("Failed to load configuration file: {}", config_path))?;
        let sim = Arc::new(
            SimulatedVCenter::from_file(inventory_path, self.settings)
                .with_context(|| format!("Failed to load inventory: {}", inventory_path))?,
        );
        let request = fs::read_to_string(request_path)
            .with_context(|| format!("Failed to read request file: {}", request_path))?;

        let journal = Arc::new(EventJournal::new());
        let mut bus = EventBus::new();
        bus.subscribe("log", Arc::new(EventLogger))
            .context("Failed to subscribe event logger")?;
        bus.subscribe("journal", journal.clone())
            .context("Failed to subscribe event journal")?;
        let flow = ConnectivityFlow::new(sim.clone(), config).with_event_bus(Arc::new(bus));

        let raw = flow
            .apply_connectivity(&request)
            .await
            .context("Connectivity request failed")?;
        let response: ConnectivityResponse =
            serde_json::from_str(&raw).context("Failed to read connectivity response")?;

        info!(
            "Created {} and destroyed {} port group(s), {} VM reconfiguration(s)",
            sim.port_groups_created(),
            sim.port_groups_destroyed(),
            sim.reconfigures()
        );

        for name in journal.remaining_port_groups().await {
            info!("Port group '{}' created by this run is still in place", name);
        }
        if let Some(path) = &self.journal_path {
            let lines = journal
                .to_json_lines()
                .await
                .context("Failed to render event journal")?;
            fs::write(path, lines)
                .with_context(|| format!("Failed to write event journal: {}", path))?;
            info!("Event journal written to {}", path);
        }

        if write_back {
            sim.save(inventory_path)
                .await
                .with_context(|| format!("Failed to write inventory: {}", inventory_path))?;
            info!("Inventory written back to {}", inventory_path);
        }
        Ok(response)
    }

    pub async fn execute(
        &self,
        config_path: &str,
        inventory_path: &str,
        request_path: &str,
        write_back: bool,
    ) -> Result<()> {
        let response = self
            .run(config_path, inventory_path, request_path, write_back)
            .await?;
        println!("{}", serde_json::to_string_pretty(&response)?);

        let failed = response
            .driver_response
            .action_results
            .iter()
            .filter(|result| !result.success)
            .count();
        if failed > 0 {
            anyhow::bail!("{} action(s) failed", failed);
        }
        Ok(())
    }
}
