//! Connect and disconnect workflows for one vCenter resource

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use vc_config::ResourceConfig;
use vc_core::error::{ConfigError, NotFoundError};
use vc_core::poll::poll_until;
use vc_core::{
    generate_port_group_name, get_vlan_spec, is_network_generated_name, DcHandler,
    PortGroupHandler, PortGroupLookup, Result, SwitchHandler, TaskWaiter, VCenterError,
    VSphereClient, VmHandler,
};
use vc_event_bus::EventBus;
use vc_rollback::RollbackManager;
use vc_shared_types::{
    ConnectivityAction, SharedTypeError, SystemEvent, VlanSpec, INTERFACE_ATTRIBUTE,
};

use crate::compensation::{
    remove_port_group_if_unused, DestroyPortGroupCommand, PendingAttaches, PortGroupLock,
};

/// Outcome of a successful `set_vlan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectResult {
    pub vm_uuid: String,
    /// MAC of the wired adapter, as vCenter reports it after the reconfigure
    pub mac_address: Option<String>,
    pub vnic_label: String,
    pub port_group_name: String,
    /// Whether this call created the port group
    pub created: bool,
}

/// Outcome of a successful `remove_vlan`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisconnectResult {
    pub vm_uuid: String,
    pub mac_address: String,
    /// Network the adapter was on before the call
    pub network_name: String,
    /// The adapter was moved back to the holding network
    pub detached: bool,
    pub port_group_destroyed: bool,
}

/// Port group the flow will wire an adapter into. Holds a pending attach
/// claim on the name until the attach is over.
struct AcquiredPortGroup {
    port_group: PortGroupHandler,
    created: bool,
}

/// Connectivity orchestrator.
///
/// One instance per vCenter resource. Clones share the port group lock and
/// its pending attach claims, so concurrent actions on the same instance
/// never create the same port group twice or destroy one while another
/// action is picking it up.
#[derive(Clone)]
pub struct ConnectivityFlow {
    client: Arc<dyn VSphereClient>,
    config: Arc<ResourceConfig>,
    port_group_lock: PortGroupLock,
    task_waiter: TaskWaiter,
    cancellation: CancellationToken,
    event_bus: Option<Arc<EventBus>>,
}

impl ConnectivityFlow {
    pub fn new(client: Arc<dyn VSphereClient>, config: ResourceConfig) -> Self {
        let cancellation = CancellationToken::new();
        let task_waiter = TaskWaiter::new(client.clone())
            .with_poll_interval(config.task_poll_interval())
            .with_cancellation(cancellation.clone());
        Self {
            client,
            config: Arc::new(config),
            port_group_lock: Arc::new(Mutex::new(PendingAttaches::default())),
            task_waiter,
            cancellation,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Use an externally owned token. Cancelling it asks in-flight vCenter
    /// tasks to cancel and cuts the visibility wait short.
    pub fn with_cancellation(mut self, cancellation: CancellationToken) -> Self {
        self.task_waiter = TaskWaiter::new(self.client.clone())
            .with_poll_interval(self.config.task_poll_interval())
            .with_cancellation(cancellation.clone());
        self.cancellation = cancellation;
        self
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub(crate) fn event_bus(&self) -> Option<&Arc<EventBus>> {
        self.event_bus.as_ref()
    }

    fn validate_dv_switch_name(&self) -> Result<()> {
        if self.config.default_dv_switch.trim().is_empty() {
            return Err(ConfigError::DvSwitchNameEmpty.into());
        }
        Ok(())
    }

    pub(crate) fn ensure_configured(&self) -> Result<()> {
        self.validate_dv_switch_name()
    }

    /// Wire a free adapter of the VM into the port group for the action's
    /// VLAN and mode, creating the port group on first use.
    pub async fn set_vlan(&self, action: &ConnectivityAction) -> Result<ConnectResult> {
        self.validate_dv_switch_name()?;
        let vlan_spec = get_vlan_spec(action.mode, &action.vlan_id)?;

        let dc = DcHandler::get(self.client.clone(), &self.config.default_datacenter).await?;
        let mut vm = dc.get_vm_by_uuid(&action.vm_uuid).await?;
        vm.validate_has_vnics()?;
        dc.get_network(&self.config.holding_network).await?;

        let switch = self.resolve_switch(&dc, &vm).await?;
        let port_group_name =
            generate_port_group_name(&self.config.default_dv_switch, &action.vlan_id, action.mode);
        info!(
            "Connecting {} to VLAN {} ({}) through '{}'",
            vm, action.vlan_id, action.mode, port_group_name
        );

        let rollback = RollbackManager::new(format!("set_vlan {} {}", vm.uuid(), port_group_name));
        let (acquired, vnic_key, vnic_label) = rollback
            .scope(async {
                let acquired = self
                    .get_or_create_port_group(&switch, &port_group_name, &vlan_spec, &rollback)
                    .await?;
                let attached = self
                    .attach_vnic(&dc, &vm, &acquired.port_group, action.vnic_name.as_deref())
                    .await;
                // released before any rollback looks at the claims
                self.port_group_lock.lock().await.finish(&port_group_name);
                let (vnic_key, vnic_label) = attached?;
                Ok::<_, VCenterError>((acquired, vnic_key, vnic_label))
            })
            .await?;

        vm.refresh().await?;
        let mac_address = vm
            .get_vnic_by_key(vnic_key)
            .and_then(|vnic| vnic.mac_address().map(str::to_string));

        self.publish(SystemEvent::VnicConnected {
            vm_uuid: vm.uuid().to_string(),
            mac_address: mac_address.clone(),
            network: acquired.port_group.name().to_string(),
        })
        .await;
        info!(
            "{} of {} is connected to '{}'",
            vnic_label,
            vm,
            acquired.port_group.name()
        );

        Ok(ConnectResult {
            vm_uuid: vm.uuid().to_string(),
            mac_address,
            vnic_label,
            port_group_name,
            created: acquired.created,
        })
    }

    /// Park the adapter with the action's MAC back on the holding network and
    /// destroy its port group once nothing else uses it.
    ///
    /// An adapter that is not on the expected network is left alone.
    pub async fn remove_vlan(&self, action: &ConnectivityAction) -> Result<DisconnectResult> {
        self.validate_dv_switch_name()?;
        let mac_address = action
            .interface_mac
            .as_deref()
            .ok_or_else(|| SharedTypeError::MissingAttribute(INTERFACE_ATTRIBUTE.to_string()))?;

        let dc = DcHandler::get(self.client.clone(), &self.config.default_datacenter).await?;
        let vm = dc.get_vm_by_uuid(&action.vm_uuid).await?;
        let holding = dc.get_network(&self.config.holding_network).await?;
        let vnic = vm.get_vnic_by_mac(mac_address)?;
        let network_name = vm.get_network_name_from_vnic(&vnic);

        let mut result = DisconnectResult {
            vm_uuid: vm.uuid().to_string(),
            mac_address: mac_address.to_string(),
            network_name: network_name.clone(),
            detached: false,
            port_group_destroyed: false,
        };

        if !self.should_tear_down(action, &network_name) {
            info!(
                "{} of {} is on '{}', nothing to disconnect",
                vnic, vm, network_name
            );
            return Ok(result);
        }

        info!("Moving {} of {} from '{}' to {}", vnic, vm, network_name, holding);
        vm.connect_vnic_to_network(&vnic, &holding, &self.task_waiter)
            .await?;
        result.detached = true;
        self.publish(SystemEvent::VnicDisconnected {
            vm_uuid: vm.uuid().to_string(),
            mac_address: mac_address.to_string(),
            network: network_name.clone(),
        })
        .await;

        let switch = self.resolve_switch(&dc, &vm).await?;
        result.port_group_destroyed = remove_port_group_if_unused(
            &switch,
            &network_name,
            &self.port_group_lock,
            self.event_bus.as_ref(),
        )
        .await?;
        Ok(result)
    }

    /// Wire a free adapter into `port_group`, returning its key and label
    async fn attach_vnic(
        &self,
        dc: &DcHandler,
        vm: &VmHandler,
        port_group: &PortGroupHandler,
        vnic_name: Option<&str>,
    ) -> Result<(i32, String)> {
        let vnic = vm.get_available_vnic(
            &self.config.holding_network,
            &self.config.reserved_networks,
            vnic_name,
        )?;

        match port_group {
            PortGroupHandler::Distributed(port_group) => {
                vm.connect_vnic_to_port_group(&vnic, port_group, &self.task_waiter)
                    .await?
            }
            PortGroupHandler::Host(port_group) => {
                let network = dc.get_network(port_group.name()).await?;
                vm.connect_vnic_to_host_port_group(&vnic, &network, &self.task_waiter)
                    .await?
            }
        }
        Ok((vnic.key(), vnic.label().to_string()))
    }

    /// With a VLAN, only the exact generated name is torn down. Without one,
    /// any generated name is.
    fn should_tear_down(&self, action: &ConnectivityAction, network_name: &str) -> bool {
        if network_name.is_empty() {
            return false;
        }
        if action.vlan_id.is_empty() {
            return is_network_generated_name(network_name);
        }
        let expected =
            generate_port_group_name(&self.config.default_dv_switch, &action.vlan_id, action.mode);
        network_name == expected
    }

    /// The configured switch: distributed in the datacenter, otherwise a
    /// standard vSwitch of the VM's host
    async fn resolve_switch(&self, dc: &DcHandler, vm: &VmHandler) -> Result<SwitchHandler> {
        match dc.get_dv_switch(&self.config.default_dv_switch).await {
            Ok(switch) => Ok(SwitchHandler::Distributed(switch)),
            Err(e) if e.is_dv_switch_not_found() => {
                debug!(
                    "No distributed switch '{}', looking on the host of {}",
                    self.config.default_dv_switch, vm
                );
                Ok(SwitchHandler::Host(
                    vm.get_v_switch(&self.config.default_dv_switch).await?,
                ))
            }
            Err(e) => Err(e),
        }
    }

    /// Find the port group or create it and wait until vCenter lists it.
    ///
    /// Holds the port group lock for the whole sequence and leaves a pending
    /// attach claim on the name. A freshly created port group gets a destroy
    /// step on `rollback` as soon as the creation task succeeds.
    async fn get_or_create_port_group(
        &self,
        switch: &SwitchHandler,
        name: &str,
        vlan_spec: &VlanSpec,
        rollback: &RollbackManager,
    ) -> Result<AcquiredPortGroup> {
        let mut pending = self.port_group_lock.lock().await;

        if let PortGroupLookup::Found(port_group) = switch.lookup_port_group(name).await? {
            debug!("Reusing {}", port_group);
            pending.begin(name);
            return Ok(AcquiredPortGroup {
                port_group,
                created: false,
            });
        }

        info!("Creating port group '{}' on {}", name, switch);
        let created = switch
            .create_port_group(
                name,
                vlan_spec,
                self.config.promiscuous_mode,
                self.config.port_group_num_ports,
                &self.task_waiter,
            )
            .await?;
        rollback
            .push(DestroyPortGroupCommand::new(
                switch.clone(),
                created,
                self.port_group_lock.clone(),
                self.event_bus.clone(),
            ))
            .await;
        self.publish(SystemEvent::PortGroupCreated {
            switch: switch.name().to_string(),
            name: name.to_string(),
        })
        .await;

        let waited = self.config.port_group_wait_timeout();
        let visible = poll_until(
            self.config.port_group_poll_interval(),
            waited,
            Some(&self.cancellation),
            || async move { Ok::<_, VCenterError>(switch.lookup_port_group(name).await?.into_option()) },
        )
        .await?;

        match visible {
            Some(port_group) => {
                pending.begin(name);
                Ok(AcquiredPortGroup {
                    port_group,
                    created: true,
                })
            }
            None => {
                error!(
                    "Port group '{}' did not show up on {} within {:?}",
                    name, switch, waited
                );
                Err(NotFoundError::PortGroupNotVisible {
                    name: name.to_string(),
                    entity: switch.to_string(),
                    waited,
                }
                .into())
            }
        }
    }

    async fn publish(&self, event: SystemEvent) {
        if let Some(bus) = &self.event_bus {
            if let Err(e) = bus.publish(event).await {
                warn!("Event listener failed: {}", e);
            }
        }
    }
}
