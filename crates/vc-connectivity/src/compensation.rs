//! Port group teardown shared by disconnect and failed connects

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::sync::Mutex;
use vc_core::{CreatedPortGroup, DestroyOutcome, PortGroupLookup, SwitchHandler};
use vc_event_bus::EventBus;
use vc_rollback::RollbackCommand;
use vc_shared_types::SystemEvent;

/// Attaches in flight, per port group name.
///
/// A port group with a pending attach counts as used even though no VM
/// references it yet. Only touched with the port group lock held.
#[derive(Debug, Default)]
pub struct PendingAttaches {
    by_name: HashMap<String, usize>,
}

impl PendingAttaches {
    pub fn begin(&mut self, name: &str) {
        *self.by_name.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn finish(&mut self, name: &str) {
        if let Some(count) = self.by_name.get_mut(name) {
            *count -= 1;
            if *count == 0 {
                self.by_name.remove(name);
            }
        }
    }

    pub fn count(&self, name: &str) -> usize {
        self.by_name.get(name).copied().unwrap_or(0)
    }
}

/// The lock serializing get-or-create and teardown of port groups
pub type PortGroupLock = Arc<Mutex<PendingAttaches>>;

/// Destroy the port group `name` on `switch` unless a VM still uses it or
/// another action is about to.
///
/// Runs under the port group lock so it cannot interleave with a concurrent
/// get-or-create of the same name. Returns whether the port group was
/// destroyed.
pub async fn remove_port_group_if_unused(
    switch: &SwitchHandler,
    name: &str,
    port_group_lock: &Mutex<PendingAttaches>,
    event_bus: Option<&Arc<EventBus>>,
) -> vc_core::Result<bool> {
    let pending = port_group_lock.lock().await;
    if pending.count(name) > 0 {
        info!("Port group '{}' is being attached to, keeping it", name);
        return Ok(false);
    }

    let port_group = match switch.get_port_group(name).await {
        Ok(port_group) => port_group,
        Err(e) if e.is_port_group_not_found() => {
            debug!("Port group '{}' is already gone from {}", name, switch);
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    if port_group.is_connected().await? {
        info!("{} is still in use, keeping it", port_group);
        return Ok(false);
    }

    let outcome = port_group.destroy().await?;
    if outcome.is_destroyed() {
        announce_destroyed(switch, name, event_bus).await;
    }
    Ok(outcome.is_destroyed())
}

async fn announce_destroyed(switch: &SwitchHandler, name: &str, event_bus: Option<&Arc<EventBus>>) {
    if let Some(bus) = event_bus {
        let event = SystemEvent::PortGroupDestroyed {
            switch: switch.name().to_string(),
            name: name.to_string(),
        };
        if let Err(e) = bus.publish(event).await {
            warn!("Failed to publish port group removal: {}", e);
        }
    }
}

/// Inverse of a port group creation.
///
/// Addresses the port group by what the creation returned, so it also
/// works when the port group never showed up in a listing.
pub struct DestroyPortGroupCommand {
    switch: SwitchHandler,
    created: CreatedPortGroup,
    port_group_lock: PortGroupLock,
    event_bus: Option<Arc<EventBus>>,
}

impl DestroyPortGroupCommand {
    pub fn new(
        switch: SwitchHandler,
        created: CreatedPortGroup,
        port_group_lock: PortGroupLock,
        event_bus: Option<Arc<EventBus>>,
    ) -> Self {
        Self {
            switch,
            created,
            port_group_lock,
            event_bus,
        }
    }

    async fn destroy(&self) -> vc_core::Result<DestroyOutcome> {
        let name = &self.created.name;
        let pending = self.port_group_lock.lock().await;
        if pending.count(name) > 0 {
            info!("Port group '{}' was picked up by another action, keeping it", name);
            return Ok(DestroyOutcome::InUse);
        }

        if let PortGroupLookup::Found(port_group) = self.switch.lookup_port_group(name).await? {
            if port_group.is_connected().await? {
                info!("{} is already in use, keeping it", port_group);
                return Ok(DestroyOutcome::InUse);
            }
        }

        let outcome = self.switch.destroy_created(&self.created).await?;
        if outcome.is_destroyed() {
            announce_destroyed(&self.switch, name, self.event_bus.as_ref()).await;
        }
        Ok(outcome)
    }
}

#[async_trait]
impl RollbackCommand for DestroyPortGroupCommand {
    fn description(&self) -> String {
        format!("destroy port group '{}' on {}", self.created.name, self.switch)
    }

    async fn rollback(&self) -> anyhow::Result<()> {
        let outcome = self.destroy().await?;
        debug!("Rollback of '{}' ended as {:?}", self.created.name, outcome);
        Ok(())
    }
}
