//! Connectivity lifecycle notifications
//!
//! The connectivity flow reports port group creation and removal, adapter
//! wiring and failed actions. Listeners implement the hooks they care about;
//! [`EventJournal`] keeps the whole run for later inspection.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use log::warn;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;
use vc_shared_types::{ConnectivityActionType, SystemEvent};

pub type EventBusResult<T> = Result<T, EventBusError>;

/// Hooks for connectivity events. Every hook defaults to a no-op.
#[async_trait]
pub trait ConnectivityListener: Send + Sync {
    /// Entry point for every event; the default routes to the typed hooks
    async fn on_event(&self, event: &SystemEvent) -> anyhow::Result<()> {
        match event {
            SystemEvent::PortGroupCreated { switch, name } => {
                self.port_group_created(switch, name).await
            }
            SystemEvent::PortGroupDestroyed { switch, name } => {
                self.port_group_destroyed(switch, name).await
            }
            SystemEvent::VnicConnected {
                vm_uuid,
                mac_address,
                network,
            } => {
                self.vnic_connected(vm_uuid, mac_address.as_deref(), network)
                    .await
            }
            SystemEvent::VnicDisconnected {
                vm_uuid,
                mac_address,
                network,
            } => self.vnic_disconnected(vm_uuid, mac_address, network).await,
            SystemEvent::ConnectivityActionFailed {
                action_id,
                action_type,
                error,
            } => self.action_failed(action_id, *action_type, error).await,
        }
    }

    async fn port_group_created(&self, _switch: &str, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn port_group_destroyed(&self, _switch: &str, _name: &str) -> anyhow::Result<()> {
        Ok(())
    }

    async fn vnic_connected(
        &self,
        _vm_uuid: &str,
        _mac_address: Option<&str>,
        _network: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn vnic_disconnected(
        &self,
        _vm_uuid: &str,
        _mac_address: &str,
        _network: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }

    async fn action_failed(
        &self,
        _action_id: &str,
        _action_type: ConnectivityActionType,
        _error: &str,
    ) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Listeners subscribed by name, notified in subscription order.
///
/// Subscriptions happen while wiring up a flow; the bus is shared read-only
/// afterwards.
#[derive(Clone, Default)]
pub struct EventBus {
    listeners: IndexMap<String, Arc<dyn ConnectivityListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(
        &mut self,
        name: impl Into<String>,
        listener: Arc<dyn ConnectivityListener>,
    ) -> EventBusResult<()> {
        let name = name.into();
        if self.listeners.contains_key(&name) {
            return Err(EventBusError::DuplicateListener(name));
        }
        self.listeners.insert(name, listener);
        Ok(())
    }

    /// Notify every listener. A failing listener is reported but does not
    /// keep the event from the others.
    pub async fn publish(&self, event: SystemEvent) -> EventBusResult<()> {
        let mut failures = Vec::new();
        for (name, listener) in &self.listeners {
            if let Err(e) = listener.on_event(&event).await {
                warn!("Listener '{}' rejected {:?}: {}", name, event, e);
                failures.push(ListenerFailure {
                    listener: name.clone(),
                    error: e.to_string(),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(EventBusError::ListenersFailed(failures))
        }
    }
}

#[derive(Debug, Error)]
pub enum EventBusError {
    #[error("listener '{0}' is already subscribed")]
    DuplicateListener(String),
    #[error("listeners failed: {}", render_failures(.0))]
    ListenersFailed(Vec<ListenerFailure>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerFailure {
    pub listener: String,
    pub error: String,
}

fn render_failures(failures: &[ListenerFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.listener, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// One journal line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub event: SystemEvent,
}

/// Listener that keeps every event of a run
#[derive(Default)]
pub struct EventJournal {
    entries: Mutex<Vec<JournalEntry>>,
}

impl EventJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().await.clone()
    }

    /// Port groups created during the run and not destroyed again, in
    /// creation order
    pub async fn remaining_port_groups(&self) -> Vec<String> {
        let entries = self.entries.lock().await;
        let mut remaining: Vec<String> = Vec::new();
        for entry in entries.iter() {
            match &entry.event {
                SystemEvent::PortGroupCreated { name, .. } => remaining.push(name.clone()),
                SystemEvent::PortGroupDestroyed { name, .. } => remaining.retain(|n| n != name),
                _ => {}
            }
        }
        remaining
    }

    /// The journal as JSON lines
    pub async fn to_json_lines(&self) -> serde_json::Result<String> {
        let entries = self.entries.lock().await;
        let mut out = String::new();
        for entry in entries.iter() {
            out.push_str(&serde_json::to_string(entry)?);
            out.push('\n');
        }
        Ok(out)
    }
}

#[async_trait]
impl ConnectivityListener for EventJournal {
    async fn on_event(&self, event: &SystemEvent) -> anyhow::Result<()> {
        self.entries.lock().await.push(JournalEntry {
            at: Utc::now(),
            event: event.clone(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Default)]
    struct PortGroupCounter {
        created: AtomicUsize,
        destroyed: AtomicUsize,
    }

    #[async_trait]
    impl ConnectivityListener for PortGroupCounter {
        async fn port_group_created(&self, _switch: &str, _name: &str) -> anyhow::Result<()> {
            self.created.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn port_group_destroyed(&self, _switch: &str, _name: &str) -> anyhow::Result<()> {
            self.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RejectsFailures;

    #[async_trait]
    impl ConnectivityListener for RejectsFailures {
        async fn action_failed(
            &self,
            action_id: &str,
            _action_type: ConnectivityActionType,
            _error: &str,
        ) -> anyhow::Result<()> {
            anyhow::bail!("cannot report {}", action_id)
        }
    }

    fn created(name: &str) -> SystemEvent {
        SystemEvent::PortGroupCreated {
            switch: "dvSwitch-01".into(),
            name: name.into(),
        }
    }

    fn destroyed(name: &str) -> SystemEvent {
        SystemEvent::PortGroupDestroyed {
            switch: "dvSwitch-01".into(),
            name: name.into(),
        }
    }

    fn failed(action_id: &str) -> SystemEvent {
        SystemEvent::ConnectivityActionFailed {
            action_id: action_id.into(),
            action_type: ConnectivityActionType::SetVlan,
            error: "VM not found".into(),
        }
    }

    #[tokio::test]
    async fn typed_hooks_only_see_their_events() {
        let counter = Arc::new(PortGroupCounter::default());
        let mut bus = EventBus::new();
        bus.subscribe("counter", counter.clone()).unwrap();

        bus.publish(created("QS_dvSwitch-01_VLAN_10_access"))
            .await
            .unwrap();
        bus.publish(failed("a-1")).await.unwrap();
        bus.publish(destroyed("QS_dvSwitch-01_VLAN_10_access"))
            .await
            .unwrap();

        assert_eq!(counter.created.load(Ordering::SeqCst), 1);
        assert_eq!(counter.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn listener_names_are_unique() {
        let mut bus = EventBus::new();
        bus.subscribe("journal", Arc::new(EventJournal::new()))
            .unwrap();
        assert!(matches!(
            bus.subscribe("journal", Arc::new(EventJournal::new())),
            Err(EventBusError::DuplicateListener(name)) if name == "journal"
        ));
    }

    #[tokio::test]
    async fn failing_listener_does_not_starve_the_journal() {
        let journal = Arc::new(EventJournal::new());
        let mut bus = EventBus::new();
        bus.subscribe("reporter", Arc::new(RejectsFailures)).unwrap();
        bus.subscribe("journal", journal.clone()).unwrap();

        let err = bus.publish(failed("a-7")).await.unwrap_err();

        match &err {
            EventBusError::ListenersFailed(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].listener, "reporter");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(err.to_string().contains("cannot report a-7"));
        assert_eq!(journal.entries().await.len(), 1);
    }

    #[tokio::test]
    async fn journal_tracks_port_groups_left_behind() {
        let journal = EventJournal::new();
        for event in [
            created("QS_dvSwitch-01_VLAN_10_access"),
            created("QS_dvSwitch-01_VLAN_20_access"),
            destroyed("QS_dvSwitch-01_VLAN_10_access"),
        ] {
            journal.on_event(&event).await.unwrap();
        }

        assert_eq!(
            journal.remaining_port_groups().await,
            vec!["QS_dvSwitch-01_VLAN_20_access"]
        );

        let lines = journal.to_json_lines().await.unwrap();
        let first: serde_json::Value = serde_json::from_str(lines.lines().next().unwrap()).unwrap();
        assert_eq!(first["event"], "port_group_created");
        assert_eq!(first["name"], "QS_dvSwitch-01_VLAN_10_access");
        assert!(first["at"].is_string());
        assert_eq!(lines.lines().count(), 3);
    }
}
