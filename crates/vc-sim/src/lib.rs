//! In-memory vCenter
//!
//! Implements [`VSphereClient`] over a [`SimState`] inventory. Mutating calls
//! run as tasks that finish after a configurable number of polls, and new
//! distributed port groups only show up in enumerations after a configurable
//! number of listings, mimicking vCenter's eventual consistency.

pub mod state;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use indexmap::IndexMap;
use log::debug;
use thiserror::Error;
use tokio::sync::Mutex;
use vc_core::client::{RemoteError, RemoteResult, VSphereClient};
use vc_shared_types::{
    ClusterInfo, DvPortGroupInfo, DvPortGroupSpec, DvSwitchInfo, HostPortGroupInfo,
    HostPortGroupSpec, HostVSwitchInfo, MoRef, NetworkInfo, TaskError, TaskInfo, TaskRef,
    TaskState, VmConfigSpec, VmInfo, VnicBacking,
};

pub use state::{SimDvPortGroup, SimHostPortGroup, SimState, SimVm};

#[derive(Debug, Error)]
pub enum SimError {
    #[error("Unknown managed object {0}")]
    UnknownObject(String),

    #[error("Failed to read or write simulator state: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid simulator state: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;

/// Timing knobs of the simulation
#[derive(Debug, Clone, Copy)]
pub struct SimSettings {
    /// `task_info` calls reporting `running` before a task completes
    pub task_polls: u32,
    /// Enumerations that miss a freshly created distributed port group
    pub visibility_lag: u32,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            task_polls: 1,
            visibility_lag: 2,
        }
    }
}

enum TaskEffect {
    CreateDvPortGroup { switch: MoRef, spec: DvPortGroupSpec },
    Reconfigure { vm: MoRef, spec: VmConfigSpec },
    Fail(String),
}

struct SimTask {
    info: TaskInfo,
    remaining_polls: u32,
    cancel_requested: bool,
    effect: Option<TaskEffect>,
}

#[derive(Default)]
struct Runtime {
    state: SimState,
    tasks: IndexMap<String, SimTask>,
    reconfigure_failures: Vec<String>,
}

/// Counters of mutating calls, for assertions
#[derive(Debug, Default)]
pub struct CallCounters {
    pub port_groups_created: AtomicUsize,
    pub port_groups_destroyed: AtomicUsize,
    pub reconfigures: AtomicUsize,
}

pub struct SimulatedVCenter {
    runtime: Mutex<Runtime>,
    settings: SimSettings,
    counters: CallCounters,
}

impl SimulatedVCenter {
    pub fn new(state: SimState) -> Self {
        Self::with_settings(state, SimSettings::default())
    }

    pub fn with_settings(state: SimState, settings: SimSettings) -> Self {
        Self {
            runtime: Mutex::new(Runtime {
                state,
                ..Default::default()
            }),
            settings,
            counters: CallCounters::default(),
        }
    }

    pub fn from_file<P: AsRef<Path>>(path: P, settings: SimSettings) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let state: SimState = serde_json::from_str(&raw)?;
        Ok(Self::with_settings(state, settings))
    }

    /// Persist the inventory; in-flight tasks are not saved
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let raw = serde_json::to_string_pretty(&self.snapshot().await)?;
        std::fs::write(path, raw)?;
        Ok(())
    }

    pub async fn snapshot(&self) -> SimState {
        self.runtime.lock().await.state.clone()
    }

    /// The next `count` VM reconfigurations fail with `message`
    pub async fn fail_next_reconfigures(&self, count: usize, message: &str) {
        let mut runtime = self.runtime.lock().await;
        for _ in 0..count {
            runtime.reconfigure_failures.push(message.to_string());
        }
    }

    pub fn port_groups_created(&self) -> usize {
        self.counters.port_groups_created.load(Ordering::SeqCst)
    }

    pub fn port_groups_destroyed(&self) -> usize {
        self.counters.port_groups_destroyed.load(Ordering::SeqCst)
    }

    pub fn reconfigures(&self) -> usize {
        self.counters.reconfigures.load(Ordering::SeqCst)
    }

    fn submit(&self, runtime: &mut Runtime, description: &str, effect: TaskEffect) -> TaskRef {
        let key = runtime.state.next_moref("task");
        runtime.tasks.insert(
            key.to_string(),
            SimTask {
                info: TaskInfo {
                    key: key.clone(),
                    description: description.to_string(),
                    state: TaskState::Queued,
                    result: None,
                    error: None,
                    cancelable: true,
                    cancelled: false,
                    queue_time: Utc::now(),
                    complete_time: None,
                },
                remaining_polls: self.settings.task_polls,
                cancel_requested: false,
                effect: Some(effect),
            },
        );
        debug!("Submitted {} as {}", description, key);
        key
    }

    fn complete(
        &self,
        state: &mut SimState,
        effect: TaskEffect,
    ) -> std::result::Result<Option<MoRef>, String> {
        match effect {
            TaskEffect::Fail(message) => Err(message),
            TaskEffect::CreateDvPortGroup { switch, spec } => {
                let moref = state.next_moref("dvportgroup");
                let lag = self.settings.visibility_lag;
                let target = state
                    .dv_switch_mut(&switch)
                    .ok_or_else(|| format!("The object '{}' has already been deleted", switch))?;
                if target.port_groups.iter().any(|pg| pg.name == spec.name) {
                    return Err(format!("The name '{}' already exists.", spec.name));
                }
                target.port_groups.push(SimDvPortGroup {
                    moref: moref.clone(),
                    key: moref.to_string(),
                    name: spec.name,
                    vlan: spec.vlan,
                    num_ports: spec.num_ports,
                    security: spec.security,
                    hidden_listings: lag,
                });
                self.counters.port_groups_created.fetch_add(1, Ordering::SeqCst);
                Ok(Some(moref))
            }
            TaskEffect::Reconfigure { vm, spec } => {
                for change in spec.device_change {
                    let mut device = change.device;
                    match &device.backing {
                        VnicBacking::DistributedPort { port_group_key, .. } => {
                            let exists = state.datacenters.values().any(|dc| {
                                dc.dv_switches
                                    .iter()
                                    .flat_map(|s| s.port_groups.iter())
                                    .any(|pg| &pg.key == port_group_key)
                            });
                            if !exists {
                                return Err(format!(
                                    "The object 'vim.dvs.DistributedVirtualPortgroup:{}' has already been deleted",
                                    port_group_key
                                ));
                            }
                        }
                        VnicBacking::Network { network, .. } => {
                            if state.network_name(network).is_none() {
                                return Err(format!(
                                    "The object '{}' has already been deleted",
                                    network
                                ));
                            }
                        }
                        VnicBacking::None => {}
                    }
                    if device.mac_address.as_deref().map(str::is_empty).unwrap_or(true) {
                        device.mac_address = Some(state.next_mac());
                    }
                    let sim_vm = state
                        .vms
                        .get_mut(vm.as_str())
                        .ok_or_else(|| format!("The object '{}' has already been deleted", vm))?;
                    let slot = sim_vm
                        .nics
                        .iter_mut()
                        .find(|nic| nic.key == device.key)
                        .ok_or_else(|| format!("Device {} not found on {}", device.key, vm))?;
                    *slot = device;
                }
                self.counters.reconfigures.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            }
        }
    }

    fn vm_info_from(state: &SimState, vm: &SimVm) -> VmInfo {
        let known = state.all_networks();
        let mut networks: Vec<NetworkInfo> = Vec::new();
        for nic in &vm.nics {
            let found = match &nic.backing {
                VnicBacking::Network { network, .. } => known.iter().find(|n| &n.moref == network),
                VnicBacking::DistributedPort { port_group_key, .. } => known
                    .iter()
                    .find(|n| n.port_group_key() == Some(port_group_key.as_str())),
                VnicBacking::None => None,
            };
            if let Some(net) = found {
                if !networks.iter().any(|n| n.moref == net.moref) {
                    networks.push(net.clone());
                }
            }
        }

        VmInfo {
            moref: vm.moref.clone(),
            name: vm.name.clone(),
            uuid: vm.uuid.clone(),
            host: vm.host.clone(),
            power_state: vm.power_state,
            tools_status: vm.tools_status,
            networks,
            nics: vm.nics.clone(),
        }
    }
}

fn not_found(what: &MoRef) -> RemoteError {
    RemoteError::ObjectNotFound(format!(
        "The object '{}' has already been deleted or has not been completely created",
        what
    ))
}

#[async_trait]
impl VSphereClient for SimulatedVCenter {
    async fn find_datacenter(&self, name: &str) -> RemoteResult<Option<MoRef>> {
        let runtime = self.runtime.lock().await;
        Ok(runtime
            .state
            .datacenters
            .values()
            .find(|dc| dc.name == name)
            .map(|dc| dc.moref.clone()))
    }

    async fn datacenter_networks(&self, dc: &MoRef) -> RemoteResult<Vec<NetworkInfo>> {
        let runtime = self.runtime.lock().await;
        let datacenter = runtime
            .state
            .datacenters
            .get(dc.as_str())
            .ok_or_else(|| not_found(dc))?;
        Ok(runtime.state.datacenter_network_infos(datacenter, false))
    }

    async fn datacenter_clusters(&self, dc: &MoRef) -> RemoteResult<Vec<ClusterInfo>> {
        let runtime = self.runtime.lock().await;
        let datacenter = runtime
            .state
            .datacenters
            .get(dc.as_str())
            .ok_or_else(|| not_found(dc))?;
        Ok(datacenter
            .clusters
            .iter()
            .map(|c| ClusterInfo {
                moref: c.moref.clone(),
                name: c.name.clone(),
                hosts: c.hosts.clone(),
            })
            .collect())
    }

    async fn datacenter_dv_switches(&self, dc: &MoRef) -> RemoteResult<Vec<DvSwitchInfo>> {
        let runtime = self.runtime.lock().await;
        let datacenter = runtime
            .state
            .datacenters
            .get(dc.as_str())
            .ok_or_else(|| not_found(dc))?;
        Ok(datacenter
            .dv_switches
            .iter()
            .map(|s| DvSwitchInfo {
                moref: s.moref.clone(),
                name: s.name.clone(),
                uuid: s.uuid.clone(),
            })
            .collect())
    }

    async fn find_vm_by_uuid(&self, dc: &MoRef, uuid: &str) -> RemoteResult<Option<VmInfo>> {
        let runtime = self.runtime.lock().await;
        let state = &runtime.state;
        Ok(state
            .vms
            .values()
            .find(|vm| &vm.datacenter == dc && vm.uuid.eq_ignore_ascii_case(uuid))
            .map(|vm| Self::vm_info_from(state, vm)))
    }

    async fn vm_info(&self, vm: &MoRef) -> RemoteResult<VmInfo> {
        let runtime = self.runtime.lock().await;
        let state = &runtime.state;
        state
            .vms
            .get(vm.as_str())
            .map(|sim_vm| Self::vm_info_from(state, sim_vm))
            .ok_or_else(|| not_found(vm))
    }

    async fn host_vswitches(&self, host: &MoRef) -> RemoteResult<Vec<HostVSwitchInfo>> {
        let runtime = self.runtime.lock().await;
        runtime
            .state
            .hosts
            .get(host.as_str())
            .map(|h| h.vswitches.clone())
            .ok_or_else(|| not_found(host))
    }

    async fn host_port_groups(&self, host: &MoRef) -> RemoteResult<Vec<HostPortGroupInfo>> {
        let runtime = self.runtime.lock().await;
        let state = &runtime.state;
        let sim_host = state.hosts.get(host.as_str()).ok_or_else(|| not_found(host))?;
        Ok(sim_host
            .port_groups
            .iter()
            .map(|pg| HostPortGroupInfo {
                key: pg.key.clone(),
                name: pg.name.clone(),
                vswitch_name: pg.vswitch_name.clone(),
                vlan_id: pg.vlan_id,
                security: pg.security,
                vms: state.vms_on_network(&pg.network),
            })
            .collect())
    }

    async fn dv_port_groups(&self, switch: &MoRef) -> RemoteResult<Vec<DvPortGroupInfo>> {
        let mut runtime = self.runtime.lock().await;
        let Some(sim_switch) = runtime.state.dv_switch(switch) else {
            return Err(not_found(switch));
        };
        let uuid = sim_switch.uuid.clone();
        let visible: Vec<SimDvPortGroup> = sim_switch
            .port_groups
            .iter()
            .filter(|pg| pg.hidden_listings == 0)
            .cloned()
            .collect();

        if let Some(sim_switch) = runtime.state.dv_switch_mut(switch) {
            for pg in sim_switch.port_groups.iter_mut() {
                pg.hidden_listings = pg.hidden_listings.saturating_sub(1);
            }
        }

        let state = &runtime.state;
        Ok(visible
            .into_iter()
            .map(|pg| DvPortGroupInfo {
                vms: state.vms_on_port_group_key(&pg.key),
                moref: pg.moref,
                key: pg.key,
                name: pg.name,
                switch_uuid: uuid.clone(),
                vlan: pg.vlan,
                num_ports: pg.num_ports,
                security: pg.security,
            })
            .collect())
    }

    async fn add_dv_port_group(
        &self,
        switch: &MoRef,
        spec: DvPortGroupSpec,
    ) -> RemoteResult<TaskRef> {
        let mut runtime = self.runtime.lock().await;
        if runtime.state.dv_switch(switch).is_none() {
            return Err(not_found(switch));
        }
        let description = format!("AddDVPortgroup_Task {}", spec.name);
        Ok(self.submit(
            &mut runtime,
            &description,
            TaskEffect::CreateDvPortGroup {
                switch: switch.clone(),
                spec,
            },
        ))
    }

    async fn destroy_dv_port_group(&self, port_group: &MoRef) -> RemoteResult<()> {
        let mut runtime = self.runtime.lock().await;
        let state = &mut runtime.state;
        let mut location = None;
        for dc in state.datacenters.values() {
            for switch in &dc.dv_switches {
                if let Some(pg) = switch.port_groups.iter().find(|pg| &pg.moref == port_group) {
                    location = Some((switch.moref.clone(), pg.key.clone()));
                }
            }
        }
        let (switch, key) = location.ok_or_else(|| not_found(port_group))?;

        let users = state.vms_on_port_group_key(&key);
        if !users.is_empty() {
            return Err(RemoteError::ResourceInUse(format!(
                "The resource '{}' is in use by {} VM(s)",
                port_group,
                users.len()
            )));
        }
        if let Some(sim_switch) = state.dv_switch_mut(&switch) {
            sim_switch.port_groups.retain(|pg| &pg.moref != port_group);
        }
        self.counters.port_groups_destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn add_host_port_group(
        &self,
        host: &MoRef,
        spec: HostPortGroupSpec,
    ) -> RemoteResult<()> {
        let mut runtime = self.runtime.lock().await;
        let state = &mut runtime.state;
        let network = state.next_moref("network");
        let sim_host = state.hosts.get_mut(host.as_str()).ok_or_else(|| not_found(host))?;
        if !sim_host.vswitches.iter().any(|v| v.name == spec.vswitch_name) {
            return Err(RemoteError::ObjectNotFound(format!(
                "vSwitch '{}' not found on {}",
                spec.vswitch_name, host
            )));
        }
        if sim_host.port_groups.iter().any(|pg| pg.name == spec.name) {
            return Err(RemoteError::Other(format!(
                "The specified key, name, or identifier '{}' already exists.",
                spec.name
            )));
        }
        sim_host.port_groups.push(SimHostPortGroup {
            key: format!("key-vim.host.PortGroup-{}", spec.name),
            name: spec.name,
            vswitch_name: spec.vswitch_name,
            vlan_id: spec.vlan_id,
            security: spec.security,
            network,
        });
        self.counters.port_groups_created.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove_host_port_group(&self, host: &MoRef, name: &str) -> RemoteResult<()> {
        let mut runtime = self.runtime.lock().await;
        let state = &mut runtime.state;
        let network = state
            .hosts
            .get(host.as_str())
            .ok_or_else(|| not_found(host))?
            .port_groups
            .iter()
            .find(|pg| pg.name == name)
            .map(|pg| pg.network.clone())
            .ok_or_else(|| RemoteError::ObjectNotFound(format!("Port group '{}' not found", name)))?;

        if !state.vms_on_network(&network).is_empty() {
            return Err(RemoteError::ResourceInUse(format!(
                "Port group '{}' is in use",
                name
            )));
        }
        if let Some(sim_host) = state.hosts.get_mut(host.as_str()) {
            sim_host.port_groups.retain(|pg| pg.name != name);
        }
        self.counters.port_groups_destroyed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn reconfigure_vm(&self, vm: &MoRef, spec: VmConfigSpec) -> RemoteResult<TaskRef> {
        let mut runtime = self.runtime.lock().await;
        if !runtime.state.vms.contains_key(vm.as_str()) {
            return Err(not_found(vm));
        }
        let effect = if runtime.reconfigure_failures.is_empty() {
            TaskEffect::Reconfigure {
                vm: vm.clone(),
                spec,
            }
        } else {
            TaskEffect::Fail(runtime.reconfigure_failures.remove(0))
        };
        Ok(self.submit(&mut runtime, &format!("ReconfigVM_Task {}", vm), effect))
    }

    async fn task_info(&self, task: &TaskRef) -> RemoteResult<TaskInfo> {
        let mut runtime = self.runtime.lock().await;
        let Runtime { state, tasks, .. } = &mut *runtime;
        let sim_task = tasks.get_mut(task.as_str()).ok_or_else(|| not_found(task))?;

        if sim_task.info.state.is_terminal() {
            return Ok(sim_task.info.clone());
        }

        if sim_task.cancel_requested {
            sim_task.effect = None;
            sim_task.info.state = TaskState::Error;
            sim_task.info.cancelled = true;
            sim_task.info.error = Some(TaskError {
                msg: Some("The task was canceled by a user.".to_string()),
                fault_messages: vec![],
            });
            sim_task.info.complete_time = Some(Utc::now());
            return Ok(sim_task.info.clone());
        }

        if sim_task.remaining_polls > 0 {
            sim_task.remaining_polls -= 1;
            sim_task.info.state = TaskState::Running;
            return Ok(sim_task.info.clone());
        }

        let outcome = match sim_task.effect.take() {
            Some(effect) => self.complete(state, effect),
            None => Ok(None),
        };
        match outcome {
            Ok(result) => {
                sim_task.info.state = TaskState::Success;
                sim_task.info.result = result;
            }
            Err(message) => {
                sim_task.info.state = TaskState::Error;
                sim_task.info.error = Some(TaskError {
                    msg: Some(message.clone()),
                    fault_messages: vec![message],
                });
            }
        }
        sim_task.info.complete_time = Some(Utc::now());
        Ok(sim_task.info.clone())
    }

    async fn cancel_task(&self, task: &TaskRef) -> RemoteResult<()> {
        let mut runtime = self.runtime.lock().await;
        let sim_task = runtime
            .tasks
            .get_mut(task.as_str())
            .ok_or_else(|| not_found(task))?;
        if sim_task.info.cancelable && !sim_task.info.state.is_terminal() {
            sim_task.cancel_requested = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use vc_core::task::TaskWaiter;
    use vc_shared_types::{PortGroupBinding, SecurityPolicy, VlanSpec};

    use super::*;

    fn inventory() -> (SimState, MoRef, MoRef) {
        let mut state = SimState::new();
        let dc = state.add_datacenter("DC1");
        let switch = state.add_dv_switch(&dc, "dvSwitch-01").unwrap();
        (state, dc, switch)
    }

    fn spec(name: &str) -> DvPortGroupSpec {
        DvPortGroupSpec {
            name: name.to_string(),
            num_ports: 32,
            binding: PortGroupBinding::EarlyBinding,
            vlan: VlanSpec::VlanId(10),
            security: SecurityPolicy::for_sandbox(false),
        }
    }

    #[tokio::test]
    async fn created_port_group_appears_after_lag() {
        let (state, _dc, switch) = inventory();
        let sim = Arc::new(SimulatedVCenter::with_settings(
            state,
            SimSettings {
                task_polls: 2,
                visibility_lag: 2,
            },
        ));
        let task = sim.add_dv_port_group(&switch, spec("QS_a")).await.unwrap();
        let waiter = TaskWaiter::new(sim.clone()).with_poll_interval(Duration::from_millis(1));
        let created = waiter.wait_for_task(&task, "create").await.unwrap();
        assert!(created.is_some());
        assert_eq!(sim.port_groups_created(), 1);

        assert!(sim.dv_port_groups(&switch).await.unwrap().is_empty());
        assert!(sim.dv_port_groups(&switch).await.unwrap().is_empty());
        let listed = sim.dv_port_groups(&switch).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "QS_a");
    }

    #[tokio::test]
    async fn injected_reconfigure_failure_fails_the_task() {
        let (mut state, dc, _switch) = inventory();
        let net = state.add_network(&dc, "Holding").unwrap();
        let host = state.add_host(&dc, None, "esx").unwrap();
        let vm = state.add_vm(&host, "vm", "u-1", 1, Some(&net), true).unwrap();
        let sim = Arc::new(SimulatedVCenter::new(state));
        sim.fail_next_reconfigures(1, "Invalid configuration for device '0'.")
            .await;

        let task = sim.reconfigure_vm(&vm, VmConfigSpec::default()).await.unwrap();
        let waiter = TaskWaiter::new(sim.clone()).with_poll_interval(Duration::from_millis(1));
        let err = waiter.wait_for_task(&task, "reconfigure").await.unwrap_err();
        assert!(err.to_string().contains("Invalid configuration"));
        assert_eq!(sim.reconfigures(), 0);
    }

    #[tokio::test]
    async fn destroy_refuses_port_group_in_use() {
        let (mut state, dc, switch) = inventory();
        let host = state.add_host(&dc, None, "esx").unwrap();
        let vm = state.add_vm(&host, "vm", "u-1", 1, None, true).unwrap();
        {
            let sim_switch = state.dv_switch_mut(&switch).unwrap();
            sim_switch.port_groups.push(SimDvPortGroup {
                moref: MoRef::new("dvportgroup-90"),
                key: "dvportgroup-90".to_string(),
                name: "QS_used".to_string(),
                vlan: VlanSpec::VlanId(5),
                num_ports: 32,
                security: SecurityPolicy::for_sandbox(false),
                hidden_listings: 0,
            });
        }
        state.vms.get_mut(vm.as_str()).unwrap().nics[0].backing = VnicBacking::DistributedPort {
            port_group_key: "dvportgroup-90".to_string(),
            switch_uuid: "x".to_string(),
        };
        let sim = SimulatedVCenter::new(state);

        let err = sim
            .destroy_dv_port_group(&MoRef::new("dvportgroup-90"))
            .await
            .unwrap_err();
        assert!(matches!(err, RemoteError::ResourceInUse(_)));
        assert_eq!(sim.port_groups_destroyed(), 0);
        let listed = sim.dv_port_groups(&switch).await.unwrap();
        assert_eq!(listed[0].vms, vec![vm]);
    }

    #[tokio::test]
    async fn cancelled_task_ends_in_error() {
        let (state, _dc, switch) = inventory();
        let sim = SimulatedVCenter::with_settings(
            state,
            SimSettings {
                task_polls: 5,
                visibility_lag: 0,
            },
        );
        let task = sim.add_dv_port_group(&switch, spec("QS_b")).await.unwrap();
        sim.cancel_task(&task).await.unwrap();
        let info = sim.task_info(&task).await.unwrap();
        assert_eq!(info.state, TaskState::Error);
        assert!(info.cancelled);
        assert_eq!(sim.port_groups_created(), 0);
    }

    #[tokio::test]
    async fn state_file_round_trip() {
        let (state, _dc, _switch) = inventory();
        let sim = SimulatedVCenter::new(state);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        sim.save(&path).await.unwrap();

        let loaded = SimulatedVCenter::from_file(&path, SimSettings::default()).unwrap();
        assert_eq!(
            loaded.find_datacenter("DC1").await.unwrap(),
            sim.find_datacenter("DC1").await.unwrap()
        );
    }
}
