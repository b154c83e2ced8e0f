//! CLI command tests

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use vc_shared_types::ConnectionMode;
use vc_sim::{SimSettings, SimState};

use crate::commands::*;

/// Inventory with one distributed switch and one VM parked on the holding
/// network
fn write_inventory(dir: &Path) -> (String, String) {
    let mut state = SimState::new();
    let dc = state.add_datacenter("DC1");
    let holding = state.add_network(&dc, "Holding").unwrap();
    state.add_dv_switch(&dc, "dvSwitch-01").unwrap();
    let host = state.add_host(&dc, None, "esx-01").unwrap();
    state
        .add_vm(&host, "app-1", "4212-ab", 1, Some(&holding), true)
        .unwrap();
    let mac = state.vms.values().next().unwrap().nics[0]
        .mac_address
        .clone()
        .unwrap();

    let path = dir.join("inventory.json");
    fs::write(&path, serde_json::to_string_pretty(&state).unwrap()).unwrap();
    (path.to_str().unwrap().to_string(), mac)
}

fn write_file(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

const CONFIG: &str = r#"
default_datacenter = "DC1"
default_dv_switch = "dvSwitch-01"
holding_network = "Holding"

[timeouts]
task_poll_interval_ms = 1
port_group_poll_interval_ms = 1
port_group_wait_timeout_ms = 1000
"#;

fn set_vlan_request(vm_uuid: &str) -> String {
    format!(
        r#"{{"driverRequest": {{"actions": [{{
            "actionId": "a1",
            "type": "setVlan",
            "connectionParams": {{"vlanId": "100", "mode": "Access"}},
            "customActionAttributes": [{{"attributeName": "VM_UUID", "attributeValue": "{}"}}]
        }}]}}}}"#,
        vm_uuid
    )
}

#[test]
fn test_port_group_name() {
    let cmd = PortGroupNameCommand::new();
    assert_eq!(
        cmd.render("dvSwitch-01", "100", ConnectionMode::Access).unwrap(),
        "QS_dvSwitch-01_VLAN_100_access"
    );
    assert_eq!(
        cmd.render("dvSwitch-01", "10-20,30", ConnectionMode::Trunk).unwrap(),
        "QS_dvSwitch-01_VLAN_10-20,30_trunk"
    );
}

#[test]
fn test_port_group_name_rejects_bad_vlan() {
    let cmd = PortGroupNameCommand::new();
    assert!(cmd.render("dvSwitch-01", "5000", ConnectionMode::Access).is_err());
    assert!(cmd.render("dvSwitch-01", "", ConnectionMode::Access).is_err());
}

#[test]
fn test_generated_config_passes_check() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("resource.toml");
    let path = path.to_str().unwrap();

    GenerateConfigCommand::new()
        .execute("DC1", "dvSwitch-01", "Holding", Some(path))
        .unwrap();
    let written = fs::read_to_string(path).unwrap();
    assert!(written.contains("holding_network = \"Holding\""));

    assert!(CheckConfigCommand::new().execute(path).is_ok());
}

#[test]
fn test_check_config_reports_missing_attributes() {
    let temp_dir = TempDir::new().unwrap();
    let path = write_file(temp_dir.path(), "resource.toml", "default_datacenter = \"DC1\"\n");

    let err = CheckConfigCommand::new().execute(&path).unwrap_err();
    let message = err.to_string();
    assert!(message.contains("default_dv_switch"));
    assert!(message.contains("holding_network"));
}

#[test]
fn test_check_config_missing_file() {
    let err = CheckConfigCommand::new()
        .execute("/nonexistent/resource.toml")
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

#[tokio::test]
async fn test_apply_with_write_back() {
    let temp_dir = TempDir::new().unwrap();
    let (inventory, mac) = write_inventory(temp_dir.path());
    let config = write_file(temp_dir.path(), "resource.toml", CONFIG);
    let request = write_file(temp_dir.path(), "request.json", &set_vlan_request("4212-ab"));

    let journal = temp_dir.path().join("events.jsonl");
    let cmd = ApplyCommand::new(SimSettings {
        task_polls: 0,
        visibility_lag: 1,
    })
    .with_journal(Some(journal.to_string_lossy().into_owned()));
    let response = cmd.run(&config, &inventory, &request, true).await.unwrap();

    let result = &response.driver_response.action_results[0];
    assert!(result.success, "{}", result.error_message);
    assert_eq!(result.updated_interface, mac);

    let inspect = InspectCommand::new();
    let state = inspect.load(&inventory).unwrap();
    assert_eq!(state.port_group_names(), vec!["QS_dvSwitch-01_VLAN_100_access"]);
    let text = inspect.render(&state, OutputFormat::Text).unwrap();
    assert!(text.contains("QS_dvSwitch-01_VLAN_100_access"));
    assert!(text.contains(&mac));

    let events: Vec<serde_json::Value> = fs::read_to_string(&journal)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events[0]["event"], "port_group_created");
    assert_eq!(events[1]["event"], "vnic_connected");
    assert_eq!(events[1]["mac_address"], mac.as_str());
}

#[tokio::test]
async fn test_apply_reports_failed_actions() {
    let temp_dir = TempDir::new().unwrap();
    let (inventory, _) = write_inventory(temp_dir.path());
    let config = write_file(temp_dir.path(), "resource.toml", CONFIG);
    let request = write_file(temp_dir.path(), "request.json", &set_vlan_request("unknown"));

    let cmd = ApplyCommand::new(SimSettings::default());
    let err = cmd
        .execute(&config, &inventory, &request, false)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("1 action(s) failed"));

    // nothing written back
    let state = InspectCommand::new().load(&inventory).unwrap();
    assert!(state.port_group_names().is_empty());
}

#[test]
fn test_inspect_formats() {
    let temp_dir = TempDir::new().unwrap();
    let (inventory, _) = write_inventory(temp_dir.path());
    let cmd = InspectCommand::new();
    let state = cmd.load(&inventory).unwrap();

    let json = cmd.render(&state, OutputFormat::Json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert!(value["vms"].is_object());

    let yaml = cmd.render(&state, OutputFormat::Yaml).unwrap();
    assert!(yaml.contains("dvSwitch-01"));

    let text = cmd.render(&state, OutputFormat::Text).unwrap();
    assert!(text.contains("Datacenter DC1"));
    assert!(text.contains("Network adapter 1"));

    assert_eq!("YAML".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
    assert!("xml".parse::<OutputFormat>().is_err());
}
