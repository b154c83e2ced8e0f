//! Connectivity request/response model exchanged with the sandbox orchestrator.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SharedTypeError;

/// Custom action attribute carrying the target VM
pub const VM_UUID_ATTRIBUTE: &str = "VM_UUID";
/// Custom action attribute naming the adapter to use
pub const VNIC_NAME_ATTRIBUTE: &str = "Vnic Name";
/// Connector attribute carrying the adapter MAC on removal
pub const INTERFACE_ATTRIBUTE: &str = "Interface";

/// Port mode of a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionMode {
    #[serde(alias = "access", alias = "ACCESS")]
    Access,
    #[serde(alias = "trunk", alias = "TRUNK")]
    Trunk,
}

impl ConnectionMode {
    /// Textual form used in generated port group names
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionMode::Access => "access",
            ConnectionMode::Trunk => "trunk",
        }
    }
}

impl std::fmt::Display for ConnectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectionMode {
    type Err = SharedTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "access" => Ok(ConnectionMode::Access),
            "trunk" => Ok(ConnectionMode::Trunk),
            _ => Err(SharedTypeError::InvalidValue {
                field: "mode",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectivityActionType {
    SetVlan,
    RemoveVlan,
}

impl std::fmt::Display for ConnectivityActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectivityActionType::SetVlan => write!(f, "setVlan"),
            ConnectivityActionType::RemoveVlan => write!(f, "removeVlan"),
        }
    }
}

/// A single connect/disconnect intent, detached from the wire format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectivityAction {
    pub action_id: String,
    pub action_type: ConnectivityActionType,
    pub vm_uuid: String,
    /// VLAN id or range as sent by the orchestrator (`"100"`, `"100-200"`).
    /// Empty on removal means "disconnect whatever we wired".
    pub vlan_id: String,
    pub mode: ConnectionMode,
    /// Adapter label to use when connecting
    pub vnic_name: Option<String>,
    /// Adapter MAC to disconnect
    pub interface_mac: Option<String>,
}

impl ConnectivityAction {
    pub fn set_vlan(vm_uuid: impl Into<String>, vlan_id: impl Into<String>, mode: ConnectionMode) -> Self {
        Self {
            action_id: String::new(),
            action_type: ConnectivityActionType::SetVlan,
            vm_uuid: vm_uuid.into(),
            vlan_id: vlan_id.into(),
            mode,
            vnic_name: None,
            interface_mac: None,
        }
    }

    pub fn remove_vlan(
        vm_uuid: impl Into<String>,
        vlan_id: impl Into<String>,
        mode: ConnectionMode,
        interface_mac: impl Into<String>,
    ) -> Self {
        Self {
            action_id: String::new(),
            action_type: ConnectivityActionType::RemoveVlan,
            vm_uuid: vm_uuid.into(),
            vlan_id: vlan_id.into(),
            mode,
            vnic_name: None,
            interface_mac: Some(interface_mac.into()),
        }
    }

    pub fn with_action_id(mut self, action_id: impl Into<String>) -> Self {
        self.action_id = action_id.into();
        self
    }

    pub fn with_vnic_name(mut self, vnic_name: impl Into<String>) -> Self {
        self.vnic_name = Some(vnic_name.into());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityRequest {
    pub driver_request: DriverRequest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverRequest {
    #[serde(default)]
    pub actions: Vec<RequestAction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestAction {
    pub action_id: String,
    #[serde(rename = "type")]
    pub action_type: ConnectivityActionType,
    #[serde(default)]
    pub connection_id: Option<String>,
    pub connection_params: ConnectionParams,
    #[serde(default)]
    pub connector_attributes: Vec<Attribute>,
    #[serde(default)]
    pub custom_action_attributes: Vec<Attribute>,
    #[serde(default)]
    pub action_target: Option<ActionTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionParams {
    #[serde(default)]
    pub vlan_id: String,
    pub mode: ConnectionMode,
    #[serde(rename = "type", default)]
    pub params_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attribute {
    pub attribute_name: String,
    pub attribute_value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionTarget {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub full_address: String,
}

fn find_attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a str> {
    attributes
        .iter()
        .find(|attr| attr.attribute_name == name)
        .map(|attr| attr.attribute_value.trim())
        .filter(|value| !value.is_empty())
}

impl RequestAction {
    pub fn custom_attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.custom_action_attributes, name)
    }

    pub fn connector_attribute(&self, name: &str) -> Option<&str> {
        find_attribute(&self.connector_attributes, name)
    }
}

impl TryFrom<&RequestAction> for ConnectivityAction {
    type Error = SharedTypeError;

    fn try_from(action: &RequestAction) -> Result<Self, Self::Error> {
        let vm_uuid = action
            .custom_attribute(VM_UUID_ATTRIBUTE)
            .ok_or_else(|| SharedTypeError::MissingAttribute(VM_UUID_ATTRIBUTE.to_string()))?;
        let vnic_name = action.custom_attribute(VNIC_NAME_ATTRIBUTE).map(str::to_string);

        let interface_mac = match action.action_type {
            ConnectivityActionType::SetVlan => None,
            ConnectivityActionType::RemoveVlan => action
                .connector_attribute(INTERFACE_ATTRIBUTE)
                .map(str::to_string)
                .or_else(|| vnic_name.clone()),
        };

        Ok(ConnectivityAction {
            action_id: action.action_id.clone(),
            action_type: action.action_type,
            vm_uuid: vm_uuid.to_string(),
            vlan_id: action.connection_params.vlan_id.trim().to_string(),
            mode: action.connection_params.mode,
            vnic_name,
            interface_mac,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectivityResponse {
    pub driver_response: DriverResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverResponse {
    pub action_results: Vec<ActionResult>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub action_id: String,
    #[serde(rename = "type")]
    pub action_type: ConnectivityActionType,
    pub updated_interface: String,
    pub info_message: String,
    pub error_message: String,
    pub success: bool,
}

impl ActionResult {
    pub fn success(action: &ConnectivityAction, updated_interface: String, info: &str) -> Self {
        Self {
            action_id: action.action_id.clone(),
            action_type: action.action_type,
            updated_interface,
            info_message: info.to_string(),
            error_message: String::new(),
            success: true,
        }
    }

    pub fn failure(action: &ConnectivityAction, error: String) -> Self {
        Self {
            action_id: action.action_id.clone(),
            action_type: action.action_type,
            updated_interface: action.interface_mac.clone().unwrap_or_default(),
            info_message: String::new(),
            error_message: error,
            success: false,
        }
    }
}

impl ConnectivityResponse {
    pub fn new(action_results: Vec<ActionResult>) -> Self {
        Self {
            driver_response: DriverResponse { action_results },
        }
    }
}
