use serde::{Deserialize, Serialize};

use crate::connectivity::ConnectivityActionType;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SystemEvent {
    /// A port group was created on a switch by the connectivity flow
    PortGroupCreated { switch: String, name: String },
    /// A port group with no remaining users was destroyed
    PortGroupDestroyed { switch: String, name: String },
    /// A VM adapter was wired to a sandbox network
    VnicConnected {
        vm_uuid: String,
        mac_address: Option<String>,
        network: String,
    },
    /// A VM adapter was parked back on the holding network
    VnicDisconnected {
        vm_uuid: String,
        mac_address: String,
        network: String,
    },
    /// A connectivity action finished with an error
    ConnectivityActionFailed {
        action_id: String,
        action_type: ConnectivityActionType,
        error: String,
    },
}
