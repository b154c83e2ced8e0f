//! Batch processing of orchestrator connectivity requests

use futures::future::join_all;
use log::{error, info};
use vc_core::Result;
use vc_shared_types::{
    ActionResult, ConnectivityAction, ConnectivityActionType, ConnectivityRequest,
    ConnectivityResponse, RequestAction, SystemEvent,
};

use crate::flow::ConnectivityFlow;

pub const SET_VLAN_MESSAGE: &str = "vlan created";
pub const REMOVE_VLAN_MESSAGE: &str = "vlan removed";

impl ConnectivityFlow {
    /// Run every action of a JSON connectivity request and render the JSON
    /// response.
    ///
    /// Removals run first, all at once, then connects. A failing action is
    /// reported in its own result and never stops its siblings. Only an
    /// unparsable request or a missing default switch fails the whole call.
    pub async fn apply_connectivity(&self, request: &str) -> Result<String> {
        self.ensure_configured()?;
        let request: ConnectivityRequest = serde_json::from_str(request)?;

        let actions = request.driver_request.actions;
        info!("Applying {} connectivity action(s)", actions.len());

        let (removals, connects): (Vec<&RequestAction>, Vec<&RequestAction>) = actions
            .iter()
            .partition(|action| action.action_type == ConnectivityActionType::RemoveVlan);

        let mut results = join_all(removals.into_iter().map(|action| self.run_action(action))).await;
        results.extend(join_all(connects.into_iter().map(|action| self.run_action(action))).await);

        let response = ConnectivityResponse::new(results);
        Ok(serde_json::to_string(&response)?)
    }

    async fn run_action(&self, request: &RequestAction) -> ActionResult {
        let action = match ConnectivityAction::try_from(request) {
            Ok(action) => action,
            Err(e) => return self.rejected(request, e.to_string()).await,
        };

        let outcome = match action.action_type {
            ConnectivityActionType::SetVlan => self.set_vlan(&action).await.map(|connected| {
                ActionResult::success(
                    &action,
                    connected.mac_address.unwrap_or_default(),
                    SET_VLAN_MESSAGE,
                )
            }),
            ConnectivityActionType::RemoveVlan => {
                self.remove_vlan(&action).await.map(|disconnected| {
                    ActionResult::success(&action, disconnected.mac_address, REMOVE_VLAN_MESSAGE)
                })
            }
        };

        match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(
                    "{} action {} on VM {} failed: {}",
                    action.action_type, action.action_id, action.vm_uuid, e
                );
                self.report_failure(&action.action_id, action.action_type, &e.to_string())
                    .await;
                ActionResult::failure(&action, e.to_string())
            }
        }
    }

    /// Result for an action that could not even be read
    async fn rejected(&self, request: &RequestAction, error: String) -> ActionResult {
        error!("Rejected action {}: {}", request.action_id, error);
        self.report_failure(&request.action_id, request.action_type, &error)
            .await;
        ActionResult {
            action_id: request.action_id.clone(),
            action_type: request.action_type,
            updated_interface: String::new(),
            info_message: String::new(),
            error_message: error,
            success: false,
        }
    }

    async fn report_failure(
        &self,
        action_id: &str,
        action_type: ConnectivityActionType,
        error: &str,
    ) {
        if let Some(bus) = self.event_bus() {
            let event = SystemEvent::ConnectivityActionFailed {
                action_id: action_id.to_string(),
                action_type,
                error: error.to_string(),
            };
            if let Err(e) = bus.publish(event).await {
                log::warn!("Event listener failed: {}", e);
            }
        }
    }
}
