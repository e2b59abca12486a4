//! Cell configuration and control (CCC) service model
//!
//! The node configuration is a JSON object. A control request carries a JSON
//! object whose keys replace the matching configuration keys; subscriptions
//! report the whole configuration.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, info, warn};

use ransim_common::{Error, Result};
use ransim_e2ap::procedures::*;
use ransim_e2ap::{
    Cause, CauseRicRequest, ControlOutcome, Outcome, RanFunctionId, SubscriptionDeleteOutcome,
    SubscriptionOutcome,
};

use super::reporting::{delete_periodic, subscribe_periodic, IndicationPayload};
use super::{encode_ran_function_description, ServiceModel, ServiceModelClient, ServiceModelContext};

pub const SHORT_NAME: &str = "ORAN-E2SM-CCC";
pub const OID: &str = "1.3.6.1.4.1.53148.1.1.2.4";

/// CCC client.
pub struct CccClient {
    context: ServiceModelContext,
    configuration: Arc<Mutex<Map<String, Value>>>,
}

impl CccClient {
    fn new(context: ServiceModelContext) -> Self {
        let cells: Vec<Value> = context
            .node
            .cells
            .iter()
            .map(|c| json!({ "ncgi": c.ncgi.to_string(), "pci": c.pci }))
            .collect();
        let mut configuration = Map::new();
        configuration.insert("gnb_id".into(), json!(context.node.gnb_id.0));
        configuration.insert("plmn".into(), json!(context.model.plmn.to_string()));
        configuration.insert("cells".into(), Value::Array(cells));
        Self {
            context,
            configuration: Arc::new(Mutex::new(configuration)),
        }
    }

    /// Snapshot of the current configuration.
    pub fn configuration(&self) -> Map<String, Value> {
        self.configuration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn report(configuration: &Mutex<Map<String, Value>>, action_id: i32) -> Result<IndicationPayload> {
        let configuration = configuration
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let message = json!({ "action_id": action_id, "configuration": configuration });
        Ok(IndicationPayload {
            header: Vec::new(),
            message: serde_json::to_vec(&message)
                .map_err(|e| Error::Invalid(format!("CCC indication: {e}")))?,
        })
    }
}

#[async_trait]
impl ServiceModelClient for CccClient {
    async fn ric_control(&self, request: RicControlRequest) -> Result<ControlOutcome> {
        let changes = match serde_json::from_slice::<Value>(&request.message) {
            Ok(Value::Object(changes)) if !changes.is_empty() => changes,
            other => {
                warn!("Invalid CCC control message: {:?}", other.map(|_| "not a non-empty object"));
                return Ok(Outcome::Failure(RicControlFailure::for_request(
                    &request,
                    Cause::RicRequest(CauseRicRequest::ControlMessageInvalid),
                )));
            }
        };

        let accepted: Vec<String> = changes.keys().cloned().collect();
        {
            let mut configuration = self
                .configuration
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            configuration.extend(changes);
        }
        info!("Configuration of {} changed: {:?}", self.context.node_name, accepted);

        let outcome = serde_json::to_vec(&json!({ "accepted": accepted })).ok();
        Ok(Outcome::Success(RicControlAcknowledge::for_request(&request, outcome)))
    }

    async fn ric_subscription(&self, request: RicSubscriptionRequest) -> Result<SubscriptionOutcome> {
        debug!("CCC subscription request: {:?}", request.ric_request_id);
        let configuration = self.configuration.clone();
        subscribe_periodic(&self.context, &request, move |action_id, _| {
            Self::report(&configuration, action_id)
        })
        .await
    }

    async fn ric_subscription_delete(
        &self,
        request: RicSubscriptionDeleteRequest,
    ) -> Result<SubscriptionDeleteOutcome> {
        delete_periodic(&self.context, &request).await
    }
}

/// Builds the CCC service model.
pub fn new_service_model(context: ServiceModelContext) -> Result<ServiceModel> {
    let description =
        encode_ran_function_description(SHORT_NAME, OID, "Cell Configuration and Control", &context)?;
    Ok(ServiceModel {
        ran_function_id: RanFunctionId::CCC,
        model_name: SHORT_NAME.to_string(),
        version: "v1".to_string(),
        revision: 1,
        oid: OID.to_string(),
        description,
        client: Arc::new(CccClient::new(context.clone())),
        context,
    })
}
