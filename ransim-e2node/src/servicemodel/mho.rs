//! Mobility handover (MHO) service model
//!
//! Reports periodic UE measurements (serving and neighbor RSRP) and accepts
//! handover control requests moving a UE to another cell of the node.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ransim_common::{Error, Ncgi, Result};
use ransim_e2ap::procedures::*;
use ransim_e2ap::{
    Cause, CauseRicRequest, ControlOutcome, Outcome, RanFunctionId, SubscriptionDeleteOutcome,
    SubscriptionOutcome,
};

use super::reporting::{delete_periodic, subscribe_periodic, IndicationPayload};
use super::{encode_ran_function_description, unix_millis, ServiceModel, ServiceModelClient, ServiceModelContext};

pub const SHORT_NAME: &str = "ORAN-E2SM-MHO";
pub const OID: &str = "1.3.6.1.4.1.53148.1.1.2.101";

/// Simulated UEs attached to each cell at startup.
const UES_PER_CELL: u64 = 2;

/// Handover control message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoverRequest {
    pub imsi: u64,
    pub target_cell: Ncgi,
}

#[derive(Debug, Serialize)]
struct NeighborMeasurement {
    cell: String,
    rsrp: i32,
}

#[derive(Debug, Serialize)]
struct UeMeasurement {
    imsi: u64,
    serving_cell: String,
    rsrp_serving: i32,
    neighbors: Vec<NeighborMeasurement>,
}

#[derive(Debug, Serialize)]
struct IndicationMessage {
    action_id: i32,
    ues: Vec<UeMeasurement>,
}

#[derive(Debug, Serialize)]
struct IndicationHeader {
    collection_start_time: u64,
    gnb_id: u32,
}

/// MHO client.
pub struct MhoClient {
    context: ServiceModelContext,
    /// Serving cell per IMSI
    ues: Arc<Mutex<BTreeMap<u64, Ncgi>>>,
}

impl MhoClient {
    fn new(context: ServiceModelContext) -> Self {
        let base = u64::from(context.node.gnb_id.0) * 1000;
        let ues = context
            .node
            .cells
            .iter()
            .enumerate()
            .flat_map(|(i, cell)| {
                (0..UES_PER_CELL).map(move |n| (base + i as u64 * UES_PER_CELL + n, cell.ncgi))
            })
            .collect();
        Self {
            context,
            ues: Arc::new(Mutex::new(ues)),
        }
    }

    /// Serving cell of `imsi`, if the UE is known.
    pub fn serving_cell(&self, imsi: u64) -> Option<Ncgi> {
        self.ues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&imsi)
            .copied()
    }

    fn report(
        context: &ServiceModelContext,
        ues: &Mutex<BTreeMap<u64, Ncgi>>,
        action_id: i32,
    ) -> Result<IndicationPayload> {
        let snapshot = ues.lock().unwrap_or_else(PoisonError::into_inner).clone();
        let mut rng = rand::thread_rng();
        let ues = snapshot
            .into_iter()
            .map(|(imsi, serving)| UeMeasurement {
                imsi,
                serving_cell: serving.to_string(),
                rsrp_serving: rng.gen_range(-110..=-70),
                neighbors: context
                    .node
                    .cells
                    .iter()
                    .filter(|c| c.ncgi != serving)
                    .map(|c| NeighborMeasurement {
                        cell: c.ncgi.to_string(),
                        rsrp: rng.gen_range(-120..=-70),
                    })
                    .collect(),
            })
            .collect();

        let encode = |e: serde_json::Error| Error::Invalid(format!("MHO indication: {e}"));
        Ok(IndicationPayload {
            header: serde_json::to_vec(&IndicationHeader {
                collection_start_time: unix_millis(),
                gnb_id: context.node.gnb_id.0,
            })
            .map_err(encode)?,
            message: serde_json::to_vec(&IndicationMessage { action_id, ues }).map_err(encode)?,
        })
    }
}

#[async_trait]
impl ServiceModelClient for MhoClient {
    async fn ric_control(&self, request: RicControlRequest) -> Result<ControlOutcome> {
        let handover: HandoverRequest = match serde_json::from_slice(&request.message) {
            Ok(handover) => handover,
            Err(e) => {
                warn!("Invalid MHO control message: {}", e);
                return Ok(Outcome::Failure(RicControlFailure::for_request(
                    &request,
                    Cause::RicRequest(CauseRicRequest::ControlMessageInvalid),
                )));
            }
        };

        let known_target = self
            .context
            .node
            .cells
            .iter()
            .any(|c| c.ncgi == handover.target_cell);
        let mut ues = self.ues.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(serving) = ues.get_mut(&handover.imsi).filter(|_| known_target) else {
            return Ok(Outcome::Failure(RicControlFailure::for_request(
                &request,
                Cause::RicRequest(CauseRicRequest::ControlMessageInvalid),
            )));
        };

        info!(
            "Handover of UE {} from {} to {}",
            handover.imsi, serving, handover.target_cell
        );
        *serving = handover.target_cell;
        let outcome = serde_json::to_vec(&handover).ok();
        Ok(Outcome::Success(RicControlAcknowledge::for_request(&request, outcome)))
    }

    async fn ric_subscription(&self, request: RicSubscriptionRequest) -> Result<SubscriptionOutcome> {
        debug!("MHO subscription request: {:?}", request.ric_request_id);
        let context = self.context.clone();
        let ues = self.ues.clone();
        subscribe_periodic(&self.context, &request, move |action_id, _| {
            Self::report(&context, &ues, action_id)
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

/// Builds the MHO service model.
pub fn new_service_model(context: ServiceModelContext) -> Result<ServiceModel> {
    let description = encode_ran_function_description(SHORT_NAME, OID, "MHO", &context)?;
    Ok(ServiceModel {
        ran_function_id: RanFunctionId::MHO,
        model_name: SHORT_NAME.to_string(),
        version: "v1".to_string(),
        revision: 1,
        oid: OID.to_string(),
        description,
        client: Arc::new(MhoClient::new(context.clone())),
        context,
    })
}
