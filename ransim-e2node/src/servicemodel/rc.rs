//! RAN control service models (RC and RC-PRE2)
//!
//! Control messages set per-cell radio parameters:
//!
//! | parameter | range |
//! |---|---|
//! | `pci` | 0..=1007 |
//! | `ocn_rc` | -24..=24 (dB) |
//!
//! Subscriptions report the current parameters of every cell together with a
//! revision counter that advances on each accepted change.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use ransim_common::{Error, Ncgi, Result};
use ransim_e2ap::procedures::*;
use ransim_e2ap::{
    Cause, CauseRicRequest, ControlOutcome, Outcome, RanFunctionId, SubscriptionDeleteOutcome,
    SubscriptionOutcome,
};

use super::reporting::{delete_periodic, subscribe_periodic, IndicationPayload};
use super::{encode_ran_function_description, ServiceModel, ServiceModelClient, ServiceModelContext};

pub const RC_SHORT_NAME: &str = "ORAN-E2SM-RC";
pub const RC_OID: &str = "1.3.6.1.4.1.53148.1.1.2.3";
pub const RC_PRE2_SHORT_NAME: &str = "ORAN-E2SM-RC-PRE";
pub const RC_PRE2_OID: &str = "1.3.6.1.4.1.53148.1.2.2.100";

const MAX_PCI: i64 = 1007;
const OCN_RANGE: std::ops::RangeInclusive<i64> = -24..=24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcVersion {
    V1,
    Pre2,
}

impl RcVersion {
    fn ran_function_id(self) -> RanFunctionId {
        match self {
            RcVersion::V1 => RanFunctionId::RC,
            RcVersion::Pre2 => RanFunctionId::RCPRE2,
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            RcVersion::V1 => RC_SHORT_NAME,
            RcVersion::Pre2 => RC_PRE2_SHORT_NAME,
        }
    }

    fn oid(self) -> &'static str {
        match self {
            RcVersion::V1 => RC_OID,
            RcVersion::Pre2 => RC_PRE2_OID,
        }
    }
}

/// Control message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RcControlMessage {
    pub cell: Ncgi,
    pub parameter: String,
    pub value: i64,
}

/// Radio parameters of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellParameters {
    pub pci: u32,
    pub ocn_rc: i32,
}

#[derive(Debug, Default)]
struct RcState {
    cells: BTreeMap<Ncgi, CellParameters>,
    revision: u64,
}

#[derive(Debug, Serialize)]
struct CellReport {
    cell: String,
    #[serde(flatten)]
    parameters: CellParameters,
}

#[derive(Debug, Serialize)]
struct IndicationMessage {
    action_id: i32,
    revision: u64,
    cells: Vec<CellReport>,
}

/// RC client.
pub struct RcClient {
    version: RcVersion,
    context: ServiceModelContext,
    state: Arc<Mutex<RcState>>,
}

impl RcClient {
    fn new(version: RcVersion, context: ServiceModelContext) -> Self {
        let cells = context
            .node
            .cells
            .iter()
            .map(|c| (c.ncgi, CellParameters { pci: c.pci, ocn_rc: 0 }))
            .collect();
        Self {
            version,
            context,
            state: Arc::new(Mutex::new(RcState { cells, revision: 0 })),
        }
    }

    /// Current parameters of `cell`.
    pub fn cell_parameters(&self, cell: Ncgi) -> Option<CellParameters> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .cells
            .get(&cell)
            .copied()
    }

    /// Applies a control message; `Err` carries the reason it was refused.
    fn apply(&self, message: &RcControlMessage) -> std::result::Result<CellParameters, String> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let params = state
            .cells
            .get_mut(&message.cell)
            .ok_or_else(|| format!("unknown cell {}", message.cell))?;
        match message.parameter.as_str() {
            "pci" if (0..=MAX_PCI).contains(&message.value) => params.pci = message.value as u32,
            "ocn_rc" if OCN_RANGE.contains(&message.value) => params.ocn_rc = message.value as i32,
            "pci" | "ocn_rc" => {
                return Err(format!("{} out of range: {}", message.parameter, message.value))
            }
            other => return Err(format!("unknown parameter {other}")),
        }
        let updated = *params;
        state.revision += 1;
        Ok(updated)
    }

    fn report(state: &Mutex<RcState>, action_id: i32) -> Result<IndicationPayload> {
        let state = state.lock().unwrap_or_else(PoisonError::into_inner);
        let message = IndicationMessage {
            action_id,
            revision: state.revision,
            cells: state
                .cells
                .iter()
                .map(|(ncgi, parameters)| CellReport {
                    cell: ncgi.to_string(),
                    parameters: *parameters,
                })
                .collect(),
        };
        Ok(IndicationPayload {
            header: Vec::new(),
            message: serde_json::to_vec(&message)
                .map_err(|e| Error::Invalid(format!("RC indication: {e}")))?,
        })
    }
}

#[async_trait]
impl ServiceModelClient for RcClient {
    async fn ric_control(&self, request: RicControlRequest) -> Result<ControlOutcome> {
        let refused = |reason: String| {
            warn!("{} control refused: {}", self.version.short_name(), reason);
            Ok(Outcome::Failure(RicControlFailure::for_request(
                &request,
                Cause::RicRequest(CauseRicRequest::ControlMessageInvalid),
            )))
        };

        let message: RcControlMessage = match serde_json::from_slice(&request.message) {
            Ok(message) => message,
            Err(e) => return refused(e.to_string()),
        };
        match self.apply(&message) {
            Ok(updated) => {
                info!(
                    "Cell {} {} set to {}",
                    message.cell, message.parameter, message.value
                );
                let outcome = serde_json::to_vec(&updated).ok();
                Ok(Outcome::Success(RicControlAcknowledge::for_request(&request, outcome)))
            }
            Err(reason) => refused(reason),
        }
    }

    async fn ric_subscription(&self, request: RicSubscriptionRequest) -> Result<SubscriptionOutcome> {
        debug!("{} subscription request: {:?}", self.version.short_name(), request.ric_request_id);
        let state = self.state.clone();
        subscribe_periodic(&self.context, &request, move |action_id, _| {
            Self::report(&state, action_id)
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

/// Builds the RC or RC-PRE2 service model.
pub fn new_service_model(version: RcVersion, context: ServiceModelContext) -> Result<ServiceModel> {
    let description =
        encode_ran_function_description(version.short_name(), version.oid(), "RAN Control", &context)?;
    Ok(ServiceModel {
        ran_function_id: version.ran_function_id(),
        model_name: version.short_name().to_string(),
        version: "v1".to_string(),
        revision: 1,
        oid: version.oid().to_string(),
        description,
        client: Arc::new(RcClient::new(version, context.clone())),
        context,
    })
}
