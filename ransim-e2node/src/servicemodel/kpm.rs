//! KPM and KPM 2.0 service models
//!
//! Periodic per-cell measurement reports. Control is not part of KPM.

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use serde::Serialize;
use tracing::debug;

use ransim_common::{Error, Result};
use ransim_e2ap::procedures::{RicControlRequest, RicSubscriptionDeleteRequest, RicSubscriptionRequest};
use ransim_e2ap::{ControlOutcome, RanFunctionId, SubscriptionDeleteOutcome, SubscriptionOutcome};

use super::reporting::{delete_periodic, subscribe_periodic, IndicationPayload};
use super::{encode_ran_function_description, unix_millis, ServiceModel, ServiceModelClient, ServiceModelContext};

pub const SHORT_NAME: &str = "ORAN-E2SM-KPM";
pub const KPM_OID: &str = "1.3.6.1.4.1.53148.1.1.2.2";
pub const KPM2_OID: &str = "1.3.6.1.4.1.53148.1.2.2.2";

/// Measurement types reported per cell.
pub const MEASUREMENT_TYPES: [&str; 4] = [
    "RRC.ConnEstabAtt.Sum",
    "RRC.ConnEstabSucc.Sum",
    "RRC.Conn.Avg",
    "RRC.Conn.Max",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KpmVersion {
    V1,
    V2,
}

impl KpmVersion {
    fn ran_function_id(self) -> RanFunctionId {
        match self {
            KpmVersion::V1 => RanFunctionId::KPM,
            KpmVersion::V2 => RanFunctionId::KPM2,
        }
    }

    fn oid(self) -> &'static str {
        match self {
            KpmVersion::V1 => KPM_OID,
            KpmVersion::V2 => KPM2_OID,
        }
    }

    fn version(self) -> &'static str {
        match self {
            KpmVersion::V1 => "v1",
            KpmVersion::V2 => "v2",
        }
    }

    fn description(self) -> &'static str {
        match self {
            KpmVersion::V1 => "KPM Monitor",
            KpmVersion::V2 => "KPM 2.0 Monitor",
        }
    }
}

#[derive(Debug, Serialize)]
struct IndicationHeader {
    collection_start_time: u64,
    file_format_version: &'static str,
    sender_name: &'static str,
    vendor_name: &'static str,
    plmn: String,
    gnb_id: u32,
}

#[derive(Debug, Serialize)]
struct Measurement {
    name: &'static str,
    value: i64,
}

#[derive(Debug, Serialize)]
struct CellMeasurements {
    cell: String,
    measurements: Vec<Measurement>,
}

#[derive(Debug, Serialize)]
struct IndicationMessage {
    action_id: i32,
    cells: Vec<CellMeasurements>,
}

/// KPM client.
pub struct KpmClient {
    version: KpmVersion,
    context: ServiceModelContext,
}

impl KpmClient {
    fn report(context: &ServiceModelContext, action_id: i32) -> Result<IndicationPayload> {
        let header = IndicationHeader {
            collection_start_time: unix_millis(),
            file_format_version: "version1",
            sender_name: "RAN Simulator",
            vendor_name: "ransim",
            plmn: context.model.plmn.to_string(),
            gnb_id: context.node.gnb_id.0,
        };

        let mut rng = rand::thread_rng();
        let cells = context
            .node
            .cells
            .iter()
            .map(|cell| {
                let attempts = rng.gen_range(0..=64);
                let successes = rng.gen_range(0..=attempts);
                let max = rng.gen_range(successes..=successes + 16);
                CellMeasurements {
                    cell: cell.ncgi.to_string(),
                    measurements: vec![
                        Measurement { name: MEASUREMENT_TYPES[0], value: attempts },
                        Measurement { name: MEASUREMENT_TYPES[1], value: successes },
                        Measurement { name: MEASUREMENT_TYPES[2], value: (successes + max) / 2 },
                        Measurement { name: MEASUREMENT_TYPES[3], value: max },
                    ],
                }
            })
            .collect();

        let encode = |e: serde_json::Error| Error::Invalid(format!("KPM indication: {e}"));
        Ok(IndicationPayload {
            header: serde_json::to_vec(&header).map_err(encode)?,
            message: serde_json::to_vec(&IndicationMessage { action_id, cells }).map_err(encode)?,
        })
    }
}

#[async_trait]
impl ServiceModelClient for KpmClient {
    async fn ric_control(&self, _request: RicControlRequest) -> Result<ControlOutcome> {
        Err(Error::NotSupported("RIC Control is not supported by KPM".into()))
    }

    async fn ric_subscription(&self, request: RicSubscriptionRequest) -> Result<SubscriptionOutcome> {
        debug!("{} {} subscription request: {:?}", SHORT_NAME, self.version.version(), request.ric_request_id);
        let context = self.context.clone();
        subscribe_periodic(&self.context, &request, move |action_id, _| {
            Self::report(&context, action_id)
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

/// Builds the KPM (v1) or KPM2 service model.
pub fn new_service_model(version: KpmVersion, context: ServiceModelContext) -> Result<ServiceModel> {
    let description =
        encode_ran_function_description(SHORT_NAME, version.oid(), version.description(), &context)?;
    let client = Arc::new(KpmClient {
        version,
        context: context.clone(),
    });
    Ok(ServiceModel {
        ran_function_id: version.ran_function_id(),
        model_name: SHORT_NAME.to_string(),
        version: version.version().to_string(),
        revision: 1,
        oid: version.oid().to_string(),
        description,
        client,
        context,
    })
}
