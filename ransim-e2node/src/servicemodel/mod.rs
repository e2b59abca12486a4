//! Service models
//!
//! Each enabled service model registers one RAN function with the node's
//! [`ServiceModelRegistry`]. RIC Control, Subscription and Subscription Delete
//! requests are dispatched by RAN function ID to the model's
//! [`ServiceModelClient`].
//!
//! | RAN function ID | Model |
//! |---|---|
//! | 1 | KPM |
//! | 2 | RC-PRE2 |
//! | 3 | KPM2 |
//! | 4 | MHO |
//! | 5 | RC |
//! | 6 | CCC |

pub mod ccc;
pub mod kpm;
pub mod mho;
pub mod rc;
pub mod registry;
pub mod reporting;

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use serde::Serialize;

use ransim_common::{Error, Model, Node, Result, ServiceModelInfo};
use ransim_e2ap::procedures::{RicControlRequest, RicSubscriptionDeleteRequest, RicSubscriptionRequest};
use ransim_e2ap::{ControlOutcome, RanFunctionId, SubscriptionDeleteOutcome, SubscriptionOutcome};

use crate::store::SubscriptionStore;

pub use registry::{ServiceModel, ServiceModelRegistry};

/// RIC procedures a service model answers.
///
/// `Ok` carries exactly one of acknowledge or failure. `Err` means no answer
/// message could be produced.
#[async_trait]
pub trait ServiceModelClient: Send + Sync {
    async fn ric_control(&self, request: RicControlRequest) -> Result<ControlOutcome>;

    async fn ric_subscription(&self, request: RicSubscriptionRequest) -> Result<SubscriptionOutcome>;

    async fn ric_subscription_delete(
        &self,
        request: RicSubscriptionDeleteRequest,
    ) -> Result<SubscriptionDeleteOutcome>;
}

/// Node state shared with every service model of that node.
#[derive(Clone)]
pub struct ServiceModelContext {
    pub node_name: String,
    pub node: Node,
    pub model: Arc<Model>,
    pub subscriptions: Arc<SubscriptionStore>,
}

impl ServiceModelContext {
    /// Report period for a cell-less request: the shortest configured cell
    /// interval, or the model default.
    pub fn default_report_interval_ms(&self) -> u64 {
        self.node
            .cells
            .iter()
            .map(|c| c.report_interval_ms)
            .min()
            .unwrap_or(ransim_common::DEFAULT_REPORT_INTERVAL_MS)
    }
}

/// RAN Function Description announced for a service model (JSON encoded).
#[derive(Debug, Serialize)]
struct RanFunctionDescription<'a> {
    short_name: &'a str,
    oid: &'a str,
    description: &'a str,
    instance: i32,
    gnb_id: u32,
    cells: Vec<String>,
}

/// Encodes the RAN Function Description of a model served by `context`'s node.
pub fn encode_ran_function_description(
    short_name: &str,
    oid: &str,
    description: &str,
    context: &ServiceModelContext,
) -> Result<Vec<u8>> {
    let desc = RanFunctionDescription {
        short_name,
        oid,
        description,
        instance: 1,
        gnb_id: context.node.gnb_id.0,
        cells: context.node.cells.iter().map(|c| c.ncgi.to_string()).collect(),
    };
    serde_json::to_vec(&desc)
        .map_err(|e| Error::Invalid(format!("RAN function description of {short_name}: {e}")))
}

/// Milliseconds since the Unix epoch, used as the collection start time of reports.
pub(crate) fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Builds the service model for RAN function `info.id`.
pub fn new_service_model(info: &ServiceModelInfo, context: ServiceModelContext) -> Result<ServiceModel> {
    match RanFunctionId(info.id) {
        RanFunctionId::KPM => kpm::new_service_model(kpm::KpmVersion::V1, context),
        RanFunctionId::KPM2 => kpm::new_service_model(kpm::KpmVersion::V2, context),
        RanFunctionId::MHO => mho::new_service_model(context),
        RanFunctionId::RC => rc::new_service_model(rc::RcVersion::V1, context),
        RanFunctionId::RCPRE2 => rc::new_service_model(rc::RcVersion::Pre2, context),
        RanFunctionId::CCC => ccc::new_service_model(context),
        other => Err(Error::NotSupported(format!(
            "service model with RAN function ID {}",
            other.0
        ))),
    }
}
