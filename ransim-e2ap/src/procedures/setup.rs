//! E2 Setup Procedure
//!
//! Implements the E2 Setup procedure as defined in O-RAN.WG3.E2AP section 8.3.1.
//! The E2 node announces its identity, its RAN functions and its component
//! configuration; the RIC accepts or rejects each RAN function.

use serde::{Deserialize, Serialize};

use ransim_common::{GnbId, Plmn};

use crate::cause::Cause;
use crate::error::E2apError;
use crate::types::{
    GlobalGnbId, GlobalRicId, RanFunctionId, RanFunctionItem, RanFunctions, TimeToWait,
    TransactionId,
};

/// Interface type of an E2 node component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum E2NodeComponentInterfaceType {
    Ng,
    Xn,
    E1,
    F1,
    W1,
    S1,
    X2,
}

/// E2 node component configuration addition item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2NodeComponentConfig {
    /// Interface the component configuration belongs to
    pub interface_type: E2NodeComponentInterfaceType,
    /// Component identifier (e.g. AMF name for NG)
    pub component_id: String,
    /// Last request sent on that interface
    pub request_part: Vec<u8>,
    /// Last response received on that interface
    pub response_part: Vec<u8>,
}

/// RAN function list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RanFunctionListItem {
    /// RAN function ID
    pub id: RanFunctionId,
    /// Description, revision and OID
    pub item: RanFunctionItem,
}

/// E2 Setup Request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2SetupRequest {
    pub transaction_id: TransactionId,
    pub global_e2_node_id: GlobalGnbId,
    pub ran_functions: Vec<RanFunctionListItem>,
    pub component_configs: Vec<E2NodeComponentConfig>,
}

/// E2 Setup Response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2SetupResponse {
    pub transaction_id: TransactionId,
    pub global_ric_id: GlobalRicId,
    pub ran_functions_accepted: Vec<RanFunctionId>,
    pub ran_functions_rejected: Vec<(RanFunctionId, Cause)>,
}

/// E2 Setup Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2SetupFailure {
    pub transaction_id: TransactionId,
    pub cause: Cause,
    pub time_to_wait: Option<TimeToWait>,
}

/// Parameters for building an E2 Setup Request
#[derive(Debug, Clone)]
pub struct E2SetupRequestParams<'a> {
    /// Transaction ID allocated for this procedure
    pub transaction_id: TransactionId,
    /// PLMN of the node
    pub plmn: Plmn,
    /// gNB ID of the node
    pub gnb_id: GnbId,
    /// RAN functions to announce
    pub ran_functions: &'a RanFunctions,
    /// Component configuration additions
    pub component_configs: Vec<E2NodeComponentConfig>,
}

/// Builds the Global E2 Node ID for a gNB.
pub fn build_global_gnb_id(plmn: Plmn, gnb_id: GnbId) -> Result<GlobalGnbId, E2apError> {
    if !gnb_id.is_valid() {
        return Err(E2apError::InvalidIeValue(format!(
            "gNB ID {gnb_id} does not fit in {} bits",
            GnbId::BIT_LENGTH
        )));
    }
    Ok(GlobalGnbId {
        plmn_identity: plmn.encode(),
        gnb_id: gnb_id.0,
        gnb_id_length: GnbId::BIT_LENGTH,
    })
}

/// Converts the registry's RAN function map into the ordered list IE.
pub fn build_ran_function_list(ran_functions: &RanFunctions) -> Vec<RanFunctionListItem> {
    ran_functions
        .iter()
        .map(|(id, item)| RanFunctionListItem {
            id: *id,
            item: item.clone(),
        })
        .collect()
}

/// Builds an E2 Setup Request.
pub fn build_e2_setup_request(params: E2SetupRequestParams<'_>) -> Result<E2SetupRequest, E2apError> {
    if params.ran_functions.contains_key(&RanFunctionId::INTERNAL) {
        return Err(E2apError::InvalidIeValue(
            "RAN function ID 0 cannot be announced".into(),
        ));
    }

    Ok(E2SetupRequest {
        transaction_id: params.transaction_id,
        global_e2_node_id: build_global_gnb_id(params.plmn, params.gnb_id)?,
        ran_functions: build_ran_function_list(params.ran_functions),
        component_configs: params.component_configs,
    })
}

/// Builds the NG component configuration announced by a simulated gNB.
pub fn ng_component_config(gnb_id: GnbId) -> E2NodeComponentConfig {
    E2NodeComponentConfig {
        interface_type: E2NodeComponentInterfaceType::Ng,
        component_id: format!("gnb-{}", gnb_id.0),
        request_part: Vec::new(),
        response_part: Vec::new(),
    }
}
