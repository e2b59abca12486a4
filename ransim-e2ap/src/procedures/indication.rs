//! RIC Indication Procedure (O-RAN.WG3.E2AP section 8.2.3)

use serde::{Deserialize, Serialize};

use crate::types::{RanFunctionId, RicActionId, RicRequestId};

/// RIC Indication Type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RicIndicationType {
    Report,
    Insert,
}

/// RIC Indication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicIndication {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
    pub action_id: RicActionId,
    pub sequence_number: Option<i32>,
    pub indication_type: RicIndicationType,
    /// Service-model encoded indication header
    pub header: Vec<u8>,
    /// Service-model encoded indication message
    pub message: Vec<u8>,
    pub call_process_id: Option<Vec<u8>>,
}
