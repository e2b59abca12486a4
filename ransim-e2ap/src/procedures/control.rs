//! RIC Control Procedure (O-RAN.WG3.E2AP section 8.2.4)

use serde::{Deserialize, Serialize};

use crate::cause::Cause;
use crate::error::E2apError;
use crate::types::{RanFunctionId, RicRequestId};

/// RIC Control Ack Request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RicControlAckRequest {
    NoAck,
    Ack,
    Nack,
}

/// RIC Control Request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicControlRequest {
    pub ric_request_id: Option<RicRequestId>,
    pub ran_function_id: Option<RanFunctionId>,
    pub call_process_id: Option<Vec<u8>>,
    /// Service-model encoded control header
    pub header: Vec<u8>,
    /// Service-model encoded control message
    pub message: Vec<u8>,
    pub ack_request: Option<RicControlAckRequest>,
}

impl RicControlRequest {
    /// RIC Request ID IE
    pub fn request_id(&self) -> Result<RicRequestId, E2apError> {
        self.ric_request_id
            .ok_or(E2apError::MissingMandatoryIe("RICrequestID"))
    }

    /// RAN Function ID IE
    pub fn ran_function_id(&self) -> Result<RanFunctionId, E2apError> {
        self.ran_function_id
            .ok_or(E2apError::MissingMandatoryIe("RANfunctionID"))
    }
}

/// RIC Control Acknowledge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicControlAcknowledge {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
    pub call_process_id: Option<Vec<u8>>,
    pub outcome: Option<Vec<u8>>,
}

/// RIC Control Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicControlFailure {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
    pub call_process_id: Option<Vec<u8>>,
    pub cause: Cause,
    pub outcome: Option<Vec<u8>>,
}

impl RicControlFailure {
    /// Failure for `request` with `cause`; a missing request ID is reported as zero.
    pub fn for_request(request: &RicControlRequest, cause: Cause) -> Self {
        Self {
            ric_request_id: request.ric_request_id.unwrap_or(RicRequestId::new(0, 0)),
            ran_function_id: request.ran_function_id.unwrap_or(RanFunctionId::INTERNAL),
            call_process_id: request.call_process_id.clone(),
            cause,
            outcome: None,
        }
    }
}

impl RicControlAcknowledge {
    /// Acknowledge for `request` carrying an optional outcome.
    pub fn for_request(request: &RicControlRequest, outcome: Option<Vec<u8>>) -> Self {
        Self {
            ric_request_id: request.ric_request_id.unwrap_or(RicRequestId::new(0, 0)),
            ran_function_id: request.ran_function_id.unwrap_or(RanFunctionId::INTERNAL),
            call_process_id: request.call_process_id.clone(),
            outcome,
        }
    }
}
