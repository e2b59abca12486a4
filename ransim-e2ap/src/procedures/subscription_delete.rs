//! RIC Subscription Delete Procedure (O-RAN.WG3.E2AP section 8.2.2)

use serde::{Deserialize, Serialize};

use crate::cause::Cause;
use crate::error::E2apError;
use crate::types::{RanFunctionId, RicRequestId};

/// RIC Subscription Delete Request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicSubscriptionDeleteRequest {
    pub ric_request_id: Option<RicRequestId>,
    pub ran_function_id: Option<RanFunctionId>,
}

impl RicSubscriptionDeleteRequest {
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

/// RIC Subscription Delete Response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicSubscriptionDeleteResponse {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
}

/// RIC Subscription Delete Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicSubscriptionDeleteFailure {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
    pub cause: Cause,
}
