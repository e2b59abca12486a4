//! RIC Subscription Procedure
//!
//! O-RAN.WG3.E2AP section 8.2.1. The RIC installs event triggers and actions
//! for one RAN function; the E2 node admits or rejects each action.

use serde::{Deserialize, Serialize};

use crate::cause::Cause;
use crate::error::E2apError;
use crate::types::{RanFunctionId, RicActionId, RicRequestId};

/// RIC action type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RicActionType {
    Report,
    Insert,
    Policy,
}

/// RIC Action To Be Setup item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicActionToBeSetup {
    pub action_id: RicActionId,
    pub action_type: RicActionType,
    pub action_definition: Option<Vec<u8>>,
}

/// RIC Subscription Details IE
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicSubscriptionDetails {
    /// Service-model encoded event trigger definition
    pub event_trigger: Vec<u8>,
    /// Actions to set up
    pub actions: Vec<RicActionToBeSetup>,
}

/// RIC Subscription Request
///
/// Mandatory IEs are optional here so that a malformed request can be
/// received and answered with a failure instead of being dropped by the codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicSubscriptionRequest {
    pub ric_request_id: Option<RicRequestId>,
    pub ran_function_id: Option<RanFunctionId>,
    pub details: Option<RicSubscriptionDetails>,
}

impl RicSubscriptionRequest {
    /// RIC Request ID IE
    pub fn request_id(&self) -> Result<RicRequestId, E2apError> {
        self.ric_request_id
            .ok_or(E2apError::MissingMandatoryIe("RICrequestID"))
    }

    /// RIC requester ID
    pub fn requester_id(&self) -> Result<i32, E2apError> {
        Ok(self.request_id()?.requester_id)
    }

    /// RIC instance ID
    pub fn ric_instance_id(&self) -> Result<i32, E2apError> {
        Ok(self.request_id()?.instance_id)
    }

    /// RAN Function ID IE
    pub fn ran_function_id(&self) -> Result<RanFunctionId, E2apError> {
        self.ran_function_id
            .ok_or(E2apError::MissingMandatoryIe("RANfunctionID"))
    }

    /// RIC Subscription Details IE
    pub fn details(&self) -> Result<&RicSubscriptionDetails, E2apError> {
        self.details
            .as_ref()
            .ok_or(E2apError::MissingMandatoryIe("RICsubscriptionDetails"))
    }

    /// Actions to set up, empty when the details IE is absent.
    pub fn actions(&self) -> &[RicActionToBeSetup] {
        self.details
            .as_ref()
            .map(|d| d.actions.as_slice())
            .unwrap_or_default()
    }
}

/// RIC Action Not Admitted item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicActionNotAdmitted {
    pub action_id: RicActionId,
    pub cause: Cause,
}

/// RIC Subscription Response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicSubscriptionResponse {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
    pub actions_admitted: Vec<RicActionId>,
    pub actions_not_admitted: Vec<RicActionNotAdmitted>,
}

/// RIC Subscription Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RicSubscriptionFailure {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
    pub cause: Cause,
    pub actions_not_admitted: Vec<RicActionNotAdmitted>,
}

/// Admission result of a subscription request, turned into either a response
/// or a failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionAdmission {
    pub ric_request_id: RicRequestId,
    pub ran_function_id: RanFunctionId,
    pub actions_admitted: Vec<RicActionId>,
    pub actions_not_admitted: Vec<RicActionNotAdmitted>,
}

impl SubscriptionAdmission {
    /// Starts an outcome for the given request with no actions decided yet.
    pub fn new(ric_request_id: RicRequestId, ran_function_id: RanFunctionId) -> Self {
        Self {
            ric_request_id,
            ran_function_id,
            actions_admitted: Vec::new(),
            actions_not_admitted: Vec::new(),
        }
    }

    /// Rejects every requested action with the same cause.
    pub fn reject_all(mut self, actions: &[RicActionToBeSetup], cause: Cause) -> Self {
        self.actions_not_admitted
            .extend(actions.iter().map(|a| RicActionNotAdmitted {
                action_id: a.action_id,
                cause,
            }));
        self
    }

    /// Builds the RIC Subscription Response.
    pub fn into_response(self) -> RicSubscriptionResponse {
        RicSubscriptionResponse {
            ric_request_id: self.ric_request_id,
            ran_function_id: self.ran_function_id,
            actions_admitted: self.actions_admitted,
            actions_not_admitted: self.actions_not_admitted,
        }
    }

    /// Builds the RIC Subscription Failure.
    pub fn into_failure(self, cause: Cause) -> RicSubscriptionFailure {
        RicSubscriptionFailure {
            ric_request_id: self.ric_request_id,
            ran_function_id: self.ran_function_id,
            cause,
            actions_not_admitted: self.actions_not_admitted,
        }
    }
}
