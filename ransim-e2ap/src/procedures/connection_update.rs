//! E2 Connection Update Procedure
//!
//! O-RAN.WG3.E2AP section 8.3.6. The RIC asks the E2 node to add, modify or
//! remove TNL associations. Every answer echoes the request's transaction ID.

use serde::{Deserialize, Serialize};

use crate::cause::Cause;
use crate::types::{TimeToWait, TnlInformation, TnlUsage, TransactionId};

/// Connection to add or modify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionUpdateItem {
    pub tnl_information: TnlInformation,
    pub tnl_usage: TnlUsage,
}

/// Connection to remove
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionRemoveItem {
    pub tnl_information: TnlInformation,
}

/// Connection the E2 node failed to set up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionSetupFailedItem {
    pub tnl_information: TnlInformation,
    pub cause: Cause,
}

/// E2 Connection Update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2ConnectionUpdate {
    pub transaction_id: TransactionId,
    pub add: Option<Vec<ConnectionUpdateItem>>,
    pub remove: Option<Vec<ConnectionRemoveItem>>,
    pub modify: Option<Vec<ConnectionUpdateItem>>,
}

impl E2ConnectionUpdate {
    /// Returns true when the request carries none of the optional lists.
    pub fn is_empty(&self) -> bool {
        self.add.is_none() && self.remove.is_none() && self.modify.is_none()
    }
}

/// E2 Connection Update Acknowledge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2ConnectionUpdateAcknowledge {
    pub transaction_id: TransactionId,
    pub setup: Vec<ConnectionUpdateItem>,
    pub setup_failed: Vec<ConnectionSetupFailedItem>,
}

impl E2ConnectionUpdateAcknowledge {
    /// Acknowledge without any setup or setup-failed items.
    pub fn new(transaction_id: TransactionId) -> Self {
        Self {
            transaction_id,
            setup: Vec::new(),
            setup_failed: Vec::new(),
        }
    }
}

/// E2 Connection Update Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2ConnectionUpdateFailure {
    pub transaction_id: TransactionId,
    pub cause: Cause,
    pub time_to_wait: Option<TimeToWait>,
}

impl E2ConnectionUpdateFailure {
    /// Failure without a time to wait.
    pub fn new(transaction_id: TransactionId, cause: Cause) -> Self {
        Self {
            transaction_id,
            cause,
            time_to_wait: None,
        }
    }
}
