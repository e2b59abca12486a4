//! E2 Node Configuration Update Procedure
//!
//! O-RAN.WG3.E2AP section 8.3.3. Sent by an E2 node on an additional TNL
//! association once the node is already set up with the RIC.

use serde::{Deserialize, Serialize};

use crate::cause::Cause;
use crate::procedures::setup::E2NodeComponentConfig;
use crate::types::{GlobalGnbId, TimeToWait, TransactionId};

/// E2 Node Configuration Update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2NodeConfigurationUpdate {
    pub transaction_id: TransactionId,
    pub global_e2_node_id: Option<GlobalGnbId>,
    pub component_config_additions: Vec<E2NodeComponentConfig>,
}

/// E2 Node Configuration Update Acknowledge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2NodeConfigurationUpdateAcknowledge {
    pub transaction_id: TransactionId,
    pub accepted_components: Vec<String>,
}

/// E2 Node Configuration Update Failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct E2NodeConfigurationUpdateFailure {
    pub transaction_id: TransactionId,
    pub cause: Cause,
    pub time_to_wait: Option<TimeToWait>,
}
