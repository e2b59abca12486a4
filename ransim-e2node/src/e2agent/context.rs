//! Per-node state shared by the E2 connections and the connection controller.

use std::sync::Arc;

use ransim_common::{Model, Node, Result};
use ransim_e2ap::procedures::*;
use ransim_e2ap::Dialer;

use super::backoff::BackoffConfig;
use super::transactions::TransactionIdPool;
use crate::servicemodel::ServiceModelRegistry;
use crate::store::{ConnectionStore, SubscriptionStore};

/// Everything an E2 node's components share.
#[derive(Clone)]
pub struct NodeContext {
    pub node_name: String,
    pub node: Node,
    pub model: Arc<Model>,
    pub dialer: Arc<dyn Dialer>,
    pub registry: Arc<ServiceModelRegistry>,
    pub connections: Arc<ConnectionStore>,
    pub subscriptions: Arc<SubscriptionStore>,
    pub transactions: Arc<TransactionIdPool>,
    pub backoff: BackoffConfig,
}

impl NodeContext {
    /// Builds the E2 Setup Request for `transaction_id`.
    pub fn e2_setup_request(&self, transaction_id: ransim_e2ap::TransactionId) -> Result<E2SetupRequest> {
        let ran_functions = self.registry.get_ran_functions();
        Ok(build_e2_setup_request(E2SetupRequestParams {
            transaction_id,
            plmn: self.model.plmn,
            gnb_id: self.node.gnb_id,
            ran_functions: &ran_functions,
            component_configs: vec![ng_component_config(self.node.gnb_id)],
        })?)
    }

    /// Builds the E2 Node Configuration Update announcing this node on an
    /// additional connection.
    pub fn configuration_update(
        &self,
        transaction_id: ransim_e2ap::TransactionId,
    ) -> Result<E2NodeConfigurationUpdate> {
        Ok(E2NodeConfigurationUpdate {
            transaction_id,
            global_e2_node_id: Some(build_global_gnb_id(self.model.plmn, self.node.gnb_id)?),
            component_config_additions: vec![ng_component_config(self.node.gnb_id)],
        })
    }
}
