//! Service model registry
//!
//! Maps RAN function IDs to the registered [`ServiceModel`]s of one node and
//! accumulates the RAN function list announced in E2 Setup.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use ransim_common::{Error, Result};
use ransim_e2ap::{RanFunctionId, RanFunctionItem, RanFunctions};

use super::{ServiceModelClient, ServiceModelContext};

/// A registered service model.
#[derive(Clone)]
pub struct ServiceModel {
    pub ran_function_id: RanFunctionId,
    pub model_name: String,
    pub version: String,
    pub revision: i32,
    pub oid: String,
    /// Encoded RAN Function Description announced in E2 Setup
    pub description: Vec<u8>,
    pub client: Arc<dyn ServiceModelClient>,
    pub context: ServiceModelContext,
}

impl fmt::Debug for ServiceModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceModel")
            .field("ran_function_id", &self.ran_function_id)
            .field("model_name", &self.model_name)
            .field("version", &self.version)
            .field("revision", &self.revision)
            .field("oid", &self.oid)
            .field("node", &self.context.node_name)
            .finish()
    }
}

#[derive(Default)]
struct RegistryState {
    models: BTreeMap<RanFunctionId, ServiceModel>,
    ran_functions: RanFunctions,
}

/// Registry of the service models enabled on a node.
///
/// Registration happens at node construction; lookups happen on every RIC
/// procedure and only take the read lock.
#[derive(Default)]
pub struct ServiceModelRegistry {
    state: RwLock<RegistryState>,
}

impl ServiceModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `sm`; fails with `AlreadyExists` if its RAN function ID is taken.
    pub fn register_service_model(&self, sm: ServiceModel) -> Result<()> {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        if state.models.contains_key(&sm.ran_function_id) {
            return Err(Error::AlreadyExists(format!(
                "service model for RAN function ID {}",
                sm.ran_function_id.0
            )));
        }
        info!(
            "Registering service model {} {} (RAN function ID {})",
            sm.model_name, sm.version, sm.ran_function_id.0
        );
        state.ran_functions.insert(
            sm.ran_function_id,
            RanFunctionItem {
                description: sm.description.clone(),
                revision: sm.revision,
                oid: sm.oid.clone(),
            },
        );
        state.models.insert(sm.ran_function_id, sm);
        Ok(())
    }

    pub fn get_service_model(&self, id: RanFunctionId) -> Result<ServiceModel> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .models
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::Unknown(format!("service model for RAN function ID {}", id.0)))
    }

    pub fn get_service_models(&self) -> Vec<ServiceModel> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .models
            .values()
            .cloned()
            .collect()
    }

    pub fn get_ran_functions(&self) -> RanFunctions {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ran_functions
            .clone()
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
