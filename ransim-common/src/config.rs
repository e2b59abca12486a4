//! Simulation model loading and validation
//!
//! The model describes the simulated topology: which E2 nodes exist, which RIC
//! controllers each node connects to, and which service models each node
//! announces during E2 Setup.
//!
//! # Example
//!
//! ```rust,ignore
//! use ransim_common::config::load_and_validate_model;
//!
//! let model = load_and_validate_model("config/model.yaml")?;
//! for (name, node) in &model.nodes {
//!     println!("{name}: gNB {}", node.gnb_id);
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::types::{GnbId, Ncgi, Plmn};

/// Default SCTP port for E2AP (O-RAN.WG3.E2AP).
pub const DEFAULT_E2AP_PORT: u16 = 36421;

/// Default periodic report interval for cells without an explicit setting.
pub const DEFAULT_REPORT_INTERVAL_MS: u64 = 1000;

/// Errors that can occur during model loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File I/O error
    #[error("Failed to read model file: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML parsing error
    #[error("Failed to parse model: {0}")]
    ParseError(String),

    /// Model validation error
    #[error("Model validation failed: {0}")]
    ValidationError(#[from] ConfigValidationError),
}

/// Errors that can occur during model validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigValidationError {
    /// Invalid PLMN
    #[error("Invalid PLMN: {0}")]
    InvalidPlmn(String),

    /// No node configured
    #[error("No E2 node configured")]
    NoNodeConfigured,

    /// A node references a controller that is not defined
    #[error("Node {node} references unknown controller {controller}")]
    UnknownController { node: String, controller: String },

    /// A node references a service model that is not defined
    #[error("Node {node} references unknown service model {service_model}")]
    UnknownServiceModel { node: String, service_model: String },

    /// Invalid controller endpoint
    #[error("Invalid controller {0}: address must be set and port non-zero")]
    InvalidController(String),

    /// Two nodes share the same gNB ID
    #[error("Duplicate gNB ID {0}")]
    DuplicateGnbId(GnbId),

    /// gNB ID out of range
    #[error("Invalid gNB ID {0}")]
    InvalidGnbId(GnbId),

    /// Service model ID out of range
    #[error("Invalid service model {0}: RAN function ID must be positive")]
    InvalidServiceModel(String),
}

/// A RIC endpoint a node may connect to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Controller {
    /// Controller identifier
    pub id: String,
    /// IP address or hostname
    pub address: String,
    /// E2AP port
    #[serde(default = "default_e2ap_port")]
    pub port: u16,
}

fn default_e2ap_port() -> u16 {
    DEFAULT_E2AP_PORT
}

/// A service model that nodes may enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceModelInfo {
    /// RAN function ID announced for this model
    pub id: i32,
    /// Human readable description
    #[serde(default)]
    pub description: String,
    /// Model version
    #[serde(default)]
    pub version: String,
}

/// A simulated cell served by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// NR Cell Global Identity
    pub ncgi: Ncgi,
    /// Periodic report interval used when a subscription does not carry one
    #[serde(default = "default_report_interval")]
    pub report_interval_ms: u64,
    /// Physical cell identity
    #[serde(default)]
    pub pci: u32,
}

fn default_report_interval() -> u64 {
    DEFAULT_REPORT_INTERVAL_MS
}

/// A simulated E2 node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// gNB ID
    pub gnb_id: GnbId,
    /// Names of the controllers this node connects to, in preference order
    #[serde(default)]
    pub controllers: Vec<String>,
    /// Names of the service models this node announces
    #[serde(default)]
    pub service_models: Vec<String>,
    /// Cells served by the node
    #[serde(default)]
    pub cells: Vec<Cell>,
}

/// The simulation model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Model {
    /// PLMN shared by all nodes
    #[serde(default)]
    pub plmn: Plmn,
    /// Nodes by name
    #[serde(default)]
    pub nodes: BTreeMap<String, Node>,
    /// Controllers by name
    #[serde(default)]
    pub controllers: BTreeMap<String, Controller>,
    /// Service models by name
    #[serde(default)]
    pub service_models: BTreeMap<String, ServiceModelInfo>,
}

impl Model {
    /// Looks up a controller by name.
    pub fn controller(&self, name: &str) -> Result<&Controller, Error> {
        self.controllers
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("controller {name}")))
    }

    /// Looks up a service model by name.
    pub fn service_model(&self, name: &str) -> Result<&ServiceModelInfo, Error> {
        self.service_models
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("service model {name}")))
    }

    /// Looks up a node by name.
    pub fn node(&self, name: &str) -> Result<&Node, Error> {
        self.nodes
            .get(name)
            .ok_or_else(|| Error::NotFound(format!("node {name}")))
    }
}

/// Loads a model from a YAML file without validating it.
pub fn load_model<P: AsRef<Path>>(path: P) -> Result<Model, ConfigError> {
    let contents = std::fs::read_to_string(path.as_ref())?;
    load_model_from_str(&contents)
}

/// Loads a model from a YAML string without validating it.
pub fn load_model_from_str(yaml: &str) -> Result<Model, ConfigError> {
    serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Validates cross references and value ranges of a model.
pub fn validate_model(model: &Model) -> Result<(), ConfigValidationError> {
    if model.plmn.mcc > 999 || model.plmn.mnc > 999 {
        return Err(ConfigValidationError::InvalidPlmn(model.plmn.to_string()));
    }
    if model.nodes.is_empty() {
        return Err(ConfigValidationError::NoNodeConfigured);
    }

    for (name, controller) in &model.controllers {
        if controller.address.is_empty() || controller.port == 0 {
            return Err(ConfigValidationError::InvalidController(name.clone()));
        }
    }
    for (name, sm) in &model.service_models {
        if sm.id <= 0 {
            return Err(ConfigValidationError::InvalidServiceModel(name.clone()));
        }
    }

    let mut gnb_ids = HashSet::new();
    for (name, node) in &model.nodes {
        if !node.gnb_id.is_valid() {
            return Err(ConfigValidationError::InvalidGnbId(node.gnb_id));
        }
        if !gnb_ids.insert(node.gnb_id) {
            return Err(ConfigValidationError::DuplicateGnbId(node.gnb_id));
        }
        if let Some(controller) = node
            .controllers
            .iter()
            .find(|c| !model.controllers.contains_key(*c))
        {
            return Err(ConfigValidationError::UnknownController {
                node: name.clone(),
                controller: controller.clone(),
            });
        }
        if let Some(sm) = node
            .service_models
            .iter()
            .find(|s| !model.service_models.contains_key(*s))
        {
            return Err(ConfigValidationError::UnknownServiceModel {
                node: name.clone(),
                service_model: sm.clone(),
            });
        }
    }

    Ok(())
}

/// Loads and validates a model from a YAML file.
pub fn load_and_validate_model<P: AsRef<Path>>(path: P) -> Result<Model, ConfigError> {
    let model = load_model(path)?;
    validate_model(&model)?;
    Ok(model)
}
