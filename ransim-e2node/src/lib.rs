//! ransim-e2node - Simulated O-RAN E2 Node
#![allow(missing_docs)]
//!
//! This crate implements the E2 node side of a RAN simulator:
//!
//! - connection store with watchers and the connection controller that
//!   drives every RIC association through dial, E2 Setup and teardown
//! - per-endpoint [`E2Connection`]s answering RIC Control, Subscription,
//!   Subscription Delete and E2 Connection Update
//! - service model registry and the KPM, MHO, RC and CCC service models
//! - subscription store and periodic indication reporting
//!
//! # Architecture
//!
//! ```text
//!            ┌──────────────────── E2Agent ────────────────────┐
//!            │                                                  │
//!  RIC  ◄────┤  E2Connection ──► ServiceModelRegistry ──► SMs   │
//!            │       │                                   │      │
//!            │       ▼                                   ▼      │
//!            │  ConnectionStore ◄── ConnectionController   SubscriptionStore
//!            │                                                  │
//!            └──────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ransim_common::load_and_validate_model;
//! use ransim_e2ap::TcpDialer;
//! use ransim_e2node::E2Agents;
//!
//! let model = Arc::new(load_and_validate_model("config/model.yaml")?);
//! let agents = E2Agents::new(model, Arc::new(TcpDialer::default()));
//! agents.start(&[]).await?;
//! ```

pub mod e2agent;
pub mod servicemodel;
pub mod store;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use e2agent::{
    BackoffConfig, ConnectionController, ControllerConfig, E2Agent, E2AgentConfig, E2Agents,
    E2Connection, E2ConnectionConfig, NodeContext, RicAddress, TransactionIdPool,
};
pub use servicemodel::{ServiceModel, ServiceModelClient, ServiceModelContext, ServiceModelRegistry};
pub use store::{
    Connection, ConnectionId, ConnectionState, ConnectionStatus, ConnectionStore, Phase,
    Subscription, SubscriptionId, SubscriptionStore,
};
pub use tasks::{Task, TaskHandle, TaskMessage, TaskState};
