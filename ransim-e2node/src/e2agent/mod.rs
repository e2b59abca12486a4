//! E2 agent
//!
//! The agent of a simulated node owns its E2 connections. The primary
//! connection to the node's configured controller is kept up by a supervised
//! reconnect task; connections requested by the RIC through E2 Connection
//! Update are driven by the connection controller.

pub mod addressing;
pub mod agent;
pub mod agents;
pub mod backoff;
pub mod connection;
pub mod context;
pub mod controller;
pub mod transactions;

pub use addressing::RicAddress;
pub use agent::{E2Agent, E2AgentConfig};
pub use agents::E2Agents;
pub use backoff::{retry_forever, Backoff, BackoffConfig};
pub use connection::{run_configuration_update, run_e2_setup, E2Connection, E2ConnectionConfig};
pub use context::NodeContext;
pub use controller::{ConnectionController, ControllerConfig};
pub use transactions::{Transaction, TransactionIdPool};
