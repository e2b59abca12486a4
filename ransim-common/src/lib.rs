//! Common types and utilities for ransim
//!
//! This crate provides the shared error type, logging setup, identity types and
//! the simulation model used across all ransim crates.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::{
    load_and_validate_model, load_model, load_model_from_str, validate_model, Cell, ConfigError,
    ConfigValidationError, Controller, Model, Node, ServiceModelInfo, DEFAULT_E2AP_PORT,
    DEFAULT_REPORT_INTERVAL_MS,
};
pub use error::{Error, Result};
pub use logging::{
    init_logging, init_logging_with_filter, log_e2ap_message, Direction, HexDump, LogLevel,
};
pub use types::{GnbId, Ncgi, Plmn};
