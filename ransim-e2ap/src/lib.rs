//! E2AP for ransim
//!
//! This crate provides:
//! - structured E2AP messages for the procedures an E2 node takes part in
//!   ([`procedures`]), with the [`Cause`] taxonomy and shared IEs ([`types`])
//! - a length-prefixed frame codec ([`codec`])
//! - the association traits used by the E2 node and a TCP implementation ([`client`])

pub mod cause;
pub mod client;
pub mod codec;
pub mod error;
pub mod procedures;
pub mod types;

pub use cause::{Cause, CauseMisc, CauseProtocol, CauseRicRequest, CauseRicService, CauseTransport};
pub use client::{
    ConfigurationUpdateOutcome, ConnectionUpdateOutcome, ControlOutcome, Dialer, E2ClientConn,
    E2NodeHandler, E2SetupOutcome, SubscriptionDeleteOutcome, SubscriptionOutcome, TcpDialer,
    TcpE2Client, TransportConfig,
};
pub use codec::{
    decode_frame, encode_frame, read_frame, read_frame_body, write_frame, E2apPdu, Frame, MAX_FRAME_LEN,
};
pub use error::E2apError;
pub use types::*;
