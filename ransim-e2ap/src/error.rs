//! E2AP error type

use thiserror::Error;

/// Errors raised while building, parsing or transporting E2AP messages.
#[derive(Debug, Error)]
pub enum E2apError {
    /// A mandatory IE is absent
    #[error("Missing mandatory IE: {0}")]
    MissingMandatoryIe(&'static str),

    /// An IE carries a value outside its range
    #[error("Invalid IE value: {0}")]
    InvalidIeValue(String),

    /// The peer answered with an unexpected message
    #[error("Unexpected message: expected {expected}, got {actual}")]
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },

    /// Frame encoding or decoding failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// Socket I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The association was closed before the procedure completed
    #[error("Connection closed")]
    ConnectionClosed,

    /// No answer within the procedure timer
    #[error("Timeout: {0}")]
    Timeout(String),
}

impl From<serde_json::Error> for E2apError {
    fn from(e: serde_json::Error) -> Self {
        E2apError::Codec(e.to_string())
    }
}

impl From<E2apError> for ransim_common::Error {
    fn from(e: E2apError) -> Self {
        match e {
            E2apError::MissingMandatoryIe(_) | E2apError::InvalidIeValue(_) => {
                ransim_common::Error::Invalid(e.to_string())
            }
            E2apError::Timeout(msg) => ransim_common::Error::Timeout(msg),
            E2apError::Io(io) => ransim_common::Error::Io(io),
            other => ransim_common::Error::Transport(other.to_string()),
        }
    }
}
