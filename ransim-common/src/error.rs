//! Error types for ransim
//!
//! The store and registry layers report failures with the kinds below. Callers
//! on the RIC-facing path turn them into E2AP failure messages with a cause;
//! everything else propagates them with `?`.

use thiserror::Error;

/// Error types for the ransim library.
#[derive(Debug, Error)]
pub enum Error {
    /// An entity (connection, subscription, service model) does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// An entity with the same key is already registered.
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// A malformed identifier or argument was rejected.
    #[error("Invalid: {0}")]
    Invalid(String),

    /// A lookup or remote operation failed for an unclassified reason.
    #[error("Unknown: {0}")]
    Unknown(String),

    /// The requested procedure is not implemented by the receiver.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// An operation did not complete within its deadline.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Transport-level failure (dial, encode/decode, closed association).
    #[error("Transport error: {0}")]
    Transport(String),

    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network I/O errors.
    #[error("Network error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing errors.
    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),
}

/// Result alias used across the ransim crates.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true for [`Error::NotFound`].
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Returns true for [`Error::AlreadyExists`].
    pub fn is_already_exists(&self) -> bool {
        matches!(self, Error::AlreadyExists(_))
    }

    /// Returns true for [`Error::Invalid`].
    pub fn is_invalid(&self) -> bool {
        matches!(self, Error::Invalid(_))
    }

    /// Returns true for [`Error::Unknown`].
    pub fn is_unknown(&self) -> bool {
        matches!(self, Error::Unknown(_))
    }
}
