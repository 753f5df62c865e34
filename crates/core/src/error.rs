//! Error types for Vessel
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! Three variants are contract violations raised by the handoff layer:
//! `InvalidEntity`, `UnsupportedKind` and `AlreadyResolved`. They are
//! programmer errors and are never retried. An entity that no longer exists
//! is not an error at all; it is reported as `Ok(None)`.

use crate::contract::{EntityKind, Version};
use crate::types::Key;
use thiserror::Error;

/// Result type alias for Vessel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for Vessel
#[derive(Debug, Error)]
pub enum Error {
    /// Capsule construction on an invalidated or unmanaged entity
    #[error("Invalid entity: {0}")]
    InvalidEntity(String),

    /// Capsule construction on a kind with no registered bridge
    #[error("Unsupported entity kind: {0}")]
    UnsupportedKind(EntityKind),

    /// Second resolution of a single-use capsule
    #[error("Capsule for {kind} was already resolved")]
    AlreadyResolved {
        /// Kind carried by the capsule
        kind: EntityKind,
    },

    /// Table does not exist at the version being read or written
    #[error("Table not found: {0}")]
    TableNotFound(String),

    /// Table already exists
    #[error("Table already exists: {0}")]
    TableExists(String),

    /// Transaction aborted: a key it read was committed by someone else first
    #[error("Conflict on {key}: read at {read_version}, now at {current_version}")]
    Conflict {
        /// Key with the conflict
        key: Key,
        /// Version observed when the key was read
        read_version: Version,
        /// Latest committed version of the key at validation time
        current_version: Version,
    },

    /// Connection cannot move off a pinned version
    #[error("Connection is pinned at {version} by outstanding capsules")]
    VersionPinned {
        /// The pinned version
        version: Version,
    },

    /// Operation on a closed connection
    #[error("Connection is closed")]
    ConnectionClosed,

    /// Invalid operation or state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this error is a handoff contract violation.
    ///
    /// Integration code is expected to fail fast on these.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::InvalidEntity(_) | Error::UnsupportedKind(_) | Error::AlreadyResolved { .. }
        )
    }
}

impl From<rmp_serde::encode::Error> for Error {
    fn from(e: rmp_serde::encode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<rmp_serde::decode::Error> for Error {
    fn from(e: rmp_serde::decode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
