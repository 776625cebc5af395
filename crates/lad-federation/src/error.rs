//! Federation error types.
//!
//! Lookups never surface these to the guard: a failed lookup is a missing
//! user. They are returned where the contract is fallible (provider
//! construction, remember-token persistence) and logged everywhere else.

use thiserror::Error;

/// Errors raised by a user provider.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The directory could not be reached.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The directory rejected a bind.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Unexpected directory response.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Timeout error.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Storage error when reading or persisting local users.
    #[error("Storage error: {0}")]
    Storage(#[from] lad_storage::StorageError),
}

impl FederationError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Checks if this is a connection error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Result type for federation operations.
pub type FederationResult<T> = Result<T, FederationError>;
