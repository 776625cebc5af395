//! LDAP-specific error types.
//!
//! ## Security Note
//!
//! Error messages must not leak passwords or bind credentials.

use lad_federation::FederationError;
use thiserror::Error;

/// LDAP-specific errors.
#[derive(Debug, Error)]
pub enum LdapError {
    /// Invalid configuration.
    #[error("LDAP configuration error: {0}")]
    Configuration(String),

    /// Connection failed.
    #[error("LDAP connection failed: {0}")]
    Connection(String),

    /// Bind failed for a reason other than bad credentials.
    #[error("LDAP bind failed: {0}")]
    Bind(String),

    /// The server rejected the bind credentials (result code 49).
    #[error("Invalid credentials")]
    InvalidCredentials,

    /// Search operation failed.
    #[error("LDAP search failed: {0}")]
    Search(String),

    /// A search filter could not be parsed.
    #[error("Invalid search filter: {0}")]
    InvalidFilter(String),

    /// An operation exceeded the configured timeout.
    #[error("LDAP {0} timed out")]
    Timeout(&'static str),

    /// Underlying ldap3 error.
    #[error("LDAP error: {0}")]
    Ldap3(#[from] ldap3::LdapError),
}

impl LdapError {
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

    /// Creates a filter error.
    #[must_use]
    pub fn filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    /// Checks if this is a connection-related error.
    #[must_use]
    pub const fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout(_))
    }
}

/// Result type for LDAP operations.
pub type LdapResult<T> = Result<T, LdapError>;

impl From<LdapError> for FederationError {
    fn from(err: LdapError) -> Self {
        match err {
            LdapError::Configuration(msg) | LdapError::InvalidFilter(msg) => {
                FederationError::Configuration(msg)
            }
            LdapError::Connection(msg) => FederationError::Connection(msg),
            LdapError::Bind(msg) => FederationError::AuthenticationFailed(msg),
            LdapError::InvalidCredentials => {
                FederationError::AuthenticationFailed("invalid credentials".to_string())
            }
            LdapError::Search(msg) => FederationError::Protocol(msg),
            LdapError::Timeout(op) => FederationError::Timeout(format!("LDAP {op}")),
            LdapError::Ldap3(e) => FederationError::Protocol(e.to_string()),
        }
    }
}
