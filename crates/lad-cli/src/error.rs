//! CLI error types.

use thiserror::Error;

/// CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Directory error.
    #[error(transparent)]
    Ldap(#[from] lad_federation_ldap::LdapError),

    /// Local store error.
    #[error("database error: {0}")]
    Storage(#[from] lad_storage::StorageError),

    /// Provider error.
    #[error(transparent)]
    Federation(#[from] lad_federation::FederationError),

    /// No user resolved.
    #[error("no user found for '{0}'")]
    NotFound(String),

    /// Authentication attempt denied.
    #[error("authentication denied")]
    Denied,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// CLI result type.
pub type CliResult<T> = Result<T, CliError>;
