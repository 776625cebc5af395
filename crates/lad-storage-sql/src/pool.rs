//! Connection pool for the local user database.

use std::time::Duration;

use lad_storage::StorageError;
use sqlx::postgres::{PgPool, PgPoolOptions};

/// Pool settings for the local user database.
///
/// The driver only runs a handful of point queries per login, so the pool
/// stays small and idle connections are dropped quickly.
#[derive(Clone)]
pub struct PoolConfig {
    /// `postgres://` or `postgresql://` connection URL.
    pub url: String,
    /// Maximum number of connections.
    pub max_connections: u32,
    /// How long a query may wait for a free connection.
    pub acquire_timeout: Duration,
    /// Idle time after which a connection is closed.
    pub idle_timeout: Duration,
}

impl PoolConfig {
    /// Creates settings for a URL with default limits.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 5,
            acquire_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(300),
        }
    }

    /// Sets the maximum number of connections.
    #[must_use]
    pub const fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the acquire timeout.
    #[must_use]
    pub const fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Returns the URL with any password replaced by `****`.
    #[must_use]
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        match rest.rsplit_once('@') {
            Some((userinfo, host)) => match userinfo.split_once(':') {
                Some((user, _)) => format!("{scheme}://{user}:****@{host}"),
                None => self.url.clone(),
            },
            None => self.url.clone(),
        }
    }

    fn validate(&self) -> Result<(), StorageError> {
        if !(self.url.starts_with("postgres://") || self.url.starts_with("postgresql://")) {
            return Err(StorageError::Connection(format!(
                "unsupported database URL '{}': expected postgres://",
                self.redacted_url()
            )));
        }
        if self.max_connections == 0 {
            return Err(StorageError::InvalidData(
                "max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolConfig")
            .field("url", &self.redacted_url())
            .field("max_connections", &self.max_connections)
            .field("acquire_timeout", &self.acquire_timeout)
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

/// Opens a `PostgreSQL` pool and checks that the server answers.
///
/// # Errors
///
/// Returns `StorageError::Connection` if the URL is not a `PostgreSQL` URL or
/// the server cannot be reached.
pub async fn create_pool(config: &PoolConfig) -> Result<PgPool, StorageError> {
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(Some(config.idle_timeout))
        .connect(&config.url)
        .await
        .map_err(|e| {
            StorageError::Connection(format!("{}: {e}", config.redacted_url()))
        })?;

    tracing::debug!(
        url = %config.redacted_url(),
        max_connections = config.max_connections,
        "Connected to user database"
    );
    Ok(pool)
}
