//! Directory connections.
//!
//! The resolver talks to the directory through [`DirectoryConnector`] and
//! [`DirectoryConnection`]. [`Ldap3Connector`] is the network implementation;
//! the in-memory directory implements the same traits for tests.
//!
//! A [`ServiceConnection`] owns the long-lived connection used for searches.
//! Password checks never bind on it: each one opens a fresh connection, so the
//! service connection keeps its bind identity for its whole lifetime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ldap3::{DerefAliases, Ldap, LdapConnAsync, LdapConnSettings, SearchEntry, SearchOptions};
use tokio::sync::Mutex;

use crate::config::{LdapConfig, SearchScope};
use crate::error::{LdapError, LdapResult};
use crate::filter::Filter;
use crate::search::LdapEntry;

/// LDAP result code for a rejected simple bind.
const RC_INVALID_CREDENTIALS: u32 = 49;

// ============================================================================
// Traits
// ============================================================================

/// An open directory connection.
#[async_trait]
pub trait DirectoryConnection: Send {
    /// Performs a simple bind. An empty DN and password bind anonymously.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::InvalidCredentials` if the server rejects the
    /// password.
    async fn bind(&mut self, dn: &str, password: &str) -> LdapResult<()>;

    /// Searches below `base`, returning every attribute of each match.
    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &Filter,
    ) -> LdapResult<Vec<LdapEntry>>;

    /// Unbinds and closes the connection.
    async fn unbind(&mut self) -> LdapResult<()>;
}

/// Opens directory connections.
#[async_trait]
pub trait DirectoryConnector: Send + Sync {
    /// Opens a new, unbound connection.
    async fn connect(&self) -> LdapResult<Box<dyn DirectoryConnection>>;
}

// ============================================================================
// ldap3
// ============================================================================

/// Connector backed by `ldap3`.
#[derive(Debug, Clone)]
pub struct Ldap3Connector {
    url: String,
    starttls: bool,
    connect_timeout: Duration,
}

impl Ldap3Connector {
    /// Creates a connector for a URL.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            starttls: false,
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Creates a connector from provider configuration.
    #[must_use]
    pub fn from_config(config: &LdapConfig) -> Self {
        Self::new(config.connection_url())
            .with_starttls(config.starttls)
            .with_connect_timeout(config.connect_timeout)
    }

    /// Enables StartTLS.
    #[must_use]
    pub const fn with_starttls(mut self, enabled: bool) -> Self {
        self.starttls = enabled;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Returns the connection URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DirectoryConnector for Ldap3Connector {
    async fn connect(&self) -> LdapResult<Box<dyn DirectoryConnection>> {
        let settings = LdapConnSettings::new()
            .set_conn_timeout(self.connect_timeout)
            .set_starttls(self.starttls);

        let (conn, ldap) = LdapConnAsync::with_settings(settings, &self.url)
            .await
            .map_err(|e| LdapError::Connection(e.to_string()))?;

        // Spawn connection driver
        tokio::spawn(async move {
            if let Err(e) = conn.drive().await {
                tracing::warn!(error = %e, "LDAP connection driver error");
            }
        });

        tracing::debug!(url = %self.url, starttls = self.starttls, "Opened LDAP connection");
        Ok(Box::new(Ldap3Connection { ldap }))
    }
}

/// Connection backed by `ldap3`.
pub struct Ldap3Connection {
    ldap: Ldap,
}

#[async_trait]
impl DirectoryConnection for Ldap3Connection {
    async fn bind(&mut self, dn: &str, password: &str) -> LdapResult<()> {
        let result = self.ldap.simple_bind(dn, password).await?;

        match result.rc {
            0 => Ok(()),
            RC_INVALID_CREDENTIALS => Err(LdapError::InvalidCredentials),
            rc => Err(LdapError::Bind(format!("result code {rc}: {}", result.text))),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &Filter,
    ) -> LdapResult<Vec<LdapEntry>> {
        let (rs, _result) = self
            .ldap
            .with_search_options(SearchOptions::new().deref(DerefAliases::Always))
            .search(base, scope.to_ldap3(), &filter.to_string(), vec!["*"])
            .await
            .map_err(|e| LdapError::Search(e.to_string()))?
            .success()
            .map_err(|e| LdapError::Search(e.to_string()))?;

        Ok(rs
            .into_iter()
            .map(SearchEntry::construct)
            .map(LdapEntry::from_search_entry)
            .collect())
    }

    async fn unbind(&mut self) -> LdapResult<()> {
        self.ldap.unbind().await?;
        Ok(())
    }
}

// ============================================================================
// Service connection
// ============================================================================

/// The resolver's long-lived directory connection.
///
/// Searches are serialized on one connection. Every call is bounded by the
/// operation timeout.
pub struct ServiceConnection {
    connector: Arc<dyn DirectoryConnector>,
    conn: Mutex<Box<dyn DirectoryConnection>>,
    operation_timeout: Duration,
}

impl ServiceConnection {
    /// Connects and binds with the service account, or anonymously if
    /// `service_bind` is `None`.
    ///
    /// ## Errors
    ///
    /// Fails if the directory cannot be reached or rejects the bind.
    pub async fn open(
        connector: Arc<dyn DirectoryConnector>,
        service_bind: Option<(String, String)>,
        operation_timeout: Duration,
    ) -> LdapResult<Self> {
        let mut conn = bounded("connect", operation_timeout, connector.connect()).await?;

        let (dn, password) = service_bind.unwrap_or_default();
        bounded("bind", operation_timeout, conn.bind(&dn, &password))
            .await
            .map_err(|e| match e {
                LdapError::InvalidCredentials => {
                    LdapError::Bind("service account credentials rejected".to_string())
                }
                other => other,
            })?;

        if dn.is_empty() {
            tracing::info!("Bound to directory anonymously");
        } else {
            tracing::info!(dn = %dn, "Bound to directory with service account");
        }

        Ok(Self {
            connector,
            conn: Mutex::new(conn),
            operation_timeout,
        })
    }

    /// Searches on the service connection.
    pub async fn search(
        &self,
        base: &str,
        scope: SearchScope,
        filter: &Filter,
    ) -> LdapResult<Vec<LdapEntry>> {
        let mut conn = self.conn.lock().await;
        bounded(
            "search",
            self.operation_timeout,
            conn.search(base, scope, filter),
        )
        .await
    }

    /// Checks a password by binding as `dn` on a fresh connection.
    ///
    /// Returns `Ok(false)` when the server rejects the credentials, and
    /// without contacting the server when the password or DN is empty.
    ///
    /// ## Errors
    ///
    /// Fails on connection errors, timeouts and unexpected bind results.
    pub async fn verify_bind(&self, dn: &str, password: &str) -> LdapResult<bool> {
        if password.is_empty() || dn.is_empty() {
            tracing::debug!(dn = %dn, "Refusing unauthenticated bind");
            return Ok(false);
        }

        let mut conn = bounded("connect", self.operation_timeout, self.connector.connect()).await?;
        let result = bounded("bind", self.operation_timeout, conn.bind(dn, password)).await;

        if let Err(e) = bounded("unbind", self.operation_timeout, conn.unbind()).await {
            tracing::debug!(error = %e, "Unbind after password check failed");
        }

        match result {
            Ok(()) => Ok(true),
            Err(LdapError::InvalidCredentials) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Unbinds the service connection.
    pub async fn close(&self) -> LdapResult<()> {
        let mut conn = self.conn.lock().await;
        bounded("unbind", self.operation_timeout, conn.unbind()).await
    }
}

async fn bounded<T>(
    operation: &'static str,
    limit: Duration,
    fut: impl Future<Output = LdapResult<T>>,
) -> LdapResult<T> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| LdapError::Timeout(operation))?
}
