//! LDAP user provider.
//!
//! Resolves identifiers and credentials to application users through
//! directory searches, optionally linking entries to a local user table, and
//! verifies passwords by binding as the resolved entry.
//!
//! ## Security
//!
//! - Identifiers are escaped into structured filters, never spliced as text
//! - Passwords are never logged
//! - Empty passwords are rejected before any bind

use std::sync::Arc;

use lad_federation::{FederationError, FederationResult, UserProvider};
use lad_model::{ApplicationUser, Credentials, LinkedUser, LocalRecord};
use lad_storage::{StorageError, UserStore};

use crate::config::{LdapConfig, LinkMode};
use crate::connection::{DirectoryConnector, Ldap3Connector, ServiceConnection};
use crate::error::{LdapError, LdapResult};
use crate::filter::{self, Filter};
use crate::mapper::LdapUserMapper;
use crate::search::{EntryMatch, LdapEntry};

/// LDAP user provider.
pub struct LdapUserProvider {
    config: Arc<LdapConfig>,
    base_filter: Option<Filter>,
    mapper: LdapUserMapper,
    connection: ServiceConnection,
    store: Option<Arc<dyn UserStore>>,
}

impl LdapUserProvider {
    /// Validates the configuration and opens the service connection.
    ///
    /// ## Errors
    ///
    /// Returns an error if:
    /// - Configuration validation fails
    /// - The link mode needs a user store and none (or an incompatible one)
    ///   was given
    /// - The directory cannot be reached or rejects the service bind
    pub async fn connect(
        config: LdapConfig,
        connector: Arc<dyn DirectoryConnector>,
        store: Option<Arc<dyn UserStore>>,
    ) -> LdapResult<Self> {
        config.validate()?;
        let base_filter = config.base_filter()?;
        let mode = config.link_mode();

        let store = if mode.uses_store() {
            let store = store.ok_or_else(|| {
                LdapError::config(format!("link mode '{mode}' requires a user store"))
            })?;
            let table = store.table();
            for column in config.db_field.iter().chain([&config.remember_token_field]) {
                table.require_column(column).map_err(|e| {
                    LdapError::config(format!("user store does not match configuration: {e}"))
                })?;
            }
            Some(store)
        } else {
            None
        };

        let connection =
            ServiceConnection::open(connector, config.service_bind()?, config.operation_timeout)
                .await?;

        tracing::info!(
            basedn = %config.basedn,
            mode = %mode,
            "LDAP user provider ready"
        );

        Ok(Self {
            mapper: LdapUserMapper::new(&config),
            config: Arc::new(config),
            base_filter,
            connection,
            store,
        })
    }

    /// Connects to the server named in the configuration.
    ///
    /// ## Errors
    ///
    /// See [`connect`](Self::connect).
    pub async fn from_config(
        config: LdapConfig,
        store: Option<Arc<dyn UserStore>>,
    ) -> LdapResult<Self> {
        let connector = Arc::new(Ldap3Connector::from_config(&config));
        Self::connect(config, connector, store).await
    }

    /// Returns the LDAP configuration.
    #[must_use]
    pub fn config(&self) -> &LdapConfig {
        &self.config
    }

    /// Returns the link mode.
    #[must_use]
    pub fn link_mode(&self) -> LinkMode {
        self.config.link_mode()
    }

    /// Resolves a login identifier the way `retrieve_by_credentials` does,
    /// but never writes to the user store.
    ///
    /// In the linked modes, an entry without a local row is not found.
    pub async fn find_by_login(&self, identifier: &str) -> Option<ApplicationUser> {
        let entry = self.search_login(identifier).await?;

        match self.link_mode() {
            LinkMode::Directory => self.mapper.to_transient(&entry).map(Into::into),
            LinkMode::Table | LinkMode::Model => {
                self.find_linked(&entry).await.into_user().map(Into::into)
            }
        }
    }

    fn link_column(&self) -> &str {
        self.config.db_field.as_deref().unwrap_or_default()
    }

    fn user_filter(&self, attribute: &str, value: &str) -> Filter {
        filter::user_filter(self.base_filter.as_ref(), attribute, value)
    }

    /// Runs a user search and keeps the result only if exactly one entry
    /// matched.
    async fn search_unique(&self, filter: &Filter) -> Option<LdapEntry> {
        let entries = match self
            .connection
            .search(&self.config.basedn, self.config.search_scope, filter)
            .await
        {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(filter = %filter, error = %e, "Directory search failed");
                return None;
            }
        };

        match EntryMatch::from_entries(entries) {
            EntryMatch::Unique(entry) => Some(entry),
            EntryMatch::None => {
                tracing::debug!(filter = %filter, "No directory entry matched");
                None
            }
            EntryMatch::Ambiguous(matches) => {
                tracing::warn!(filter = %filter, matches, "Ambiguous directory match");
                None
            }
        }
    }

    /// Reads the directory identity stored on a local row (model mode).
    async fn directory_id_for_local(&self, identifier: &str) -> Option<String> {
        let Ok(id) = identifier.parse::<i64>() else {
            tracing::debug!(identifier = %identifier, "Session identifier is not a local key");
            return None;
        };
        let store = self.store.as_ref()?;

        match store.find_by_id(id).await {
            Ok(Some(record)) => {
                let value = record.get(self.link_column()).map(str::to_string);
                if value.is_none() {
                    tracing::warn!(id, column = self.link_column(), "Local user has no directory link");
                }
                value
            }
            Ok(None) => {
                tracing::debug!(id, "No local user with this key");
                None
            }
            Err(e) => {
                tracing::warn!(id, error = %e, "Failed to load local user");
                None
            }
        }
    }

    async fn find_linked(&self, entry: &LdapEntry) -> LinkLookup {
        let Some(store) = self.store.as_ref() else {
            return LinkLookup::Failed;
        };
        let Some(directory_id) = self.mapper.directory_id(entry) else {
            tracing::warn!(
                dn = %entry.dn,
                attribute = %self.config.user_id_attribute,
                "Directory entry has no identity attribute"
            );
            return LinkLookup::Failed;
        };

        match store.find_where(self.link_column(), &directory_id).await {
            Ok(Some(record)) => LinkLookup::Found(LinkedUser {
                record,
                dn: entry.dn.clone(),
                directory_id,
            }),
            Ok(None) => LinkLookup::Missing,
            Err(e) => {
                tracing::warn!(dn = %entry.dn, error = %e, "Failed to look up linked user");
                LinkLookup::Failed
            }
        }
    }

    /// Finds the local row linked to `entry`, importing the entry if none
    /// exists yet.
    async fn link_or_import(&self, entry: &LdapEntry) -> Option<LinkedUser> {
        match self.find_linked(entry).await {
            LinkLookup::Found(user) => return Some(user),
            LinkLookup::Failed => return None,
            LinkLookup::Missing => {}
        }

        let store = self.store.as_ref()?;
        let fields = self.mapper.to_record_fields(entry)?;
        match store.insert(&fields).await {
            Ok(record) => {
                tracing::info!(dn = %entry.dn, id = record.id, "Imported directory user");
                Some(LinkedUser {
                    record,
                    dn: entry.dn.clone(),
                    directory_id: fields.get(self.link_column()).cloned().unwrap_or_default(),
                })
            }
            // Lost a race with a concurrent import of the same entry
            Err(StorageError::Duplicate(_)) => self.find_linked(entry).await.into_user(),
            Err(e) => {
                tracing::warn!(dn = %entry.dn, error = %e, "Failed to import directory user");
                None
            }
        }
    }

    async fn search_login(&self, identifier: &str) -> Option<LdapEntry> {
        if identifier.is_empty() {
            return None;
        }
        let filter = self.user_filter(&self.config.login_attribute, identifier);
        self.search_unique(&filter).await
    }

    async fn resolve_by_id(&self, identifier: &str) -> Option<ApplicationUser> {
        let directory_id = match self.link_mode() {
            LinkMode::Model => self.directory_id_for_local(identifier).await?,
            LinkMode::Directory | LinkMode::Table => identifier.to_string(),
        };

        let filter = filter::identity_filter(
            self.base_filter.as_ref(),
            &self.config.user_id_attribute,
            &directory_id,
        );
        let entry = self.search_unique(&filter).await?;

        match self.link_mode() {
            LinkMode::Directory => self.mapper.to_transient(&entry).map(Into::into),
            LinkMode::Table | LinkMode::Model => self.find_linked(&entry).await.into_user().map(Into::into),
        }
    }
}

/// Result of looking up the local row linked to an entry.
enum LinkLookup {
    Found(LinkedUser),
    Missing,
    Failed,
}

impl LinkLookup {
    fn into_user(self) -> Option<LinkedUser> {
        match self {
            Self::Found(user) => Some(user),
            Self::Missing => {
                tracing::debug!("No local user linked to directory entry");
                None
            }
            Self::Failed => None,
        }
    }
}

impl UserProvider for LdapUserProvider {
    fn provider_type(&self) -> &'static str {
        "ldap"
    }

    fn auth_identifier(&self, user: &ApplicationUser) -> String {
        match (self.link_mode(), user.local_id()) {
            (LinkMode::Model, Some(id)) => id.to_string(),
            _ => user.directory_id().to_string(),
        }
    }

    async fn retrieve_by_id(&self, identifier: &str) -> Option<ApplicationUser> {
        self.resolve_by_id(identifier).await
    }

    async fn retrieve_by_token(&self, identifier: &str, token: &str) -> Option<ApplicationUser> {
        let user = self.resolve_by_id(identifier).await?;

        let matches = match &user {
            ApplicationUser::Linked(linked) => linked
                .record
                .get(&self.config.remember_token_field)
                .is_some_and(|stored| constant_time_eq(stored.as_bytes(), token.as_bytes())),
            ApplicationUser::Transient(_) => false,
        };

        if !matches {
            tracing::debug!(identifier = %identifier, "Remember token rejected");
        }
        matches.then_some(user)
    }

    async fn retrieve_by_credentials(&self, credentials: &Credentials) -> Option<ApplicationUser> {
        let entry = self.search_login(&credentials.identifier).await?;

        match self.link_mode() {
            LinkMode::Directory => self.mapper.to_transient(&entry).map(Into::into),
            LinkMode::Table | LinkMode::Model => self.link_or_import(&entry).await.map(Into::into),
        }
    }

    async fn validate_credentials(&self, user: &ApplicationUser, credentials: &Credentials) -> bool {
        if credentials.has_empty_secret() {
            tracing::debug!(dn = %user.dn(), "Empty password rejected");
            return false;
        }

        match self.connection.verify_bind(user.dn(), &credentials.secret).await {
            Ok(true) => {
                tracing::info!(dn = %user.dn(), "User authenticated");
                true
            }
            Ok(false) => {
                tracing::info!(dn = %user.dn(), "Invalid credentials");
                false
            }
            Err(e) => {
                tracing::warn!(dn = %user.dn(), error = %e, "Password check failed");
                false
            }
        }
    }

    async fn update_remember_token(
        &self,
        user: &mut ApplicationUser,
        token: &str,
    ) -> FederationResult<()> {
        let ApplicationUser::Linked(linked) = user else {
            return Ok(());
        };
        let store = self
            .store
            .as_ref()
            .ok_or_else(|| FederationError::config("no user store configured"))?;

        let column = self.config.remember_token_field.as_str();
        let mut change = LocalRecord::new(linked.record.id);
        change.set(column, Some(token.to_string()));
        store.save(&change).await?;

        linked.record.set(column, Some(token.to_string()));
        Ok(())
    }

    async fn close(&self) -> FederationResult<()> {
        self.connection.close().await.map_err(Into::into)
    }
}

/// Constant-time comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
