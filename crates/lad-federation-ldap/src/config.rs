//! LDAP provider configuration.
//!
//! Option names follow the driver's configuration file keys. Every option is
//! checked by [`LdapConfig::validate`] before a provider is constructed.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use lad_storage::table::{validate_identifier, DEFAULT_REMEMBER_TOKEN_COLUMN};
use lad_storage::UserTable;
use serde::{Deserialize, Serialize};

use crate::error::{LdapError, LdapResult};
use crate::filter::{self, escape_dn_value, is_valid_attribute, Filter};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Search scope
// ============================================================================

/// LDAP search scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchScope {
    /// Search only the base DN.
    Base,
    /// Search one level below the base DN.
    OneLevel,
    /// Search the entire subtree.
    #[default]
    Subtree,
}

impl SearchScope {
    /// Converts to ldap3 scope.
    #[must_use]
    pub const fn to_ldap3(self) -> ldap3::Scope {
        match self {
            Self::Base => ldap3::Scope::Base,
            Self::OneLevel => ldap3::Scope::OneLevel,
            Self::Subtree => ldap3::Scope::Subtree,
        }
    }
}

// ============================================================================
// Link mode
// ============================================================================

/// How resolved directory entries become application users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    /// Transient users built from directory attributes.
    Directory,
    /// Linked users; session identifiers are directory identities.
    Table,
    /// Linked users; session identifiers are local primary keys.
    Model,
}

impl LinkMode {
    /// Checks if this mode reads and writes the local user table.
    #[must_use]
    pub const fn uses_store(self) -> bool {
        !matches!(self, Self::Directory)
    }
}

impl fmt::Display for LinkMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Directory => "directory",
            Self::Table => "table",
            Self::Model => "model",
        })
    }
}

// ============================================================================
// LDAP Configuration
// ============================================================================

/// LDAP provider configuration.
///
/// The service password is never serialized and is redacted in `Debug`.
#[derive(Clone, Serialize, Deserialize)]
pub struct LdapConfig {
    // === Connection ===
    /// Directory host, optionally with scheme and port
    /// (`ldap.example.com`, `ldaps://ldap.example.com:636`).
    pub host: String,

    /// Protocol version. Only 3 is supported.
    #[serde(default = "default_version")]
    pub version: u8,

    /// Upgrade plain connections with StartTLS.
    #[serde(default)]
    pub starttls: bool,

    /// Service account name, bound as `cn={username},{rdn}`.
    #[serde(default)]
    pub username: Option<String>,

    /// Service account password.
    #[serde(default, skip_serializing)]
    pub password: Option<String>,

    /// Container of the service account.
    #[serde(default)]
    pub rdn: Option<String>,

    /// Timeout for establishing a connection.
    #[serde(default = "default_connect_timeout", with = "humantime_serde")]
    pub connect_timeout: Duration,

    /// Timeout for each bind or search.
    #[serde(default = "default_operation_timeout", with = "humantime_serde")]
    pub operation_timeout: Duration,

    // === Search ===
    /// Search base.
    pub basedn: String,

    /// Base search filter combined with every user lookup.
    #[serde(default)]
    pub filter: Option<String>,

    /// Search scope below `basedn`.
    #[serde(default)]
    pub search_scope: SearchScope,

    /// Attribute matched against the login identifier.
    #[serde(default = "default_attribute")]
    pub login_attribute: String,

    /// Attribute holding the user's directory identity.
    #[serde(default = "default_attribute")]
    pub user_id_attribute: String,

    /// Directory attribute name to application field name.
    #[serde(default)]
    pub user_attributes: BTreeMap<String, String>,

    // === Local store ===
    /// Link directory entries to rows of a local table.
    #[serde(default)]
    pub use_db: bool,

    /// Local user table.
    #[serde(default)]
    pub db_table: Option<String>,

    /// Column holding the directory identity.
    #[serde(default)]
    pub db_field: Option<String>,

    /// Use local primary keys as session identifiers.
    #[serde(default)]
    pub eloquent: bool,

    /// Column holding the "remember me" token.
    #[serde(default = "default_remember_token_field")]
    pub remember_token_field: String,

    /// Column receiving the entry DN when a user is imported.
    #[serde(default)]
    pub db_dn_field: Option<String>,
}

fn default_version() -> u8 {
    3
}

fn default_connect_timeout() -> Duration {
    DEFAULT_CONNECT_TIMEOUT
}

fn default_operation_timeout() -> Duration {
    DEFAULT_OPERATION_TIMEOUT
}

fn default_attribute() -> String {
    "uid".to_string()
}

fn default_remember_token_field() -> String {
    DEFAULT_REMEMBER_TOKEN_COLUMN.to_string()
}

impl fmt::Debug for LdapConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LdapConfig")
            .field("host", &self.host)
            .field("version", &self.version)
            .field("starttls", &self.starttls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("rdn", &self.rdn)
            .field("connect_timeout", &self.connect_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("basedn", &self.basedn)
            .field("filter", &self.filter)
            .field("search_scope", &self.search_scope)
            .field("login_attribute", &self.login_attribute)
            .field("user_id_attribute", &self.user_id_attribute)
            .field("user_attributes", &self.user_attributes)
            .field("use_db", &self.use_db)
            .field("db_table", &self.db_table)
            .field("db_field", &self.db_field)
            .field("eloquent", &self.eloquent)
            .field("remember_token_field", &self.remember_token_field)
            .field("db_dn_field", &self.db_dn_field)
            .finish()
    }
}

impl LdapConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> LdapConfigBuilder {
        LdapConfigBuilder::new()
    }

    /// Validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Configuration` describing the first problem found.
    pub fn validate(&self) -> LdapResult<()> {
        if self.host.trim().is_empty() {
            return Err(LdapError::config("host cannot be empty"));
        }

        if self.version != 3 {
            return Err(LdapError::config(format!(
                "unsupported protocol version {}; only 3 is supported",
                self.version
            )));
        }

        if self.basedn.trim().is_empty() {
            return Err(LdapError::config("basedn cannot be empty"));
        }

        for (name, attr) in [
            ("login_attribute", &self.login_attribute),
            ("user_id_attribute", &self.user_id_attribute),
        ] {
            if !is_valid_attribute(attr) {
                return Err(LdapError::config(format!(
                    "{name} '{attr}' is not a valid attribute name"
                )));
            }
        }

        for (attr, field) in &self.user_attributes {
            if !is_valid_attribute(attr) {
                return Err(LdapError::config(format!(
                    "user_attributes key '{attr}' is not a valid attribute name"
                )));
            }
            if field.is_empty() {
                return Err(LdapError::config(format!(
                    "user_attributes maps '{attr}' to an empty field name"
                )));
            }
            if !self.use_db && (field == lad_model::user::ID_KEY || field == lad_model::user::DN_KEY)
            {
                return Err(LdapError::config(format!(
                    "user_attributes maps '{attr}' to reserved field '{field}'"
                )));
            }
        }

        self.base_filter()?;
        self.service_bind()?;

        if self.eloquent && !self.use_db {
            return Err(LdapError::config("eloquent requires use_db"));
        }

        if self.use_db {
            let table = self.user_table()?.ok_or_else(|| {
                LdapError::config("use_db requires db_table and db_field")
            })?;
            table
                .validate()
                .map_err(|e| LdapError::config(format!("invalid local table: {e}")))?;
        }

        Ok(())
    }

    /// Returns the link mode selected by `use_db` and `eloquent`.
    #[must_use]
    pub const fn link_mode(&self) -> LinkMode {
        match (self.use_db, self.eloquent) {
            (false, _) => LinkMode::Directory,
            (true, false) => LinkMode::Table,
            (true, true) => LinkMode::Model,
        }
    }

    /// Returns the connection URL, defaulting to the `ldap://` scheme.
    #[must_use]
    pub fn connection_url(&self) -> String {
        let host = self.host.trim();
        if host.contains("://") {
            host.to_string()
        } else {
            format!("ldap://{host}")
        }
    }

    /// Returns the service bind DN and password.
    ///
    /// `None` means an anonymous bind.
    ///
    /// ## Errors
    ///
    /// Fails if only some of `username`, `password` and `rdn` are set.
    pub fn service_bind(&self) -> LdapResult<Option<(String, String)>> {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        match (&self.username, &self.password, &self.rdn) {
            (Some(username), Some(password), Some(rdn))
                if present(&self.username) && present(&self.password) && present(&self.rdn) =>
            {
                Ok(Some((
                    format!("cn={},{rdn}", escape_dn_value(username)),
                    password.clone(),
                )))
            }
            _ if !present(&self.username) && !present(&self.password) && !present(&self.rdn) => {
                Ok(None)
            }
            _ => Err(LdapError::config(
                "username, password and rdn must be set together",
            )),
        }
    }

    /// Parses the base filter.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Configuration` if the filter is malformed.
    pub fn base_filter(&self) -> LdapResult<Option<Filter>> {
        match self.filter.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(text) => Filter::parse(text)
                .map(Some)
                .map_err(|e| LdapError::config(format!("invalid filter: {e}"))),
        }
    }

    /// Builds the filter used to re-resolve a user from its directory identity.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Configuration` if the base filter is malformed.
    pub fn identity_filter(&self, value: &str) -> LdapResult<Filter> {
        Ok(filter::identity_filter(
            self.base_filter()?.as_ref(),
            &self.user_id_attribute,
            value,
        ))
    }

    /// Builds the filter used to resolve a user from a login identifier.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::Configuration` if the base filter is malformed.
    pub fn login_filter(&self, identifier: &str) -> LdapResult<Filter> {
        Ok(filter::user_filter(
            self.base_filter()?.as_ref(),
            &self.login_attribute,
            identifier,
        ))
    }

    /// Describes the local user table, if `db_table` and `db_field` are set.
    ///
    /// ## Errors
    ///
    /// Fails if a configured column name is not a plain identifier.
    pub fn user_table(&self) -> LdapResult<Option<UserTable>> {
        let (Some(name), Some(field)) = (&self.db_table, &self.db_field) else {
            return Ok(None);
        };

        let columns = std::iter::once(field)
            .chain(self.user_attributes.values())
            .chain(self.db_dn_field.iter());
        let mut table = UserTable::new(name.as_str())
            .with_remember_token_column(self.remember_token_field.as_str());
        for column in columns {
            validate_identifier(column)
                .map_err(|_| LdapError::config(format!("invalid column name '{column}'")))?;
            table = table.with_column(column.as_str());
        }

        Ok(Some(table))
    }
}

// ============================================================================
// Configuration Builder
// ============================================================================

/// Builder for LDAP configuration.
#[derive(Debug, Default)]
pub struct LdapConfigBuilder {
    host: Option<String>,
    version: u8,
    starttls: bool,
    service: Option<(String, String, String)>,
    connect_timeout: Duration,
    operation_timeout: Duration,
    basedn: Option<String>,
    filter: Option<String>,
    search_scope: SearchScope,
    login_attribute: String,
    user_id_attribute: String,
    user_attributes: BTreeMap<String, String>,
    use_db: bool,
    db_table: Option<String>,
    db_field: Option<String>,
    eloquent: bool,
    remember_token_field: String,
    db_dn_field: Option<String>,
}

impl LdapConfigBuilder {
    /// Creates a new builder with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            version: default_version(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            login_attribute: default_attribute(),
            user_id_attribute: default_attribute(),
            remember_token_field: default_remember_token_field(),
            ..Default::default()
        }
    }

    /// Sets the directory host.
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Sets the protocol version.
    #[must_use]
    pub const fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Enables StartTLS.
    #[must_use]
    pub const fn starttls(mut self, enabled: bool) -> Self {
        self.starttls = enabled;
        self
    }

    /// Sets the service account.
    #[must_use]
    pub fn service_account(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
        rdn: impl Into<String>,
    ) -> Self {
        self.service = Some((username.into(), password.into(), rdn.into()));
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub const fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-operation timeout.
    #[must_use]
    pub const fn operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Sets the search base.
    #[must_use]
    pub fn basedn(mut self, dn: impl Into<String>) -> Self {
        self.basedn = Some(dn.into());
        self
    }

    /// Sets the base search filter.
    #[must_use]
    pub fn filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    /// Sets the search scope.
    #[must_use]
    pub const fn search_scope(mut self, scope: SearchScope) -> Self {
        self.search_scope = scope;
        self
    }

    /// Sets the login attribute.
    #[must_use]
    pub fn login_attribute(mut self, attr: impl Into<String>) -> Self {
        self.login_attribute = attr.into();
        self
    }

    /// Sets the identity attribute.
    #[must_use]
    pub fn user_id_attribute(mut self, attr: impl Into<String>) -> Self {
        self.user_id_attribute = attr.into();
        self
    }

    /// Projects a directory attribute onto an application field.
    #[must_use]
    pub fn user_attribute(mut self, attr: impl Into<String>, field: impl Into<String>) -> Self {
        self.user_attributes.insert(attr.into(), field.into());
        self
    }

    /// Links users to a local table.
    #[must_use]
    pub fn use_db(mut self, table: impl Into<String>, field: impl Into<String>) -> Self {
        self.use_db = true;
        self.db_table = Some(table.into());
        self.db_field = Some(field.into());
        self
    }

    /// Uses local primary keys as session identifiers.
    #[must_use]
    pub const fn eloquent(mut self, enabled: bool) -> Self {
        self.eloquent = enabled;
        self
    }

    /// Sets the remember-token column.
    #[must_use]
    pub fn remember_token_field(mut self, column: impl Into<String>) -> Self {
        self.remember_token_field = column.into();
        self
    }

    /// Sets the column receiving the entry DN on import.
    #[must_use]
    pub fn db_dn_field(mut self, column: impl Into<String>) -> Self {
        self.db_dn_field = Some(column.into());
        self
    }

    /// Builds and validates the configuration.
    ///
    /// ## Errors
    ///
    /// Returns an error if `host` or `basedn` is missing or validation fails.
    pub fn build(self) -> LdapResult<LdapConfig> {
        let (username, password, rdn) = match self.service {
            Some((u, p, r)) => (Some(u), Some(p), Some(r)),
            None => (None, None, None),
        };

        let config = LdapConfig {
            host: self
                .host
                .ok_or_else(|| LdapError::config("host is required"))?,
            version: self.version,
            starttls: self.starttls,
            username,
            password,
            rdn,
            connect_timeout: self.connect_timeout,
            operation_timeout: self.operation_timeout,
            basedn: self
                .basedn
                .ok_or_else(|| LdapError::config("basedn is required"))?,
            filter: self.filter,
            search_scope: self.search_scope,
            login_attribute: self.login_attribute,
            user_id_attribute: self.user_id_attribute,
            user_attributes: self.user_attributes,
            use_db: self.use_db,
            db_table: self.db_table,
            db_field: self.db_field,
            eloquent: self.eloquent,
            remember_token_field: self.remember_token_field,
            db_dn_field: self.db_dn_field,
        };

        config.validate()?;

        Ok(config)
    }
}
