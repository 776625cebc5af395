//! CLI configuration.
//!
//! A TOML file with an `[ldap]` section (the driver options) and an optional
//! `[database]` section for the local user table. Secrets can be supplied
//! through the environment instead of the file.

use std::path::{Path, PathBuf};

use lad_federation_ldap::LdapConfig;
use serde::{Deserialize, Serialize};

/// Environment variable overriding the service account password.
pub const LDAP_PASSWORD_ENV: &str = "LAD_LDAP_PASSWORD";

/// Environment variable overriding the database URL.
pub const DATABASE_URL_ENV: &str = "LAD_DATABASE_URL";

/// CLI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CliConfig {
    /// Driver options.
    pub ldap: LdapConfig,

    /// Local user database.
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
}

/// Local user database settings.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    #[serde(skip_serializing)]
    pub url: String,

    /// Maximum pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &mask_password(&self.url))
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

impl CliConfig {
    /// Loads configuration from `path`, or from the default location.
    ///
    /// Environment overrides are applied after parsing.
    pub fn load(path: Option<&Path>) -> crate::CliResult<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            return Err(crate::CliError::Config(format!(
                "configuration file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(&config_path)?;
        let mut config = Self::from_toml(&content)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Parses configuration from TOML.
    pub fn from_toml(content: &str) -> crate::CliResult<Self> {
        toml::from_str(content)
            .map_err(|e| crate::CliError::Config(format!("failed to parse config: {e}")))
    }

    /// Replaces secrets with values from the environment, when set.
    pub fn apply_env_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(password) = var(LDAP_PASSWORD_ENV) {
            self.ldap.password = Some(password);
        }

        if let Some(url) = var(DATABASE_URL_ENV) {
            match &mut self.database {
                Some(database) => database.url = url,
                None => {
                    self.database = Some(DatabaseConfig {
                        url,
                        max_connections: default_max_connections(),
                    });
                }
            }
        }
    }

    /// Gets the default configuration file path.
    pub fn config_path() -> crate::CliResult<PathBuf> {
        let home = dirs_next::home_dir().ok_or_else(|| {
            crate::CliError::Config("could not determine home directory".to_string())
        })?;
        Ok(home.join(".ldap-auth").join("lad.toml"))
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

/// Masks the password in a connection URL.
#[must_use]
pub fn mask_password(url: &str) -> String {
    if let Some(at_pos) = url.rfind('@') {
        let protocol_end = url.find("://").map_or(0, |p| p + 3);
        if let Some(colon_pos) = url[..at_pos].rfind(':') {
            if colon_pos > protocol_end {
                return format!("{}:****{}", &url[..colon_pos], &url[at_pos..]);
            }
        }
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [ldap]
        host = "ldap.example.com"
        basedn = "ou=people,dc=example,dc=com"
        filter = "(objectClass=inetOrgPerson)"
        username = "reader"
        rdn = "ou=services,dc=example,dc=com"
        use_db = true
        db_table = "users"
        db_field = "username"

        [ldap.user_attributes]
        mail = "email"

        [database]
        url = "postgres://app:secret@db/app"
    "#;

    #[test]
    fn parses_sections() {
        let config = CliConfig::from_toml(SAMPLE).unwrap();

        assert_eq!(config.ldap.host, "ldap.example.com");
        assert!(config.ldap.use_db);
        assert_eq!(config.ldap.password, None);
        let database = config.database.unwrap();
        assert_eq!(database.max_connections, 5);
    }

    #[test]
    fn environment_supplies_secrets() {
        let mut config = CliConfig::from_toml(SAMPLE).unwrap();
        config.apply_env_overrides(|name| match name {
            LDAP_PASSWORD_ENV => Some("reader-pw".to_string()),
            DATABASE_URL_ENV => Some("postgres://other/app".to_string()),
            _ => None,
        });

        assert_eq!(config.ldap.password.as_deref(), Some("reader-pw"));
        assert!(config.ldap.validate().is_ok());
        assert_eq!(config.database.unwrap().url, "postgres://other/app");
    }

    #[test]
    fn database_section_created_from_environment() {
        let mut config = CliConfig::from_toml(
            "[ldap]\nhost = \"ldap\"\nbasedn = \"dc=example\"\n",
        )
        .unwrap();
        assert!(config.database.is_none());

        config.apply_env_overrides(|name| {
            (name == DATABASE_URL_ENV).then(|| "postgres://db/app".to_string())
        });
        assert_eq!(config.database.unwrap().url, "postgres://db/app");
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = CliConfig::load(Some(Path::new("/nonexistent/lad.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn rejects_unparseable_config() {
        assert!(CliConfig::from_toml("[ldap]\nhost = 3\n").is_err());
    }

    #[test]
    fn masks_database_password() {
        assert_eq!(
            mask_password("postgres://app:secret@db/app"),
            "postgres://app:****@db/app"
        );
        assert_eq!(mask_password("postgres://db/app"), "postgres://db/app");

        let database = DatabaseConfig {
            url: "postgres://app:secret@db/app".to_string(),
            max_connections: 5,
        };
        assert!(!format!("{database:?}").contains("secret"));
    }
}
