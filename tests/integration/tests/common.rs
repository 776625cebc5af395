//! Common test utilities and fixtures.

use std::sync::Arc;

use lad_federation_ldap::{InMemoryDirectory, LdapConfig, LdapConfigBuilder, LdapEntry, LdapUserProvider};
use lad_storage::{InMemoryUserStore, UserStore};

pub const ALICE_DN: &str = "uid=alice,ou=people,dc=example,dc=com";
pub const BOB_DN: &str = "uid=bob,ou=people,dc=example,dc=com";
pub const SERVICE_DN: &str = "cn=reader,ou=services,dc=example,dc=com";

/// Test environment wiring a provider to in-memory backends.
pub struct TestEnv {
    /// Directory the provider talks to.
    pub directory: InMemoryDirectory,
    /// Local user table, present when the configuration links users.
    pub store: Option<Arc<InMemoryUserStore>>,
    /// Provider under test.
    pub provider: LdapUserProvider,
}

impl TestEnv {
    /// Creates an environment over the standard directory.
    pub async fn new(config: LdapConfig) -> anyhow::Result<Self> {
        Self::with_directory(config, directory()).await
    }

    /// Creates an environment over the given directory.
    pub async fn with_directory(
        config: LdapConfig,
        directory: InMemoryDirectory,
    ) -> anyhow::Result<Self> {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("lad_federation_ldap=debug,lad_federation=debug")
            .with_test_writer()
            .try_init();

        let store = match config.user_table()? {
            Some(table) if config.use_db => Some(Arc::new(InMemoryUserStore::new(table))),
            _ => None,
        };
        let provider = LdapUserProvider::connect(
            config,
            Arc::new(directory.clone()),
            store.clone().map(|s| s as Arc<dyn UserStore>),
        )
        .await?;

        Ok(Self {
            directory,
            store,
            provider,
        })
    }

    /// Returns the local user table.
    pub fn store(&self) -> &InMemoryUserStore {
        self.store.as_deref().expect("configuration does not link users")
    }
}

/// Base configuration: people only, e-mail projected onto `email`.
pub fn config() -> LdapConfigBuilder {
    LdapConfig::builder()
        .host("ldap.example.com")
        .basedn("dc=example,dc=com")
        .filter("(objectClass=person)")
        .user_attribute("mail", "email")
        .user_attribute("cn", "name")
}

/// Configuration linking users to a `users` table through `username`.
pub fn table_config() -> LdapConfigBuilder {
    config().use_db("users", "username").db_dn_field("ldap_dn")
}

/// Directory with two people, a pair sharing an e-mail address and a
/// device that also carries a `uid`.
pub fn directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();

    directory.add_entry(
        LdapEntry::new(ALICE_DN)
            .with_attr("objectClass", ["top", "person"])
            .with_attr("uid", ["alice"])
            .with_attr("cn", ["Alice Liddell"])
            .with_attr("mail", ["alice@example.com"]),
    );
    directory.set_password(ALICE_DN, "wonderland");

    directory.add_entry(
        LdapEntry::new(BOB_DN)
            .with_attr("objectClass", ["person"])
            .with_attr("uid", ["bob"])
            .with_attr("mail", ["bob@example.com"]),
    );
    directory.set_password(BOB_DN, "builder");

    directory.add_entry(
        LdapEntry::new("uid=carol,ou=people,dc=example,dc=com")
            .with_attr("objectClass", ["person"])
            .with_attr("uid", ["carol"])
            .with_attr("mail", ["shared@example.com"]),
    );
    directory.add_entry(
        LdapEntry::new("uid=dave,ou=staff,ou=people,dc=example,dc=com")
            .with_attr("objectClass", ["person"])
            .with_attr("uid", ["dave"])
            .with_attr("mail", ["shared@example.com"]),
    );

    directory.add_entry(
        LdapEntry::new("uid=printer,ou=devices,dc=example,dc=com")
            .with_attr("objectClass", ["device"])
            .with_attr("uid", ["printer"])
            .with_attr("mail", ["printer@example.com"]),
    );
    directory.set_password("uid=printer,ou=devices,dc=example,dc=com", "toner");

    directory.add_entry(
        LdapEntry::new(SERVICE_DN)
            .with_attr("objectClass", ["applicationProcess"])
            .with_attr("cn", ["reader"]),
    );
    directory.set_password(SERVICE_DN, "s3rvice");

    directory
}
