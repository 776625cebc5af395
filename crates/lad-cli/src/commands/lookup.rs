//! `lad lookup`: resolve an identifier without a password check.
//!
//! Lookups are read-only: an entry with no linked local row is reported as
//! not found instead of being imported.

use lad_federation::UserProvider;
use lad_federation_ldap::LdapUserProvider;
use lad_model::ApplicationUser;

use crate::cli::LookupArgs;
use crate::config::OutputFormat;
use crate::output::{output_fields, user_rows};
use crate::CliConfig;

/// Runs the lookup command.
pub async fn run_lookup(
    args: LookupArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let provider = super::connect_provider(config).await?;
    let user = resolve(&provider, &args).await;
    provider.close().await?;

    let user = user.ok_or_else(|| crate::CliError::NotFound(args.identifier.clone()))?;
    output_fields(&user_rows(&user, &config.ldap.remember_token_field), format)
}

async fn resolve(provider: &LdapUserProvider, args: &LookupArgs) -> Option<ApplicationUser> {
    if args.by_id {
        provider.retrieve_by_id(&args.identifier).await
    } else {
        provider.find_by_login(&args.identifier).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use lad_federation_ldap::{InMemoryDirectory, LdapConfig, LdapEntry};
    use lad_model::LocalRecord;
    use lad_storage::{InMemoryUserStore, UserStore};

    use super::*;

    const ALICE_DN: &str = "uid=alice,ou=people,dc=example,dc=com";

    async fn linked_provider() -> (LdapUserProvider, Arc<InMemoryUserStore>) {
        let directory = InMemoryDirectory::new();
        directory.add_entry(
            LdapEntry::new(ALICE_DN)
                .with_attr("objectClass", ["person"])
                .with_attr("uid", ["alice"]),
        );

        let config = LdapConfig::builder()
            .host("ldap.example.com")
            .basedn("dc=example,dc=com")
            .filter("(objectClass=person)")
            .use_db("users", "username")
            .build()
            .unwrap();
        let store = Arc::new(InMemoryUserStore::new(config.user_table().unwrap().unwrap()));
        let dyn_store: Arc<dyn UserStore> = store.clone();
        let provider = LdapUserProvider::connect(config, Arc::new(directory), Some(dyn_store))
            .await
            .unwrap();
        (provider, store)
    }

    fn args(identifier: &str, by_id: bool) -> LookupArgs {
        LookupArgs {
            identifier: identifier.to_string(),
            by_id,
        }
    }

    #[tokio::test]
    async fn lookup_leaves_store_unchanged() {
        let (provider, store) = linked_provider().await;

        assert!(resolve(&provider, &args("alice", false)).await.is_none());
        assert!(resolve(&provider, &args("alice", true)).await.is_none());
        assert!(store.is_empty());
        assert_eq!(store.save_count(), 0);
    }

    #[tokio::test]
    async fn lookup_finds_linked_user() {
        let (provider, store) = linked_provider().await;
        store.seed(LocalRecord::new(4).with_field("username", "alice"));

        let user = resolve(&provider, &args("alice", false)).await.unwrap();
        assert_eq!(user.dn(), ALICE_DN);
        assert_eq!(user.local_id(), Some(4));
        assert_eq!(store.len(), 1);
    }
}
