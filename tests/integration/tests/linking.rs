//! Users linked to a local table, in table and model modes.

use lad_federation::{authenticate, UserProvider};
use lad_federation_ldap::LinkMode;
use lad_model::{ApplicationUser, Credentials, LocalRecord};

use crate::common::{table_config, TestEnv, ALICE_DN, BOB_DN};

fn login(identifier: &str) -> Credentials {
    Credentials::new(identifier, "")
}

fn linked(user: &ApplicationUser) -> &lad_model::LinkedUser {
    match user {
        ApplicationUser::Linked(linked) => linked,
        ApplicationUser::Transient(_) => panic!("expected a linked user"),
    }
}

#[tokio::test]
async fn test_first_login_imports_entry() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;
    assert_eq!(env.provider.link_mode(), LinkMode::Table);

    let user = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();
    let row = &linked(&user).record;

    assert_eq!(env.store().len(), 1);
    assert_eq!(row.get("username"), Some("alice"));
    assert_eq!(row.get("email"), Some("alice@example.com"));
    assert_eq!(row.get("name"), Some("Alice Liddell"));
    assert_eq!(row.get("ldap_dn"), Some(ALICE_DN));
    assert_eq!(row.get("remember_token"), None);
    assert_eq!(user.dn(), ALICE_DN);
    Ok(())
}

#[tokio::test]
async fn test_repeated_logins_reuse_the_row() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;

    let first = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();
    let second = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();

    assert_eq!(env.store().len(), 1);
    assert_eq!(first.local_id(), second.local_id());
    Ok(())
}

#[tokio::test]
async fn test_existing_row_is_linked_by_identity() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;
    env.store().seed(
        LocalRecord::new(42)
            .with_field("username", "bob")
            .with_field("email", "old@example.com"),
    );

    let user = env.provider.retrieve_by_credentials(&login("bob")).await.unwrap();

    assert_eq!(user.local_id(), Some(42));
    assert_eq!(user.directory_id(), "bob");
    assert_eq!(user.dn(), BOB_DN);
    // Linking does not overwrite local columns
    assert_eq!(user.attribute("email"), Some("old@example.com"));
    assert_eq!(env.store().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_table_mode_session_identifier_is_directory_identity() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;

    let user = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();
    let identifier = env.provider.auth_identifier(&user);
    assert_eq!(identifier, "alice");
    assert_eq!(env.provider.retrieve_by_id(&identifier).await, Some(user));
    Ok(())
}

#[tokio::test]
async fn test_unlinked_identity_is_not_imported_by_id() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;

    assert!(env.provider.retrieve_by_id("bob").await.is_none());
    assert!(env.store().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_model_mode_session_identifier_is_local_key() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().eloquent(true).build()?).await?;
    assert_eq!(env.provider.link_mode(), LinkMode::Model);
    env.store().seed(LocalRecord::new(7).with_field("username", "bob"));

    let user = env.provider.retrieve_by_credentials(&login("bob")).await.unwrap();
    let identifier = env.provider.auth_identifier(&user);
    assert_eq!(identifier, "7");
    assert_eq!(env.provider.retrieve_by_id(&identifier).await, Some(user));

    assert!(env.provider.retrieve_by_id("bob").await.is_none());
    assert!(env.provider.retrieve_by_id("99").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_model_mode_row_without_link_is_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().eloquent(true).build()?).await?;
    env.store().seed(LocalRecord::new(3).with_field("email", "nobody@example.com"));

    assert!(env.provider.retrieve_by_id("3").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_remember_token_updates_one_row() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;
    env.store().seed(LocalRecord::new(1).with_field("username", "bob"));

    let mut user = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();
    let alice_id = user.local_id().unwrap();

    env.provider.update_remember_token(&mut user, "token-1").await?;

    assert_eq!(env.store().save_count(), 1);
    assert_eq!(user.attribute("remember_token"), Some("token-1"));
    assert_eq!(
        env.store().get(alice_id).unwrap().get("remember_token"),
        Some("token-1")
    );
    assert_eq!(env.store().get(1).unwrap().get("remember_token"), None);
    // Other columns survive the update
    assert_eq!(env.store().get(alice_id).unwrap().get("username"), Some("alice"));
    Ok(())
}

#[tokio::test]
async fn test_remember_token_resolves_user() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;

    let mut user = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();
    env.provider.update_remember_token(&mut user, "token-1").await?;

    let remembered = env.provider.retrieve_by_token("alice", "token-1").await;
    assert_eq!(remembered, Some(user));

    assert!(env.provider.retrieve_by_token("alice", "token-2").await.is_none());
    assert!(env.provider.retrieve_by_token("alice", "TOKEN-1").await.is_none());
    assert!(env.provider.retrieve_by_token("alice", "").await.is_none());
    assert!(env.provider.retrieve_by_token("bob", "token-1").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_find_by_login_does_not_import() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;

    assert!(env.provider.find_by_login("alice").await.is_none());
    assert!(env.store().is_empty());

    let imported = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();
    let found = env.provider.find_by_login("alice").await;
    assert_eq!(found, Some(imported));
    assert!(env.provider.find_by_login("bob").await.is_none());
    assert_eq!(env.store().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_linked_user_authenticates_against_directory() -> anyhow::Result<()> {
    let env = TestEnv::new(table_config().build()?).await?;

    let user = authenticate(&env.provider, &Credentials::new("alice", "wonderland"))
        .await
        .into_user()
        .expect("alice should authenticate");
    assert_eq!(user.local_id(), Some(1));

    let denied = authenticate(&env.provider, &Credentials::new("bob", "wrong")).await;
    assert!(!denied.is_authenticated());
    // The row is imported before the password is checked
    assert_eq!(env.store().len(), 2);
    Ok(())
}
