//! Resolving directory entries into transient users.

use lad_federation::UserProvider;
use lad_federation_ldap::{InMemoryDirectory, LdapEntry};
use lad_model::{ApplicationUser, Credentials};

use crate::common::{config, TestEnv, ALICE_DN};

fn login(identifier: &str) -> Credentials {
    Credentials::new(identifier, "")
}

#[tokio::test]
async fn test_login_resolves_unique_entry() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    let user = env
        .provider
        .retrieve_by_credentials(&login("alice"))
        .await
        .expect("alice should resolve");

    let ApplicationUser::Transient(transient) = &user else {
        panic!("expected a transient user, got {user:?}");
    };
    assert_eq!(transient.id(), "alice");
    assert_eq!(transient.dn(), ALICE_DN);
    assert_eq!(transient.get("email"), Some("alice@example.com"));
    assert_eq!(transient.get("name"), Some("Alice Liddell"));
    Ok(())
}

#[tokio::test]
async fn test_missing_attribute_is_not_projected() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    let user = env.provider.retrieve_by_credentials(&login("bob")).await.unwrap();
    assert_eq!(user.attribute("email"), Some("bob@example.com"));
    assert_eq!(user.attribute("name"), None);
    Ok(())
}

#[tokio::test]
async fn test_unknown_login_is_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    assert!(env.provider.retrieve_by_credentials(&login("mallory")).await.is_none());
    assert!(env.provider.retrieve_by_id("mallory").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_ambiguous_login_is_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new(config().login_attribute("mail").build()?).await?;

    assert!(env
        .provider
        .retrieve_by_credentials(&login("shared@example.com"))
        .await
        .is_none());

    let alice = env
        .provider
        .retrieve_by_credentials(&login("alice@example.com"))
        .await;
    assert_eq!(alice.map(|u| u.dn().to_string()), Some(ALICE_DN.to_string()));
    Ok(())
}

#[tokio::test]
async fn test_base_filter_excludes_entries() -> anyhow::Result<()> {
    let filtered = TestEnv::new(config().build()?).await?;
    assert!(filtered.provider.retrieve_by_credentials(&login("printer")).await.is_none());

    let unfiltered = TestEnv::new(
        lad_federation_ldap::LdapConfig::builder()
            .host("ldap.example.com")
            .basedn("dc=example,dc=com")
            .build()?,
    )
    .await?;
    assert!(unfiltered.provider.retrieve_by_credentials(&login("printer")).await.is_some());
    Ok(())
}

#[tokio::test]
async fn test_special_characters_match_literally() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    for identifier in ["*", "a*", "alice)(uid=*", "*)(objectClass=*", "alice\\"] {
        assert!(
            env.provider.retrieve_by_credentials(&login(identifier)).await.is_none(),
            "identifier {identifier:?} should not match anything"
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_empty_identifier_is_not_searched() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;
    let searches = env.directory.search_count();

    assert!(env.provider.retrieve_by_credentials(&login("")).await.is_none());
    assert_eq!(env.directory.search_count(), searches);
    Ok(())
}

#[tokio::test]
async fn test_session_identifier_round_trips() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    let user = env.provider.retrieve_by_credentials(&login("alice")).await.unwrap();
    let identifier = env.provider.auth_identifier(&user);
    assert_eq!(identifier, "alice");

    let again = env.provider.retrieve_by_id(&identifier).await;
    assert_eq!(again, Some(user));
    Ok(())
}

#[tokio::test]
async fn test_login_and_identity_attributes_can_differ() -> anyhow::Result<()> {
    let env = TestEnv::new(config().login_attribute("mail").build()?).await?;

    let user = env
        .provider
        .retrieve_by_credentials(&login("bob@example.com"))
        .await
        .unwrap();
    assert_eq!(env.provider.auth_identifier(&user), "bob");
    assert!(env.provider.retrieve_by_id("bob@example.com").await.is_none());
    assert_eq!(env.provider.retrieve_by_id("bob").await, Some(user));
    Ok(())
}

#[tokio::test]
async fn test_directory_outage_yields_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;
    env.directory.set_offline(true);

    assert!(env.provider.retrieve_by_credentials(&login("alice")).await.is_none());
    assert!(env.provider.retrieve_by_id("alice").await.is_none());
    Ok(())
}

#[tokio::test]
async fn test_binary_identity_round_trips() -> anyhow::Result<()> {
    let dn = "CN=Alice,OU=Users,DC=example,DC=com";
    let guid: Vec<u8> = (1..=16).collect();
    let directory = InMemoryDirectory::new();
    directory.add_entry(
        LdapEntry::new(dn)
            .with_attr("objectClass", ["person"])
            .with_attr("sAMAccountName", ["alice"])
            .with_binary_attr("objectGUID", guid),
    );
    let config = config()
        .login_attribute("sAMAccountName")
        .user_id_attribute("objectGUID")
        .build()?;
    let env = TestEnv::with_directory(config, directory).await?;

    let user = env
        .provider
        .retrieve_by_credentials(&login("alice"))
        .await
        .expect("alice should resolve");
    let identifier = env.provider.auth_identifier(&user);
    assert_eq!(identifier, "04030201-0605-0807-090a-0b0c0d0e0f10");

    let again = env.provider.retrieve_by_id(&identifier).await;
    assert_eq!(again.as_ref().map(ApplicationUser::dn), Some(dn));
    assert_eq!(again, Some(user));
    assert!(env.provider.retrieve_by_id("alice").await.is_none());
    Ok(())
}
