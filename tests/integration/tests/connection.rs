//! Provider construction and service binds.

use std::sync::Arc;

use lad_federation::UserProvider;
use lad_federation_ldap::{LdapError, LdapUserProvider};
use lad_model::Credentials;

use crate::common::{config, directory, TestEnv};

#[tokio::test]
async fn test_service_account_binds() -> anyhow::Result<()> {
    let config = config()
        .service_account("reader", "s3rvice", "ou=services,dc=example,dc=com")
        .build()?;
    let env = TestEnv::new(config).await?;

    assert_eq!(env.directory.connection_count(), 1);
    assert!(env
        .provider
        .retrieve_by_credentials(&Credentials::new("alice", ""))
        .await
        .is_some());
    Ok(())
}

#[tokio::test]
async fn test_rejected_service_account_fails_construction() -> anyhow::Result<()> {
    let config = config()
        .service_account("reader", "wrong", "ou=services,dc=example,dc=com")
        .build()?;

    let result = LdapUserProvider::connect(config, Arc::new(directory()), None).await;
    assert!(matches!(result, Err(LdapError::Bind(_))));
    Ok(())
}

#[tokio::test]
async fn test_unreachable_directory_fails_construction() -> anyhow::Result<()> {
    let directory = directory();
    directory.set_offline(true);

    let result = LdapUserProvider::connect(config().build()?, Arc::new(directory), None).await;
    let err = result.err().expect("construction should fail");
    assert!(err.is_connection_error());
    Ok(())
}

#[tokio::test]
async fn test_invalid_base_filter_is_rejected_up_front() {
    let result = config().filter("(objectClass=person").build();
    assert!(matches!(result, Err(LdapError::Configuration(msg)) if msg.contains("invalid filter")));
}

#[tokio::test]
async fn test_close_releases_service_connection() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;
    env.provider.close().await?;
    Ok(())
}
