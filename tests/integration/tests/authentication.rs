//! Full login attempts and password verification.

use lad_federation::{authenticate, AttemptOutcome, UserProvider};
use lad_model::Credentials;

use crate::common::{config, TestEnv, ALICE_DN};

#[tokio::test]
async fn test_correct_password_authenticates() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    let outcome = authenticate(&env.provider, &Credentials::new("alice", "wonderland")).await;
    let user = outcome.into_user().expect("alice should authenticate");
    assert_eq!(user.dn(), ALICE_DN);
    Ok(())
}

#[tokio::test]
async fn test_wrong_password_is_rejected() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    let outcome = authenticate(&env.provider, &Credentials::new("alice", "looking-glass")).await;
    assert_eq!(outcome, AttemptOutcome::InvalidCredentials);

    // Another user's password does not work either
    let outcome = authenticate(&env.provider, &Credentials::new("alice", "builder")).await;
    assert_eq!(outcome, AttemptOutcome::InvalidCredentials);
    Ok(())
}

#[tokio::test]
async fn test_unknown_user_is_reported_separately() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;

    let outcome = authenticate(&env.provider, &Credentials::new("mallory", "anything")).await;
    assert_eq!(outcome, AttemptOutcome::UnknownUser);
    assert!(!outcome.is_authenticated());
    Ok(())
}

#[tokio::test]
async fn test_empty_password_never_binds() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;
    let user = env
        .provider
        .retrieve_by_credentials(&Credentials::new("alice", ""))
        .await
        .unwrap();

    let binds = env.directory.bind_count();
    let valid = env
        .provider
        .validate_credentials(&user, &Credentials::new("alice", ""))
        .await;

    assert!(!valid);
    assert_eq!(env.directory.bind_count(), binds);
    Ok(())
}

#[tokio::test]
async fn test_password_check_uses_a_separate_connection() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;
    let user = env
        .provider
        .retrieve_by_credentials(&Credentials::new("bob", ""))
        .await
        .unwrap();

    let connections = env.directory.connection_count();
    assert!(
        env.provider
            .validate_credentials(&user, &Credentials::new("bob", "builder"))
            .await
    );
    assert_eq!(env.directory.connection_count(), connections + 1);

    // The service connection keeps working after the user bind
    assert!(env
        .provider
        .retrieve_by_credentials(&Credentials::new("alice", ""))
        .await
        .is_some());
    Ok(())
}

#[tokio::test]
async fn test_outage_during_password_check_rejects() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;
    let user = env
        .provider
        .retrieve_by_credentials(&Credentials::new("alice", ""))
        .await
        .unwrap();

    env.directory.set_offline(true);
    let valid = env
        .provider
        .validate_credentials(&user, &Credentials::new("alice", "wonderland"))
        .await;
    assert!(!valid);
    Ok(())
}

#[tokio::test]
async fn test_transient_users_have_no_remember_token() -> anyhow::Result<()> {
    let env = TestEnv::new(config().build()?).await?;
    let mut user = env
        .provider
        .retrieve_by_id("alice")
        .await
        .expect("alice should resolve");
    let before = user.clone();

    env.provider.update_remember_token(&mut user, "token-1").await?;
    assert_eq!(user, before);
    assert!(env.provider.retrieve_by_token("alice", "token-1").await.is_none());
    Ok(())
}
