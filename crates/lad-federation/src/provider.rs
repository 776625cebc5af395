//! User provider trait.
//!
//! A host framework's authentication guard drives a provider through four
//! entry points: lookup by identifier, lookup by "remember me" token, lookup
//! by login credentials, and password validation. Every lookup failure is
//! reported as a missing user and every validation failure as `false`;
//! providers log the cause server-side.

use lad_model::{ApplicationUser, Credentials};

use crate::error::FederationResult;

// ============================================================================
// User Provider
// ============================================================================

/// Trait for user providers backed by an external identity store.
///
/// ## Implementation Notes
///
/// - Providers are shared between concurrent requests (Send + Sync)
/// - All operations are async to support network I/O
/// - Lookups never fail from the caller's point of view
#[allow(async_fn_in_trait)]
pub trait UserProvider: Send + Sync {
    /// Returns the provider type identifier.
    fn provider_type(&self) -> &'static str;

    /// Returns the identifier the guard stores in the session for `user`.
    ///
    /// Passing it back to [`retrieve_by_id`](Self::retrieve_by_id) resolves
    /// the same user.
    fn auth_identifier(&self, user: &ApplicationUser) -> String;

    /// Resolves a user from a session identifier.
    async fn retrieve_by_id(&self, identifier: &str) -> Option<ApplicationUser>;

    /// Resolves a user from a session identifier and "remember me" token.
    ///
    /// The token must equal the stored one exactly.
    async fn retrieve_by_token(&self, identifier: &str, token: &str) -> Option<ApplicationUser>;

    /// Resolves a user from login credentials.
    ///
    /// Only the identifier is used; the secret is checked later by
    /// [`validate_credentials`](Self::validate_credentials).
    async fn retrieve_by_credentials(&self, credentials: &Credentials) -> Option<ApplicationUser>;

    /// Checks the secret in `credentials` against `user`.
    async fn validate_credentials(&self, user: &ApplicationUser, credentials: &Credentials)
        -> bool;

    /// Persists a new "remember me" token for `user`.
    ///
    /// Users without local storage are left untouched.
    async fn update_remember_token(
        &self,
        user: &mut ApplicationUser,
        token: &str,
    ) -> FederationResult<()>;

    /// Releases resources held by the provider.
    async fn close(&self) -> FederationResult<()> {
        Ok(())
    }
}
