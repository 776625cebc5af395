//! Single login attempt.
//!
//! Guards resolve a user from credentials and then validate the password
//! against that same user. [`AuthAttempt`] keeps the resolved user for the
//! length of one attempt, so a provider shared across requests never holds
//! per-request state.

use lad_model::{ApplicationUser, Credentials};

use crate::provider::UserProvider;

/// Outcome of a full login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The user was found and the secret accepted.
    Authenticated(ApplicationUser),
    /// No user could be resolved from the identifier.
    UnknownUser,
    /// A user was found but the secret was rejected.
    InvalidCredentials,
}

impl AttemptOutcome {
    /// Checks if the attempt succeeded.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// Returns the authenticated user, if any.
    #[must_use]
    pub fn into_user(self) -> Option<ApplicationUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::UnknownUser | Self::InvalidCredentials => None,
        }
    }
}

/// One login attempt against a provider.
pub struct AuthAttempt<'p, P: UserProvider> {
    provider: &'p P,
    user: Option<ApplicationUser>,
}

impl<'p, P: UserProvider> AuthAttempt<'p, P> {
    /// Starts an attempt.
    #[must_use]
    pub const fn new(provider: &'p P) -> Self {
        Self {
            provider,
            user: None,
        }
    }

    /// Resolves the user for `credentials` and keeps it for this attempt.
    pub async fn retrieve(&mut self, credentials: &Credentials) -> Option<&ApplicationUser> {
        self.user = self.provider.retrieve_by_credentials(credentials).await;
        self.user.as_ref()
    }

    /// Validates `credentials` against the user kept by [`retrieve`](Self::retrieve).
    ///
    /// Returns `false` if nothing was resolved.
    pub async fn validate(&self, credentials: &Credentials) -> bool {
        match &self.user {
            Some(user) => self.provider.validate_credentials(user, credentials).await,
            None => false,
        }
    }

    /// Returns the user resolved so far.
    #[must_use]
    pub const fn user(&self) -> Option<&ApplicationUser> {
        self.user.as_ref()
    }

    /// Ends the attempt, handing over the resolved user.
    #[must_use]
    pub fn into_user(self) -> Option<ApplicationUser> {
        self.user
    }
}

/// Runs a complete login attempt: resolve, then validate.
pub async fn authenticate<P: UserProvider>(
    provider: &P,
    credentials: &Credentials,
) -> AttemptOutcome {
    let mut attempt = AuthAttempt::new(provider);

    if attempt.retrieve(credentials).await.is_none() {
        tracing::debug!(
            provider = provider.provider_type(),
            identifier = %credentials.identifier,
            "No user resolved for login attempt"
        );
        return AttemptOutcome::UnknownUser;
    }

    if !attempt.validate(credentials).await {
        tracing::debug!(
            provider = provider.provider_type(),
            identifier = %credentials.identifier,
            "Credentials rejected"
        );
        return AttemptOutcome::InvalidCredentials;
    }

    attempt
        .into_user()
        .map_or(AttemptOutcome::UnknownUser, AttemptOutcome::Authenticated)
}
