//! Login credentials supplied at authentication time.

use std::fmt;

/// A login identifier and its plaintext secret.
///
/// Credentials are never persisted. The `Debug` output redacts the secret so
/// that credentials can appear in log fields safely.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Value of the directory login attribute (e.g. a `uid`).
    pub identifier: String,
    /// Plaintext password.
    pub secret: String,
}

impl Credentials {
    /// Creates a new credential pair.
    #[must_use]
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Returns true if the secret is empty.
    ///
    /// An empty secret must never reach a directory bind: most servers treat
    /// a DN with an empty password as an unauthenticated bind and report
    /// success.
    #[must_use]
    pub fn has_empty_secret(&self) -> bool {
        self.secret.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}
