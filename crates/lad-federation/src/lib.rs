//! # lad-federation
//!
//! The contract between a host framework's authentication guard and a user
//! provider backed by an external identity store.
//!
//! - [`UserProvider`]: the entry points a guard calls (lookup by id, by
//!   remember token, by credentials, password validation, token update).
//! - [`AuthAttempt`]: keeps the user resolved during one login attempt so the
//!   password check runs against the same entry.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod attempt;
pub mod error;
pub mod provider;

pub use attempt::{authenticate, AttemptOutcome, AuthAttempt};
pub use error::{FederationError, FederationResult};
pub use provider::UserProvider;
