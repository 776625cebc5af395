//! # lad-model
//!
//! Domain models for the LDAP authentication driver.
//!
//! An authenticated user is either a [`TransientUser`] built from directory
//! attributes, or a [`LinkedUser`] backed by a row in the local user table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod credentials;
pub mod user;

pub use credentials::Credentials;
pub use user::{ApplicationUser, LinkedUser, LocalRecord, TransientUser};
