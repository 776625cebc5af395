//! End-to-end tests for the LDAP user provider.
//!
//! These run the provider against an in-memory directory and an in-memory
//! local user table.

mod common;
mod authentication;
mod connection;
mod linking;
mod resolution;
