//! # lad-storage-sql
//!
//! SQLx-based user store for the LDAP authentication driver.
//!
//! This crate provides `PostgreSQL` storage using `SQLx`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod pool;
pub mod user;

pub use pool::{create_pool, PoolConfig};
pub use user::PgUserStore;
