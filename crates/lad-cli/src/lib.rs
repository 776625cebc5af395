//! # lad-cli
//!
//! Operator tooling for the LDAP authentication driver:
//! - Validate a driver configuration
//! - Show the search filter a login would send
//! - Look up how an identifier resolves
//! - Run a full authentication attempt

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;

pub use cli::Cli;
pub use config::CliConfig;
pub use error::{CliError, CliResult};
