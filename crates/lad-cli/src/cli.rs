//! CLI argument parsing.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::OutputFormat;

/// lad - LDAP authentication driver tooling.
#[derive(Debug, Parser)]
#[command(name = "lad")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file (defaults to ~/.ldap-auth/lad.toml).
    #[arg(short, long, env = "LAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output format.
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Enable verbose output.
    #[arg(short, long)]
    pub verbose: bool,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Validate the configuration.
    Check(CheckArgs),

    /// Print the search filter sent for an identifier.
    Filter(FilterArgs),

    /// Resolve an identifier to a user without checking a password.
    Lookup(LookupArgs),

    /// Run a full authentication attempt.
    Authenticate(AuthenticateArgs),
}

/// Arguments for `lad check`.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Also connect and bind to the directory.
    #[arg(long)]
    pub connect: bool,
}

/// Arguments for `lad filter`.
#[derive(Debug, Args)]
pub struct FilterArgs {
    /// Identifier to search for.
    pub identifier: String,

    /// Use the login attribute instead of the identity attribute.
    #[arg(long)]
    pub login: bool,
}

/// Arguments for `lad lookup`.
#[derive(Debug, Args)]
pub struct LookupArgs {
    /// Login identifier, or session identifier with `--by-id`.
    pub identifier: String,

    /// Resolve as a session identifier instead of a login identifier.
    #[arg(long)]
    pub by_id: bool,
}

/// Arguments for `lad authenticate`.
#[derive(Debug, Args)]
pub struct AuthenticateArgs {
    /// Login identifier.
    pub identifier: String,

    /// Read the password from the first line of stdin instead of prompting.
    #[arg(long)]
    pub password_stdin: bool,
}
