//! `lad authenticate`: run a full login attempt.

use std::io::BufRead;

use lad_federation::{authenticate, AttemptOutcome, UserProvider};
use lad_model::Credentials;

use crate::cli::AuthenticateArgs;
use crate::config::OutputFormat;
use crate::output::{error, output_fields, prompt_password, success, user_rows};
use crate::CliConfig;

/// Runs the authenticate command.
pub async fn run_authenticate(
    args: AuthenticateArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    let password = if args.password_stdin {
        read_password(std::io::stdin().lock())?
    } else {
        prompt_password(&format!("Password for {}: ", args.identifier))?
    };

    let provider = super::connect_provider(config).await?;
    let credentials = Credentials::new(args.identifier.as_str(), password);
    let outcome = authenticate(&provider, &credentials).await;
    provider.close().await?;

    match outcome {
        AttemptOutcome::Authenticated(user) => {
            success(&format!("Authenticated {}", user.dn()));
            output_fields(&user_rows(&user, &config.ldap.remember_token_field), format)
        }
        AttemptOutcome::UnknownUser => {
            error(&format!("No unique directory entry for '{}'", args.identifier));
            Err(crate::CliError::Denied)
        }
        AttemptOutcome::InvalidCredentials => {
            error("Password rejected by the directory");
            Err(crate::CliError::Denied)
        }
    }
}

/// Reads the first line of `input`, without its line ending.
fn read_password(mut input: impl BufRead) -> crate::CliResult<String> {
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
