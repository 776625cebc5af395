//! `lad filter`: show the search filter for an identifier.

use crate::cli::FilterArgs;
use crate::CliConfig;

/// Runs the filter command.
pub fn run_filter(args: FilterArgs, config: &CliConfig) -> crate::CliResult<()> {
    println!("{}", render(&args, config)?);
    Ok(())
}

fn render(args: &FilterArgs, config: &CliConfig) -> crate::CliResult<String> {
    let filter = if args.login {
        config.ldap.login_filter(&args.identifier)?
    } else {
        config.ldap.identity_filter(&args.identifier)?
    };
    Ok(filter.to_string())
}
