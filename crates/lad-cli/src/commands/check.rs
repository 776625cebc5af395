//! `lad check`: configuration validation.

use lad_federation::UserProvider;

use crate::cli::CheckArgs;
use crate::config::{mask_password, OutputFormat};
use crate::output::{info, output_fields, success, warning, FieldRow};
use crate::CliConfig;

/// Runs the check command.
pub async fn run_check(
    args: CheckArgs,
    config: &CliConfig,
    format: OutputFormat,
) -> crate::CliResult<()> {
    config.ldap.validate()?;

    output_fields(&summary(config), format)?;

    if config.ldap.service_bind()?.is_none() {
        warning("No service account configured; searches bind anonymously");
    }

    if args.connect {
        info(&format!("Connecting to {}...", config.ldap.connection_url()));
        let provider = super::connect_provider(config).await?;
        provider.close().await?;
        success("Directory bind succeeded");
    } else {
        success("Configuration is valid");
    }

    Ok(())
}

/// Describes the effective configuration with secrets masked.
fn summary(config: &CliConfig) -> Vec<FieldRow> {
    let ldap = &config.ldap;
    let mut rows = vec![
        FieldRow::new("url", ldap.connection_url()),
        FieldRow::new("starttls", ldap.starttls.to_string()),
        FieldRow::new("basedn", ldap.basedn.as_str()),
        FieldRow::new("scope", format!("{:?}", ldap.search_scope)),
        FieldRow::new("filter", ldap.filter.as_deref().unwrap_or("(none)")),
        FieldRow::new("login_attribute", ldap.login_attribute.as_str()),
        FieldRow::new("user_id_attribute", ldap.user_id_attribute.as_str()),
        FieldRow::new("link_mode", ldap.link_mode().to_string()),
    ];

    let service = match (&ldap.username, &ldap.rdn) {
        (Some(username), Some(rdn)) => format!("cn={username},{rdn} (password ****)"),
        _ => "anonymous".to_string(),
    };
    rows.push(FieldRow::new("service_account", service));

    for (attr, field) in &ldap.user_attributes {
        rows.push(FieldRow::new(format!("attribute {attr}"), field.as_str()));
    }

    if ldap.use_db {
        rows.push(FieldRow::new(
            "table",
            format!(
                "{}.{}",
                ldap.db_table.as_deref().unwrap_or_default(),
                ldap.db_field.as_deref().unwrap_or_default()
            ),
        ));
        if let Some(database) = &config.database {
            rows.push(FieldRow::new("database", mask_password(&database.url)));
        }
    }

    rows
}
