//! Output formatting utilities.

use colored::Colorize;
use lad_model::ApplicationUser;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::config::OutputFormat;

/// Prints a success message.
pub fn success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Prints an error message.
pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Prints a warning message.
pub fn warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow().bold(), message);
}

/// Prints an info message.
pub fn info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// A name/value line of a detail view.
#[derive(Debug, Clone, PartialEq, Eq, Tabled, Serialize)]
pub struct FieldRow {
    /// Field name.
    pub field: String,
    /// Field value.
    pub value: String,
}

impl FieldRow {
    /// Creates a row.
    #[must_use]
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// Outputs name/value rows as a table or a JSON object.
pub fn output_fields(rows: &[FieldRow], format: OutputFormat) -> crate::CliResult<()> {
    match format {
        OutputFormat::Table => {
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }
        OutputFormat::Json => {
            let object: serde_json::Map<String, serde_json::Value> = rows
                .iter()
                .map(|row| (row.field.clone(), serde_json::Value::String(row.value.clone())))
                .collect();
            println!("{}", serde_json::to_string_pretty(&object)?);
        }
    }
    Ok(())
}

/// Describes a resolved user. The remember token is masked.
#[must_use]
pub fn user_rows(user: &ApplicationUser, remember_token_field: &str) -> Vec<FieldRow> {
    let mut rows = Vec::new();

    match user {
        ApplicationUser::Transient(transient) => {
            rows.push(FieldRow::new("kind", "transient"));
            rows.push(FieldRow::new("dn", transient.dn()));
            rows.push(FieldRow::new("id", transient.id()));
            rows.extend(
                transient
                    .attributes()
                    .iter()
                    .filter(|(key, _)| !matches!(key.as_str(), "id" | "dn"))
                    .map(|(key, value)| FieldRow::new(key.as_str(), value.as_str())),
            );
        }
        ApplicationUser::Linked(linked) => {
            rows.push(FieldRow::new("kind", "linked"));
            rows.push(FieldRow::new("dn", linked.dn.as_str()));
            rows.push(FieldRow::new("directory_id", linked.directory_id.as_str()));
            rows.push(FieldRow::new("local_id", linked.record.id.to_string()));
            rows.extend(linked.record.fields.iter().map(|(column, value)| {
                let shown = match value {
                    None => "(null)",
                    Some(_) if column == remember_token_field => "****",
                    Some(value) => value.as_str(),
                };
                FieldRow::new(column.as_str(), shown)
            }));
        }
    }

    rows
}

/// Prompts for password input (hidden).
pub fn prompt_password(prompt: &str) -> crate::CliResult<String> {
    Ok(rpassword::prompt_password(prompt)?)
}
