//! Local user table description.
//!
//! Table and column names come from configuration and end up interpolated
//! into SQL, so they are restricted to plain identifiers.

use crate::error::{StorageError, StorageResult};

/// Default remember-token column.
pub const DEFAULT_REMEMBER_TOKEN_COLUMN: &str = "remember_token";

/// Describes the table holding linked users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserTable {
    /// Table name.
    pub name: String,
    /// Primary key column (an integer).
    pub primary_key: String,
    /// Text columns the driver reads and writes.
    pub columns: Vec<String>,
    /// Column storing the "remember me" token.
    pub remember_token_column: String,
}

impl UserTable {
    /// Creates a table description with an `id` primary key and a
    /// `remember_token` column.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let remember = DEFAULT_REMEMBER_TOKEN_COLUMN.to_string();
        Self {
            name: name.into(),
            primary_key: "id".to_string(),
            columns: vec![remember.clone()],
            remember_token_column: remember,
        }
    }

    /// Adds a column, ignoring duplicates.
    #[must_use]
    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        if !self.columns.contains(&column) {
            self.columns.push(column);
        }
        self
    }

    /// Sets the remember-token column.
    #[must_use]
    pub fn with_remember_token_column(mut self, column: impl Into<String>) -> Self {
        let column = column.into();
        self.columns.retain(|c| c != &self.remember_token_column);
        self.remember_token_column = column.clone();
        self.with_column(column)
    }

    /// Checks if a column belongs to the table (the primary key excluded).
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Fails with [`StorageError::UnknownColumn`] unless the column belongs to
    /// the table.
    pub fn require_column(&self, column: &str) -> StorageResult<()> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(StorageError::UnknownColumn(column.to_string()))
        }
    }

    /// Validates every identifier in the description.
    pub fn validate(&self) -> StorageResult<()> {
        validate_identifier(&self.name)?;
        validate_identifier(&self.primary_key)?;
        for column in &self.columns {
            validate_identifier(column)?;
            if column == &self.primary_key {
                return Err(StorageError::InvalidData(format!(
                    "column '{column}' is the primary key"
                )));
            }
        }
        Ok(())
    }
}

/// Checks that a name matches `[A-Za-z_][A-Za-z0-9_]*`.
pub fn validate_identifier(name: &str) -> StorageResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidIdentifier(name.to_string()))
    }
}
