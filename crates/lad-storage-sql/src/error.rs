//! SQL storage error mapping.

use lad_storage::StorageError;
use sqlx::Error as SqlxError;

/// Converts a `SQLx` error to a storage error.
#[allow(clippy::needless_pass_by_value)]
pub fn from_sqlx_error(err: SqlxError) -> StorageError {
    match err {
        SqlxError::RowNotFound => StorageError::Internal("Row not found".to_string()),
        SqlxError::Database(db_err) => {
            // 23505: unique_violation
            if db_err.code().is_some_and(|c| c == "23505") {
                StorageError::Duplicate(db_err.message().to_string())
            } else {
                StorageError::Query(db_err.to_string())
            }
        }
        SqlxError::ColumnNotFound(column) => StorageError::UnknownColumn(column),
        SqlxError::ColumnDecode { index, source } => {
            StorageError::InvalidData(format!("column {index}: {source}"))
        }
        SqlxError::PoolTimedOut => StorageError::Connection("Connection pool timeout".to_string()),
        SqlxError::PoolClosed => StorageError::Connection("Connection pool closed".to_string()),
        SqlxError::Io(e) => StorageError::Connection(e.to_string()),
        _ => StorageError::Internal(err.to_string()),
    }
}
