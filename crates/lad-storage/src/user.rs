//! User store trait.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lad_model::LocalRecord;

use crate::error::StorageResult;
use crate::table::UserTable;

/// Storage for local user rows.
///
/// A store is bound to one [`UserTable`]. Implementations must be thread-safe
/// and support concurrent access.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Returns the table this store reads and writes.
    fn table(&self) -> &UserTable;

    /// Gets a row by primary key.
    async fn find_by_id(&self, id: i64) -> StorageResult<Option<LocalRecord>>;

    /// Gets the first row (by primary key) whose `column` equals `value`.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::UnknownColumn` if the column is not part of the
    /// table.
    async fn find_where(&self, column: &str, value: &str) -> StorageResult<Option<LocalRecord>>;

    /// Inserts a row and returns it with its new primary key.
    ///
    /// Columns of the table missing from `fields` are stored as null.
    async fn insert(&self, fields: &BTreeMap<String, String>) -> StorageResult<LocalRecord>;

    /// Writes every loaded column of `record` back to its row.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::NotFound` if no row has the record's primary key.
    async fn save(&self, record: &LocalRecord) -> StorageResult<()>;
}
