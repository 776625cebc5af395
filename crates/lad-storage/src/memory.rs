//! In-memory user store.
//!
//! Behaves like a single SQL table with an auto-incrementing primary key.
//! Intended for tests and local demos.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use lad_model::LocalRecord;
use parking_lot::RwLock;

use crate::error::{StorageError, StorageResult};
use crate::table::UserTable;
use crate::user::UserStore;

/// In-memory [`UserStore`].
#[derive(Debug)]
pub struct InMemoryUserStore {
    table: UserTable,
    rows: RwLock<BTreeMap<i64, LocalRecord>>,
    saves: AtomicUsize,
}

impl InMemoryUserStore {
    /// Creates an empty store for the given table.
    #[must_use]
    pub fn new(table: UserTable) -> Self {
        Self {
            table,
            rows: RwLock::new(BTreeMap::new()),
            saves: AtomicUsize::new(0),
        }
    }

    /// Inserts a row as-is, keeping its primary key.
    ///
    /// Columns outside the table are dropped; missing ones are stored as null.
    pub fn seed(&self, record: LocalRecord) {
        let row = self.normalize(record.id, |column| {
            record.fields.get(column).cloned().flatten()
        });
        self.rows.write().insert(row.id, row);
    }

    /// Returns a copy of a row.
    #[must_use]
    pub fn get(&self, id: i64) -> Option<LocalRecord> {
        self.rows.read().get(&id).cloned()
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    /// Returns true if the store has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Returns how many successful `save` calls hit a row.
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    fn normalize(&self, id: i64, mut value: impl FnMut(&str) -> Option<String>) -> LocalRecord {
        let mut row = LocalRecord::new(id);
        for column in &self.table.columns {
            row.set(column.clone(), value(column.as_str()));
        }
        row
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    fn table(&self) -> &UserTable {
        &self.table
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<LocalRecord>> {
        Ok(self.get(id))
    }

    async fn find_where(&self, column: &str, value: &str) -> StorageResult<Option<LocalRecord>> {
        self.table.require_column(column)?;

        let rows = self.rows.read();
        Ok(rows
            .values()
            .find(|row| row.get(column) == Some(value))
            .cloned())
    }

    async fn insert(&self, fields: &BTreeMap<String, String>) -> StorageResult<LocalRecord> {
        for column in fields.keys() {
            self.table.require_column(column)?;
        }

        let mut rows = self.rows.write();
        let id = rows.keys().next_back().map_or(1, |last| last + 1);
        let row = self.normalize(id, |column| fields.get(column).cloned());
        rows.insert(id, row.clone());
        Ok(row)
    }

    async fn save(&self, record: &LocalRecord) -> StorageResult<()> {
        for column in record.fields.keys() {
            self.table.require_column(column)?;
        }

        let mut rows = self.rows.write();
        let row = rows
            .get_mut(&record.id)
            .ok_or(StorageError::user_not_found(record.id))?;
        for (column, value) in &record.fields {
            row.set(column.clone(), value.clone());
        }
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryUserStore {
        InMemoryUserStore::new(UserTable::new("users").with_column("username"))
    }

    #[tokio::test]
    async fn insert_assigns_increasing_ids() {
        let store = store();
        let mut fields = BTreeMap::new();
        fields.insert("username".to_string(), "alice".to_string());

        let first = store.insert(&fields).await.unwrap();
        fields.insert("username".to_string(), "bob".to_string());
        let second = store.insert(&fields).await.unwrap();

        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);
        assert_eq!(first.get("username"), Some("alice"));
        assert_eq!(first.get("remember_token"), None);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn insert_rejects_unknown_columns() {
        let store = store();
        let mut fields = BTreeMap::new();
        fields.insert("password".to_string(), "secret".to_string());

        let err = store.insert(&fields).await.unwrap_err();
        assert!(matches!(err, StorageError::UnknownColumn(c) if c == "password"));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn find_where_returns_lowest_key() {
        let store = store();
        store.seed(LocalRecord::new(9).with_field("username", "dup"));
        store.seed(LocalRecord::new(3).with_field("username", "dup"));

        let found = store.find_where("username", "dup").await.unwrap().unwrap();
        assert_eq!(found.id, 3);
        assert!(store.find_where("username", "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn save_updates_one_row() {
        let store = store();
        store.seed(LocalRecord::new(1).with_field("username", "alice"));
        store.seed(LocalRecord::new(2).with_field("username", "bob"));

        let mut alice = store.find_by_id(1).await.unwrap().unwrap();
        alice.set("remember_token", Some("tok".to_string()));
        store.save(&alice).await.unwrap();

        assert_eq!(store.save_count(), 1);
        assert_eq!(store.get(1).unwrap().get("remember_token"), Some("tok"));
        assert_eq!(store.get(2).unwrap().get("remember_token"), None);
    }

    #[tokio::test]
    async fn save_missing_row_fails() {
        let store = store();
        let err = store.save(&LocalRecord::new(5)).await.unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(store.save_count(), 0);
    }
}
