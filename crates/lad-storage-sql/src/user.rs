//! `PostgreSQL` implementation of the user store.
//!
//! The table layout comes from configuration, so statements are assembled at
//! runtime from the validated [`UserTable`] identifiers. Values are always
//! bound, never interpolated. Non-key columns are read back as `text`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use lad_model::LocalRecord;
use lad_storage::error::StorageResult;
use lad_storage::{StorageError, UserStore, UserTable};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::error::from_sqlx_error;

/// `PostgreSQL` user store.
pub struct PgUserStore {
    pool: PgPool,
    table: UserTable,
}

impl PgUserStore {
    /// Creates a store for the given table.
    ///
    /// ## Errors
    ///
    /// Returns `StorageError::InvalidIdentifier` if a table or column name is
    /// not a plain identifier.
    pub fn new(pool: PgPool, table: UserTable) -> StorageResult<Self> {
        table.validate()?;
        Ok(Self { pool, table })
    }

    /// Key widened to `bigint` so `serial` keys decode as `i64`; other
    /// columns read as text.
    fn select_list(&self) -> String {
        let key = quote(&self.table.primary_key);
        std::iter::once(format!("{key}::bigint AS {key}"))
            .chain(
                self.table
                    .columns
                    .iter()
                    .map(|c| format!("{}::text AS {}", quote(c), quote(c))),
            )
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn find_by_id_sql(&self) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            self.select_list(),
            quote(&self.table.name),
            quote(&self.table.primary_key),
        )
    }

    fn find_where_sql(&self, column: &str) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1 ORDER BY {} LIMIT 1",
            self.select_list(),
            quote(&self.table.name),
            quote(column),
            quote(&self.table.primary_key),
        )
    }

    fn insert_sql(&self, columns: &[&str]) -> String {
        if columns.is_empty() {
            return format!(
                "INSERT INTO {} DEFAULT VALUES RETURNING {}",
                quote(&self.table.name),
                self.select_list(),
            );
        }

        let names: Vec<String> = columns.iter().map(|c| quote(c)).collect();
        let params: Vec<String> = (1..=columns.len()).map(|i| format!("${i}")).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            quote(&self.table.name),
            names.join(", "),
            params.join(", "),
            self.select_list(),
        )
    }

    fn update_sql(&self, columns: &[&str]) -> String {
        let pk = quote(&self.table.primary_key);
        let assignments = if columns.is_empty() {
            format!("{pk} = {pk}")
        } else {
            columns
                .iter()
                .enumerate()
                .map(|(i, c)| format!("{} = ${}", quote(c), i + 2))
                .collect::<Vec<_>>()
                .join(", ")
        };
        format!(
            "UPDATE {} SET {assignments} WHERE {pk} = $1",
            quote(&self.table.name),
        )
    }

    fn record_from_row(&self, row: &PgRow) -> StorageResult<LocalRecord> {
        let id: i64 = row
            .try_get(self.table.primary_key.as_str())
            .map_err(from_sqlx_error)?;

        let mut record = LocalRecord::new(id);
        for column in &self.table.columns {
            let value: Option<String> = row.try_get(column.as_str()).map_err(from_sqlx_error)?;
            record.set(column.clone(), value);
        }
        Ok(record)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    fn table(&self) -> &UserTable {
        &self.table
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<LocalRecord>> {
        let sql = self.find_by_id_sql();
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        row.map(|r| self.record_from_row(&r)).transpose()
    }

    async fn find_where(&self, column: &str, value: &str) -> StorageResult<Option<LocalRecord>> {
        self.table.require_column(column)?;

        let sql = self.find_where_sql(column);
        let row = sqlx::query(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        row.map(|r| self.record_from_row(&r)).transpose()
    }

    async fn insert(&self, fields: &BTreeMap<String, String>) -> StorageResult<LocalRecord> {
        for column in fields.keys() {
            self.table.require_column(column)?;
        }

        let columns: Vec<&str> = fields.keys().map(String::as_str).collect();
        let sql = self.insert_sql(&columns);

        let mut query = sqlx::query(&sql);
        for value in fields.values() {
            query = query.bind(value.as_str());
        }

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(from_sqlx_error)?;
        let record = self.record_from_row(&row)?;

        tracing::debug!(table = %self.table.name, id = record.id, "Inserted local user");
        Ok(record)
    }

    async fn save(&self, record: &LocalRecord) -> StorageResult<()> {
        for column in record.fields.keys() {
            self.table.require_column(column)?;
        }

        let columns: Vec<&str> = record.fields.keys().map(String::as_str).collect();
        let sql = self.update_sql(&columns);

        let mut query = sqlx::query(&sql).bind(record.id);
        for value in record.fields.values() {
            query = query.bind(value.as_deref());
        }

        let result = query
            .execute(&self.pool)
            .await
            .map_err(from_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::user_not_found(record.id));
        }

        Ok(())
    }
}

/// Double-quotes a validated identifier.
fn quote(identifier: &str) -> String {
    format!("\"{identifier}\"")
}
