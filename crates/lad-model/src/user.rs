//! Application user model.
//!
//! A resolved user takes one of two shapes:
//!
//! - [`TransientUser`]: an attribute bag projected from a directory entry,
//!   living only as long as the host framework keeps it around.
//! - [`LinkedUser`]: a row of the local user table, matched to a directory
//!   entry through a shared attribute value.
//!
//! A linked user always carries the local primary key; a transient user never
//! does.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Attribute key holding the directory identity of a transient user.
pub const ID_KEY: &str = "id";

/// Attribute key holding the distinguished name of a transient user.
pub const DN_KEY: &str = "dn";

// ============================================================================
// Transient User
// ============================================================================

/// A user built purely from directory attributes.
///
/// Always holds the [`ID_KEY`] and [`DN_KEY`] entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientUser {
    attributes: BTreeMap<String, String>,
}

impl TransientUser {
    /// Creates a transient user with its identity and source DN.
    #[must_use]
    pub fn new(id: impl Into<String>, dn: impl Into<String>) -> Self {
        let mut attributes = BTreeMap::new();
        attributes.insert(ID_KEY.to_string(), id.into());
        attributes.insert(DN_KEY.to_string(), dn.into());
        Self { attributes }
    }

    /// Adds a projected attribute.
    ///
    /// The reserved `id` and `dn` keys cannot be overwritten.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        if key != ID_KEY && key != DN_KEY {
            self.attributes.insert(key, value.into());
        }
        self
    }

    /// Returns the directory identity value.
    #[must_use]
    pub fn id(&self) -> &str {
        self.attributes.get(ID_KEY).map_or("", String::as_str)
    }

    /// Returns the distinguished name of the source entry.
    #[must_use]
    pub fn dn(&self) -> &str {
        self.attributes.get(DN_KEY).map_or("", String::as_str)
    }

    /// Gets an attribute value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Returns all attributes, including `id` and `dn`.
    #[must_use]
    pub const fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }
}

// ============================================================================
// Local Record
// ============================================================================

/// A row of the local user table.
///
/// Only the primary key is typed; every other column is carried as optional
/// text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRecord {
    /// Primary key.
    pub id: i64,
    /// Column values keyed by column name.
    pub fields: BTreeMap<String, Option<String>>,
}

impl LocalRecord {
    /// Creates a record with no columns loaded.
    #[must_use]
    pub fn new(id: i64) -> Self {
        Self {
            id,
            fields: BTreeMap::new(),
        }
    }

    /// Sets a column value, builder style.
    #[must_use]
    pub fn with_field(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(column.into(), Some(value.into()));
        self
    }

    /// Gets a non-null column value.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields.get(column).and_then(Option::as_deref)
    }

    /// Sets a column value.
    pub fn set(&mut self, column: impl Into<String>, value: Option<String>) {
        self.fields.insert(column.into(), value);
    }
}

// ============================================================================
// Linked User
// ============================================================================

/// A local user row resolved through a directory entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkedUser {
    /// The local row.
    pub record: LocalRecord,
    /// Distinguished name of the matched directory entry.
    pub dn: String,
    /// Value of the directory identity attribute that linked the two.
    pub directory_id: String,
}

// ============================================================================
// Application User
// ============================================================================

/// The user handed to the host framework.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ApplicationUser {
    /// Built from directory attributes, not persisted.
    Transient(TransientUser),
    /// Backed by a local table row.
    Linked(LinkedUser),
}

impl ApplicationUser {
    /// Returns the distinguished name used to verify passwords.
    #[must_use]
    pub fn dn(&self) -> &str {
        match self {
            Self::Transient(user) => user.dn(),
            Self::Linked(user) => &user.dn,
        }
    }

    /// Returns the directory identity value.
    #[must_use]
    pub fn directory_id(&self) -> &str {
        match self {
            Self::Transient(user) => user.id(),
            Self::Linked(user) => &user.directory_id,
        }
    }

    /// Returns the local primary key, if the user is linked.
    #[must_use]
    pub const fn local_id(&self) -> Option<i64> {
        match self {
            Self::Transient(_) => None,
            Self::Linked(user) => Some(user.record.id),
        }
    }

    /// Gets an attribute (transient) or column (linked) value.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        match self {
            Self::Transient(user) => user.get(key),
            Self::Linked(user) => user.record.get(key),
        }
    }

    /// Returns true for a transient user.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<TransientUser> for ApplicationUser {
    fn from(user: TransientUser) -> Self {
        Self::Transient(user)
    }
}

impl From<LinkedUser> for ApplicationUser {
    fn from(user: LinkedUser) -> Self {
        Self::Linked(user)
    }
}
