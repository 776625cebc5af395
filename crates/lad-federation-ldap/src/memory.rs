//! In-memory directory.
//!
//! Holds entries and passwords, evaluates filters locally and can simulate an
//! outage. Clones share state, so a test can keep a handle while the resolver
//! owns the connector.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::config::SearchScope;
use crate::connection::{DirectoryConnection, DirectoryConnector};
use crate::error::{LdapError, LdapResult};
use crate::filter::Filter;
use crate::search::LdapEntry;

#[derive(Debug, Default)]
struct DirectoryState {
    entries: RwLock<Vec<LdapEntry>>,
    passwords: RwLock<HashMap<String, String>>,
    offline: AtomicBool,
    connections: AtomicUsize,
    binds: AtomicUsize,
    searches: AtomicUsize,
}

impl DirectoryState {
    fn ensure_online(&self) -> LdapResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(LdapError::connection("directory unavailable"))
        } else {
            Ok(())
        }
    }
}

/// In-memory [`DirectoryConnector`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<DirectoryState>,
}

impl InMemoryDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry, replacing any entry with the same DN.
    pub fn add_entry(&self, entry: LdapEntry) {
        let mut entries = self.state.entries.write();
        let key = normalize_dn(&entry.dn);
        entries.retain(|e| normalize_dn(&e.dn) != key);
        entries.push(entry);
    }

    /// Sets the bind password of a DN.
    pub fn set_password(&self, dn: &str, password: impl Into<String>) {
        self.state
            .passwords
            .write()
            .insert(normalize_dn(dn), password.into());
    }

    /// Makes every connect, bind and search fail while set.
    pub fn set_offline(&self, offline: bool) {
        self.state.offline.store(offline, Ordering::SeqCst);
    }

    /// Returns the number of connections opened.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.connections.load(Ordering::SeqCst)
    }

    /// Returns the number of bind attempts that reached the directory.
    #[must_use]
    pub fn bind_count(&self) -> usize {
        self.state.binds.load(Ordering::SeqCst)
    }

    /// Returns the number of searches executed.
    #[must_use]
    pub fn search_count(&self) -> usize {
        self.state.searches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DirectoryConnector for InMemoryDirectory {
    async fn connect(&self) -> LdapResult<Box<dyn DirectoryConnection>> {
        self.state.ensure_online()?;
        self.state.connections.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(InMemoryConnection {
            state: Arc::clone(&self.state),
        }))
    }
}

struct InMemoryConnection {
    state: Arc<DirectoryState>,
}

#[async_trait]
impl DirectoryConnection for InMemoryConnection {
    async fn bind(&mut self, dn: &str, password: &str) -> LdapResult<()> {
        self.state.ensure_online()?;
        self.state.binds.fetch_add(1, Ordering::SeqCst);

        if dn.is_empty() && password.is_empty() {
            return Ok(());
        }

        let passwords = self.state.passwords.read();
        match passwords.get(&normalize_dn(dn)) {
            Some(expected) if expected == password => Ok(()),
            _ => Err(LdapError::InvalidCredentials),
        }
    }

    async fn search(
        &mut self,
        base: &str,
        scope: SearchScope,
        filter: &Filter,
    ) -> LdapResult<Vec<LdapEntry>> {
        self.state.ensure_online()?;
        self.state.searches.fetch_add(1, Ordering::SeqCst);

        let base = normalize_dn(base);
        let entries = self.state.entries.read();
        Ok(entries
            .iter()
            .filter(|e| in_scope(&normalize_dn(&e.dn), &base, scope))
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }

    async fn unbind(&mut self) -> LdapResult<()> {
        Ok(())
    }
}

fn normalize_dn(dn: &str) -> String {
    dn.split(',')
        .map(|rdn| rdn.trim().to_lowercase())
        .collect::<Vec<_>>()
        .join(",")
}

fn in_scope(dn: &str, base: &str, scope: SearchScope) -> bool {
    if dn == base {
        return scope != SearchScope::OneLevel;
    }
    match dn.strip_suffix(base).and_then(|rest| rest.strip_suffix(',')) {
        Some(relative) => match scope {
            SearchScope::Base => false,
            SearchScope::OneLevel => !relative.contains(','),
            SearchScope::Subtree => true,
        },
        None => false,
    }
}
