//! LDAP / Active Directory user provider.
//!
//! Resolves login identifiers to directory entries and verifies passwords by
//! binding as the matched entry. Resolved users are either built from
//! directory attributes or linked to rows of a local user table.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod connection;
pub mod error;
pub mod filter;
pub mod mapper;
pub mod memory;
pub mod provider;
pub mod search;

pub use config::{LdapConfig, LdapConfigBuilder, LinkMode, SearchScope};
pub use connection::{DirectoryConnection, DirectoryConnector, Ldap3Connector, ServiceConnection};
pub use error::{LdapError, LdapResult};
pub use filter::Filter;
pub use mapper::LdapUserMapper;
pub use memory::InMemoryDirectory;
pub use provider::LdapUserProvider;
pub use search::{EntryMatch, LdapEntry};
