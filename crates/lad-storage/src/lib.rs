//! # lad-storage
//!
//! Local user store abstraction for the LDAP authentication driver.
//!
//! Linked users live in a single table described by a [`UserTable`]. Concrete
//! backends implement [`UserStore`]; an [`InMemoryUserStore`] is provided for
//! tests and demos.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod memory;
pub mod table;
pub mod user;

pub use error::{StorageError, StorageResult};
pub use memory::InMemoryUserStore;
pub use table::UserTable;
pub use user::UserStore;
