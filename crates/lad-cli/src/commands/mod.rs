//! Command implementations.

pub mod authenticate;
pub mod check;
pub mod filter;
pub mod lookup;

pub use authenticate::run_authenticate;
pub use check::run_check;
pub use filter::run_filter;
pub use lookup::run_lookup;

use std::sync::Arc;

use lad_federation_ldap::LdapUserProvider;
use lad_storage::UserStore;
use lad_storage_sql::{create_pool, PgUserStore, PoolConfig};

use crate::CliConfig;

/// Connects the provider described by the configuration, opening the local
/// user database when users are linked.
pub async fn connect_provider(config: &CliConfig) -> crate::CliResult<LdapUserProvider> {
    let store: Option<Arc<dyn UserStore>> = match config.ldap.user_table()? {
        Some(table) if config.ldap.use_db => {
            let database = config.database.as_ref().ok_or_else(|| {
                crate::CliError::Config(format!(
                    "use_db requires a [database] section or {}",
                    crate::config::DATABASE_URL_ENV
                ))
            })?;
            let pool = create_pool(
                &PoolConfig::new(database.url.as_str()).max_connections(database.max_connections),
            )
            .await?;
            tracing::debug!(table = %table.name, "Opened local user database");
            let store: Arc<dyn UserStore> = Arc::new(PgUserStore::new(pool, table)?);
            Some(store)
        }
        _ => None,
    };

    Ok(LdapUserProvider::from_config(config.ldap.clone(), store).await?)
}
