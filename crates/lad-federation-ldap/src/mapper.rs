//! Directory entry to application user mapping.

use std::collections::BTreeMap;

use lad_model::TransientUser;

use crate::config::LdapConfig;
use crate::search::LdapEntry;

// ============================================================================
// LDAP User Mapper
// ============================================================================

/// Projects directory entries onto transient users and local rows.
#[derive(Debug, Clone)]
pub struct LdapUserMapper {
    user_id_attribute: String,
    user_attributes: BTreeMap<String, String>,
    db_field: Option<String>,
    db_dn_field: Option<String>,
}

impl LdapUserMapper {
    /// Creates a mapper from provider configuration.
    #[must_use]
    pub fn new(config: &LdapConfig) -> Self {
        Self {
            user_id_attribute: config.user_id_attribute.clone(),
            user_attributes: config.user_attributes.clone(),
            db_field: config.db_field.clone(),
            db_dn_field: config.db_dn_field.clone(),
        }
    }

    /// Returns the entry's directory identity.
    #[must_use]
    pub fn directory_id(&self, entry: &LdapEntry) -> Option<String> {
        entry.external_id(&self.user_id_attribute)
    }

    /// Builds a transient user: identity, DN and every projected attribute
    /// the entry carries.
    #[must_use]
    pub fn to_transient(&self, entry: &LdapEntry) -> Option<TransientUser> {
        let id = self.directory_id(entry)?;
        let user = self
            .projections(entry)
            .fold(TransientUser::new(id, entry.dn.as_str()), |user, (field, value)| {
                user.with_attribute(field, value)
            });
        Some(user)
    }

    /// Builds the column values for importing an entry into the local table.
    #[must_use]
    pub fn to_record_fields(&self, entry: &LdapEntry) -> Option<BTreeMap<String, String>> {
        let id = self.directory_id(entry)?;
        let mut fields: BTreeMap<String, String> = self
            .projections(entry)
            .map(|(field, value)| (field.to_string(), value.to_string()))
            .collect();

        if let Some(db_field) = &self.db_field {
            fields.insert(db_field.clone(), id);
        }
        if let Some(dn_field) = &self.db_dn_field {
            fields.insert(dn_field.clone(), entry.dn.clone());
        }

        Some(fields)
    }

    fn projections<'a>(&'a self, entry: &'a LdapEntry) -> impl Iterator<Item = (&'a str, &'a str)> {
        self.user_attributes.iter().filter_map(move |(attr, field)| {
            entry.get_attr(attr).map(|value| (field.as_str(), value))
        })
    }
}
