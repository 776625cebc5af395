//! Directory search results.

use std::collections::HashMap;

use ldap3::SearchEntry;

/// Represents an LDAP entry with parsed attributes.
///
/// Attribute lookups ignore case, as attribute descriptions do in LDAP.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LdapEntry {
    /// Distinguished Name.
    pub dn: String,

    /// Attributes (all values are multi-valued).
    pub attributes: HashMap<String, Vec<String>>,

    /// Binary attributes.
    pub binary_attributes: HashMap<String, Vec<Vec<u8>>>,
}

impl LdapEntry {
    /// Creates an entry with no attributes.
    #[must_use]
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            ..Self::default()
        }
    }

    /// Creates a new LDAP entry from search result.
    #[must_use]
    pub fn from_search_entry(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attributes: entry.attrs,
            binary_attributes: entry.bin_attrs,
        }
    }

    /// Adds a text attribute, builder style.
    #[must_use]
    pub fn with_attr<I, S>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes
            .insert(name.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// Adds a binary attribute, builder style.
    #[must_use]
    pub fn with_binary_attr(mut self, name: impl Into<String>, value: Vec<u8>) -> Self {
        self.binary_attributes.insert(name.into(), vec![value]);
        self
    }

    /// Gets the first value of an attribute.
    #[must_use]
    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.get_attrs(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// Gets every value of an attribute.
    #[must_use]
    pub fn get_attrs(&self, name: &str) -> Option<&Vec<String>> {
        lookup(&self.attributes, name)
    }

    /// Gets the first value of a binary attribute.
    #[must_use]
    pub fn get_binary_attr(&self, name: &str) -> Option<&Vec<u8>> {
        self.get_binary_attrs(name).and_then(|v| v.first())
    }

    /// Gets every value of a binary attribute.
    #[must_use]
    pub fn get_binary_attrs(&self, name: &str) -> Option<&Vec<Vec<u8>>> {
        lookup(&self.binary_attributes, name)
    }

    /// Checks if the entry has an attribute (text or binary).
    #[must_use]
    pub fn has_attr(&self, name: &str) -> bool {
        self.get_attrs(name).is_some_and(|v| !v.is_empty())
            || lookup(&self.binary_attributes, name).is_some_and(|v| !v.is_empty())
    }

    /// Gets the identity value held in `attr`.
    ///
    /// Binary values are rendered in GUID notation when they are 16 bytes
    /// long (Active Directory `objectGUID`), in lowercase hex otherwise.
    /// [`decode_external_id`] reverses the rendering.
    #[must_use]
    pub fn external_id(&self, attr: &str) -> Option<String> {
        if let Some(val) = self.get_attr(attr) {
            return Some(val.to_string());
        }

        self.get_binary_attr(attr).map(|bytes| format_guid(bytes))
    }
}

fn lookup<'a, V>(map: &'a HashMap<String, V>, name: &str) -> Option<&'a V> {
    map.get(name).or_else(|| {
        map.iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value)
    })
}

/// Shortest hex rendering treated as a binary identity. Shorter all-hex
/// strings are far more likely to be plain text identifiers.
const MIN_HEX_ID_LEN: usize = 16;

/// Recovers the raw bytes of an identity rendered by
/// [`LdapEntry::external_id`] from a binary attribute.
///
/// Returns `None` for values that are not such a rendering.
#[must_use]
pub fn decode_external_id(value: &str) -> Option<Vec<u8>> {
    if let Some(guid) = parse_guid(value) {
        return Some(guid);
    }

    let is_hex = value
        .bytes()
        .all(|c| c.is_ascii_digit() || (b'a'..=b'f').contains(&c));
    if is_hex && value.len() >= MIN_HEX_ID_LEN && value.len() % 2 == 0 {
        hex::decode(value).ok()
    } else {
        None
    }
}

fn parse_guid(value: &str) -> Option<Vec<u8>> {
    let bytes = value.as_bytes();
    if bytes.len() != 36 || [8, 13, 18, 23].iter().any(|&i| bytes[i] != b'-') {
        return None;
    }

    let digits: String = value.chars().filter(|&c| c != '-').collect();
    let mut guid = hex::decode(digits).ok()?;
    if guid.len() != 16 {
        return None;
    }

    // Undo the mixed-endian ordering of the first three groups
    guid[0..4].reverse();
    guid[4..6].reverse();
    guid[6..8].reverse();
    Some(guid)
}

/// Formats a binary GUID (Active Directory format) as a string.
fn format_guid(bytes: &[u8]) -> String {
    if bytes.len() != 16 {
        return hex::encode(bytes);
    }

    // Active Directory GUID format (mixed endianness)
    format!(
        "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{}",
        bytes[3], bytes[2], bytes[1], bytes[0],
        bytes[5], bytes[4],
        bytes[7], bytes[6],
        bytes[8], bytes[9],
        hex::encode(&bytes[10..16])
    )
}

// ============================================================================
// Match classification
// ============================================================================

/// How many entries a user search returned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryMatch {
    /// No entry matched.
    None,
    /// Exactly one entry matched.
    Unique(LdapEntry),
    /// More than one entry matched.
    Ambiguous(usize),
}

impl EntryMatch {
    /// Classifies a search result.
    #[must_use]
    pub fn from_entries(mut entries: Vec<LdapEntry>) -> Self {
        match entries.len() {
            0 => Self::None,
            1 => entries.pop().map_or(Self::None, Self::Unique),
            n => Self::Ambiguous(n),
        }
    }

    /// Returns the entry if the match was unique.
    #[must_use]
    pub fn into_unique(self) -> Option<LdapEntry> {
        match self {
            Self::Unique(entry) => Some(entry),
            Self::None | Self::Ambiguous(_) => None,
        }
    }
}
