//! Structured LDAP search filters.
//!
//! Filters are held as a tree with decoded values and serialized with RFC 4515
//! escaping, so a caller-supplied identifier can never change the shape of
//! the query. The same tree can be evaluated against an [`LdapEntry`], which
//! the in-memory directory uses in place of a server.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{LdapError, LdapResult};
use crate::search::LdapEntry;

// ============================================================================
// Filter
// ============================================================================

/// An LDAP search filter.
///
/// Values are stored unescaped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    /// `(&(a)(b)...)`
    And(Vec<Filter>),
    /// `(|(a)(b)...)`
    Or(Vec<Filter>),
    /// `(!(a))`
    Not(Box<Filter>),
    /// `(attr=value)`
    Equality(String, String),
    /// `(attr=\XX\XX...)`, equality on a raw byte value such as `objectGUID`.
    Binary(String, Vec<u8>),
    /// `(attr~=value)`
    Approx(String, String),
    /// `(attr>=value)`
    GreaterOrEqual(String, String),
    /// `(attr<=value)`
    LessOrEqual(String, String),
    /// `(attr=*)`
    Present(String),
    /// `(attr=initial*any*...*last)`
    Substring {
        /// Attribute description.
        attribute: String,
        /// Leading fragment.
        initial: Option<String>,
        /// Inner fragments, in order.
        any: Vec<String>,
        /// Trailing fragment.
        last: Option<String>,
    },
}

impl Filter {
    /// Creates an equality filter.
    #[must_use]
    pub fn equality(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        Self::Equality(attribute.into(), value.into())
    }

    /// Parses a filter string.
    ///
    /// Accepts the RFC 4515 grammar (extensible matches excepted) with `\XX`
    /// escapes. A bare `attr=value` without surrounding parentheses is
    /// accepted as well.
    ///
    /// ## Errors
    ///
    /// Returns `LdapError::InvalidFilter` on malformed input.
    pub fn parse(input: &str) -> LdapResult<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(LdapError::filter("empty filter"));
        }

        let wrapped;
        let text = if trimmed.starts_with('(') {
            trimmed
        } else {
            wrapped = format!("({trimmed})");
            &wrapped
        };

        let mut parser = Parser::new(text);
        let filter = parser.filter()?;
        if !parser.at_end() {
            return Err(LdapError::filter(format!(
                "unexpected input at offset {}",
                parser.pos
            )));
        }
        Ok(filter)
    }

    /// Evaluates the filter against an entry.
    ///
    /// Attribute names and values compare case-insensitively. Ordering
    /// comparisons are numeric when both sides are integers.
    #[must_use]
    pub fn matches(&self, entry: &LdapEntry) -> bool {
        match self {
            Self::And(items) => items.iter().all(|f| f.matches(entry)),
            Self::Or(items) => items.iter().any(|f| f.matches(entry)),
            Self::Not(inner) => !inner.matches(entry),
            Self::Equality(attr, value) | Self::Approx(attr, value) => {
                let value = fold(value);
                values(entry, attr).any(|v| fold(v) == value)
            }
            Self::Binary(attr, bytes) => {
                binary_values(entry, attr).any(|v| v == bytes.as_slice())
                    || values(entry, attr).any(|v| v.as_bytes() == bytes.as_slice())
            }
            Self::GreaterOrEqual(attr, value) => {
                values(entry, attr).any(|v| compare(v, value) != Ordering::Less)
            }
            Self::LessOrEqual(attr, value) => {
                values(entry, attr).any(|v| compare(v, value) != Ordering::Greater)
            }
            Self::Present(attr) => entry.has_attr(attr),
            Self::Substring {
                attribute,
                initial,
                any,
                last,
            } => values(entry, attribute)
                .any(|v| substring_matches(v, initial.as_deref(), any, last.as_deref())),
        }
    }
}

impl FromStr for Filter {
    type Err = LdapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And(items) => {
                f.write_str("(&")?;
                for item in items {
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Or(items) => {
                f.write_str("(|")?;
                for item in items {
                    write!(f, "{item}")?;
                }
                f.write_str(")")
            }
            Self::Not(inner) => write!(f, "(!{inner})"),
            Self::Equality(attr, value) => write!(f, "({attr}={})", escape_value(value)),
            Self::Binary(attr, bytes) => {
                write!(f, "({attr}=")?;
                for byte in bytes {
                    write!(f, "\\{byte:02x}")?;
                }
                f.write_str(")")
            }
            Self::Approx(attr, value) => write!(f, "({attr}~={})", escape_value(value)),
            Self::GreaterOrEqual(attr, value) => write!(f, "({attr}>={})", escape_value(value)),
            Self::LessOrEqual(attr, value) => write!(f, "({attr}<={})", escape_value(value)),
            Self::Present(attr) => write!(f, "({attr}=*)"),
            Self::Substring {
                attribute,
                initial,
                any,
                last,
            } => {
                write!(f, "({attribute}=")?;
                if let Some(initial) = initial {
                    f.write_str(&escape_value(initial))?;
                }
                f.write_str("*")?;
                for fragment in any {
                    write!(f, "{}*", escape_value(fragment))?;
                }
                if let Some(last) = last {
                    f.write_str(&escape_value(last))?;
                }
                f.write_str(")")
            }
        }
    }
}

// ============================================================================
// User Filter
// ============================================================================

/// Builds the filter locating a user whose `attribute` equals `value`.
///
/// The equality clause goes first inside a top-level conjunction of the base
/// filter, or wraps a non-conjunctive base filter in a new one. Without a
/// base filter the clause stands alone.
#[must_use]
pub fn user_filter(base: Option<&Filter>, attribute: &str, value: &str) -> Filter {
    combine(base, Filter::equality(attribute, value))
}

/// Builds the filter re-resolving a user from its directory identity.
///
/// Binary identities reach the caller in text form (see
/// [`crate::search::LdapEntry::external_id`]). When `value` has that form, the
/// clause also matches the raw bytes it stands for.
#[must_use]
pub fn identity_filter(base: Option<&Filter>, attribute: &str, value: &str) -> Filter {
    let clause = match crate::search::decode_external_id(value) {
        Some(bytes) => Filter::Or(vec![
            Filter::equality(attribute, value),
            Filter::Binary(attribute.to_string(), bytes),
        ]),
        None => Filter::equality(attribute, value),
    };
    combine(base, clause)
}

fn combine(base: Option<&Filter>, clause: Filter) -> Filter {
    match base {
        None => clause,
        Some(Filter::And(items)) => {
            let mut combined = Vec::with_capacity(items.len() + 1);
            combined.push(clause);
            combined.extend(items.iter().cloned());
            Filter::And(combined)
        }
        Some(other) => Filter::And(vec![clause, other.clone()]),
    }
}

// ============================================================================
// Escaping
// ============================================================================

/// Escapes special characters in LDAP filter values (RFC 4515).
#[must_use]
pub fn escape_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\5c"),
            '*' => result.push_str("\\2a"),
            '(' => result.push_str("\\28"),
            ')' => result.push_str("\\29"),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}

/// Escapes an attribute value for use inside a distinguished name (RFC 4514).
#[must_use]
pub fn escape_dn_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let last = value.chars().count().saturating_sub(1);
    for (i, c) in value.chars().enumerate() {
        match c {
            ',' | '+' | '"' | '\\' | '<' | '>' | ';' | '=' => {
                result.push('\\');
                result.push(c);
            }
            '#' if i == 0 => result.push_str("\\#"),
            ' ' if i == 0 || i == last => result.push_str("\\ "),
            '\0' => result.push_str("\\00"),
            _ => result.push(c),
        }
    }
    result
}

/// Checks that a name is a usable attribute description
/// (`cn`, `sAMAccountName`, `2.5.4.3`, `userCertificate;binary`).
#[must_use]
pub fn is_valid_attribute(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphanumeric() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | ';'))
        }
        _ => false,
    }
}

// ============================================================================
// Parser
// ============================================================================

#[derive(Clone, Copy)]
enum Operator {
    Equal,
    Approx,
    GreaterOrEqual,
    LessOrEqual,
}

struct Parser<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    fn expect(&mut self, expected: u8) -> LdapResult<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(LdapError::filter(format!(
                "expected '{}' at offset {}, found '{}'",
                expected as char, self.pos, c as char
            ))),
            None => Err(LdapError::filter(format!(
                "expected '{}' at end of filter",
                expected as char
            ))),
        }
    }

    fn filter(&mut self) -> LdapResult<Filter> {
        self.expect(b'(')?;
        let filter = match self.peek() {
            Some(b'&') => {
                self.pos += 1;
                Filter::And(self.list()?)
            }
            Some(b'|') => {
                self.pos += 1;
                Filter::Or(self.list()?)
            }
            Some(b'!') => {
                self.pos += 1;
                Filter::Not(Box::new(self.filter()?))
            }
            Some(_) => self.item()?,
            None => return Err(LdapError::filter("unexpected end of filter")),
        };
        self.expect(b')')?;
        Ok(filter)
    }

    fn list(&mut self) -> LdapResult<Vec<Filter>> {
        let mut items = Vec::new();
        while self.peek() == Some(b'(') {
            items.push(self.filter()?);
        }
        if items.is_empty() {
            return Err(LdapError::filter(format!(
                "empty filter list at offset {}",
                self.pos
            )));
        }
        Ok(items)
    }

    fn item(&mut self) -> LdapResult<Filter> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if matches!(c, b'=' | b'~' | b'>' | b'<' | b'(' | b')') {
                break;
            }
            self.pos += 1;
        }
        let attribute = decode(self.input[start..self.pos].to_vec())?;
        if !is_valid_attribute(&attribute) {
            return Err(LdapError::filter(format!(
                "invalid attribute description '{attribute}'"
            )));
        }

        let op = match self.peek() {
            Some(b'=') => Operator::Equal,
            Some(b'~') => {
                self.pos += 1;
                Operator::Approx
            }
            Some(b'>') => {
                self.pos += 1;
                Operator::GreaterOrEqual
            }
            Some(b'<') => {
                self.pos += 1;
                Operator::LessOrEqual
            }
            _ => {
                return Err(LdapError::filter(format!(
                    "expected operator after '{attribute}'"
                )))
            }
        };
        self.expect(b'=')?;

        let mut segments = self.value()?;
        if segments.len() == 1 {
            let raw = segments.remove(0);
            if matches!(op, Operator::Equal) && std::str::from_utf8(&raw).is_err() {
                return Ok(Filter::Binary(attribute, raw));
            }
            let value = decode(raw)?;
            return Ok(match op {
                Operator::Equal => Filter::Equality(attribute, value),
                Operator::Approx => Filter::Approx(attribute, value),
                Operator::GreaterOrEqual => Filter::GreaterOrEqual(attribute, value),
                Operator::LessOrEqual => Filter::LessOrEqual(attribute, value),
            });
        }

        if !matches!(op, Operator::Equal) {
            return Err(LdapError::filter(format!(
                "wildcard not allowed in ordering or approximate match on '{attribute}'"
            )));
        }

        if segments.len() == 2 && segments.iter().all(Vec::is_empty) {
            return Ok(Filter::Present(attribute));
        }

        let last = segments.pop().filter(|s| !s.is_empty()).map(decode).transpose()?;
        let initial = Some(segments.remove(0))
            .filter(|s| !s.is_empty())
            .map(decode)
            .transpose()?;
        let any = segments
            .into_iter()
            .map(|s| {
                if s.is_empty() {
                    Err(LdapError::filter(format!(
                        "consecutive wildcards in value of '{attribute}'"
                    )))
                } else {
                    decode(s)
                }
            })
            .collect::<LdapResult<Vec<_>>>()?;

        Ok(Filter::Substring {
            attribute,
            initial,
            any,
            last,
        })
    }

    /// Reads a value up to the closing parenthesis, split on unescaped `*`.
    fn value(&mut self) -> LdapResult<Vec<Vec<u8>>> {
        let mut segments = vec![Vec::new()];
        loop {
            match self.peek() {
                None | Some(b')') => break,
                Some(b'(') => {
                    return Err(LdapError::filter(format!(
                        "unescaped '(' in value at offset {}",
                        self.pos
                    )))
                }
                Some(b'*') => {
                    self.pos += 1;
                    segments.push(Vec::new());
                }
                Some(b'\\') => {
                    self.pos += 1;
                    let high = self.hex_digit()?;
                    let low = self.hex_digit()?;
                    if let Some(segment) = segments.last_mut() {
                        segment.push((high << 4) | low);
                    }
                }
                Some(c) => {
                    self.pos += 1;
                    if let Some(segment) = segments.last_mut() {
                        segment.push(c);
                    }
                }
            }
        }
        Ok(segments)
    }

    fn hex_digit(&mut self) -> LdapResult<u8> {
        let digit = self
            .peek()
            .and_then(|c| (c as char).to_digit(16))
            .ok_or_else(|| {
                LdapError::filter(format!("invalid escape sequence at offset {}", self.pos))
            })?;
        self.pos += 1;
        // to_digit(16) is always below 16
        Ok(digit as u8)
    }
}

fn decode(bytes: Vec<u8>) -> LdapResult<String> {
    String::from_utf8(bytes).map_err(|_| LdapError::filter("value is not valid UTF-8"))
}

// ============================================================================
// Evaluation helpers
// ============================================================================

fn values<'e>(entry: &'e LdapEntry, attribute: &str) -> impl Iterator<Item = &'e str> {
    entry
        .get_attrs(attribute)
        .into_iter()
        .flatten()
        .map(String::as_str)
}

fn binary_values<'e>(entry: &'e LdapEntry, attribute: &str) -> impl Iterator<Item = &'e [u8]> {
    entry
        .get_binary_attrs(attribute)
        .into_iter()
        .flatten()
        .map(Vec::as_slice)
}

fn fold(value: &str) -> String {
    value.to_lowercase()
}

fn compare(actual: &str, expected: &str) -> Ordering {
    match (actual.parse::<i64>(), expected.parse::<i64>()) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => fold(actual).cmp(&fold(expected)),
    }
}

fn substring_matches(
    value: &str,
    initial: Option<&str>,
    any: &[String],
    last: Option<&str>,
) -> bool {
    let value = fold(value);
    let mut rest = value.as_str();

    if let Some(initial) = initial {
        match rest.strip_prefix(fold(initial).as_str()) {
            Some(remaining) => rest = remaining,
            None => return false,
        }
    }

    for fragment in any {
        let fragment = fold(fragment);
        match rest.find(fragment.as_str()) {
            Some(idx) => rest = &rest[idx + fragment.len()..],
            None => return false,
        }
    }

    last.map_or(true, |last| rest.ends_with(fold(last).as_str()))
}
