use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    hash::{Hash, Hasher},
};

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct ParseDomainError;

impl Display for ParseDomainError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "could not parse domain name")
    }
}

impl Error for ParseDomainError {}

/// An agent or user identifier, as used in the *i=* tag.
///
/// The local-part is optional: a signer may vouch for a domain without
/// committing to an individual user within it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity {
    pub local_part: Option<Box<str>>,
    pub domain_part: DomainName,
}

impl Identity {
    /// Creates an identity from a string of the form `[local-part]@domain`.
    ///
    /// Tag values are written out unencoded, so the local-part is restricted
    /// to dot-atom text that needs no DKIM-Quoted-Printable escaping.
    pub fn new(ident: &str) -> Result<Self, ParseDomainError> {
        let (local_part, domain) = ident.rsplit_once('@').ok_or(ParseDomainError)?;

        let local_part = if local_part.is_empty() {
            None
        } else {
            if !is_local_part(local_part) {
                return Err(ParseDomainError);
            }
            Some(local_part.into())
        };

        DomainName::new(domain).map(|domain_part| Self {
            local_part,
            domain_part,
        })
    }
}

impl Display for Identity {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if let Some(local_part) = &self.local_part {
            f.write_str(local_part)?;
        }
        write!(f, "@{}", self.domain_part)
    }
}

// ‘local-part’ is defined in RFC 5321, §4.1.2, internationalised in RFC 6531,
// §3.3. Only the dot-string form is accepted, without `=` (the
// quoted-printable escape character).
fn is_local_part(s: &str) -> bool {
    // See RFC 5321, §4.5.3.1.1.
    if s.len() > 64 {
        return false;
    }

    is_dot_string(s)
}

fn is_dot_string(s: &str) -> bool {
    // See RFC 5322, §3.2.3, with the modifications in RFC 6531, §3.3.
    fn is_atext(c: char) -> bool {
        c.is_ascii_alphanumeric()
            || matches!(
                c,
                '!' | '#' | '$' | '%' | '&' | '\'' | '*' | '+' | '-' | '/' | '?' | '^' | '_'
                | '`' | '{' | '|' | '}' | '~'
            )
            || !c.is_ascii()
    }

    let mut dot = true;
    for c in s.chars() {
        if dot {
            if is_atext(c) {
                dot = false;
            } else {
                return false;
            }
        } else if c == '.' {
            dot = true;
        } else if !is_atext(c) {
            return false;
        }
    }
    !dot
}

/// A domain name, as used in the *d=* and *i=* tags.
#[derive(Clone, Eq)]
pub struct DomainName(Box<str>);

impl DomainName {
    /// Creates a new domain name from the given string.
    ///
    /// The string is validated and then encapsulated as-is. Equivalence
    /// comparison is case-insensitive.
    pub fn new(s: &str) -> Result<Self, ParseDomainError> {
        if s.ends_with('.') {
            return Err(ParseDomainError);
        }

        if is_valid_dns_name(s) {
            Ok(Self(s.into()))
        } else {
            Err(ParseDomainError)
        }
    }

    /// Whether this domain equals the given domain or is a subdomain of it,
    /// compared in case-insensitive and IDNA-aware manner.
    pub fn eq_or_subdomain_of(&self, other: &DomainName) -> bool {
        if self == other {
            return true;
        }

        let (name, other) = match (
            idna::domain_to_ascii(&self.0),
            idna::domain_to_ascii(&other.0),
        ) {
            (Ok(name), Ok(other)) => (name, other),
            _ => return false,
        };

        if name.len() > other.len() {
            let len = name.len() - other.len();
            matches!(name.get(len..), Some(s) if s.eq_ignore_ascii_case(&other))
                && matches!(name.get(..len), Some(s) if s.ends_with('.'))
        } else {
            name.eq_ignore_ascii_case(&other)
        }
    }
}

impl Display for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for DomainName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &self.0)
    }
}

impl AsRef<str> for DomainName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for DomainName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for DomainName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}

fn is_valid_dns_name(s: &str) -> bool {
    fn is_tld(s: &str) -> bool {
        is_label(s) && !s.chars().all(|c: char| c.is_ascii_digit())
    }

    if !has_valid_domain_len(s) {
        return false;
    }

    let mut labels = s.split('.').rev().peekable();

    if matches!(labels.next(), Some(l) if !is_tld(l)) {
        return false;
    }
    if labels.peek().is_none() {
        return false;
    }

    labels.all(is_label)
}

fn is_label(s: &str) -> bool {
    has_valid_label_len(s)
        && !s.starts_with('-')
        && !s.ends_with('-')
        && s.chars().all(is_label_char)
}

// Tag value characters (RFC 6376, §3.2, extended to UTF-8 by RFC 8616) minus
// the characters that would be ambiguous inside a label.
fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_') || !c.is_ascii()
}

const MAX_DOMAIN_LENGTH: usize = 253;

fn has_valid_domain_len(s: &str) -> bool {
    matches!(s.len(), 1..=MAX_DOMAIN_LENGTH)
}

fn has_valid_label_len(s: &str) -> bool {
    matches!(s.len(), 1..=63)
}

/// A selector: a sequence of labels as used in the *s=* tag.
#[derive(Clone, Eq)]
pub struct Selector(Box<str>);

impl Selector {
    /// Creates a new selector from the given string.
    ///
    /// Labels are parsed leniently, allowing things like `dkim_123`.
    /// Equivalence comparison is case-insensitive.
    pub fn new(s: &str) -> Result<Self, ParseDomainError> {
        if !s.split('.').all(is_label) {
            return Err(ParseDomainError);
        }

        // must be convertible to A-label form for the DNS query
        idna::domain_to_ascii(s).map_err(|_| ParseDomainError)?;

        Ok(Self(s.into()))
    }
}

impl Display for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", &self.0)
    }
}

impl AsRef<str> for Selector {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq for Selector {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Hash for Selector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_ascii_lowercase().hash(state);
    }
}
