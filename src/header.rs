//! Representation of email header data.

use crate::parse::{is_continuation_line, rstrip_wsp, CRLF};
use bstr::ByteSlice;
use std::{
    error::Error,
    fmt::{self, Debug, Display, Formatter},
    hash::{Hash, Hasher},
    str::FromStr,
};

/// A header field, made of field name and the raw field body.
pub type HeaderField = (FieldName, FieldBody);

/// An error indicating an ill-formed header field.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct HeaderFieldError;

impl Display for HeaderFieldError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "ill-formed header field")
    }
}

impl Error for HeaderFieldError {}

/// The header fields of a message, in the order in which they appear in the
/// message.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct HeaderFields(Box<[HeaderField]>);

impl HeaderFields {
    pub fn new(value: impl Into<Box<[HeaderField]>>) -> Self {
        Self(value.into())
    }

    pub fn from_vec(value: Vec<(String, Vec<u8>)>) -> Result<Self, HeaderFieldError> {
        let value: Vec<_> = value
            .into_iter()
            .map(|(name, value)| {
                let name = FieldName::new(name)?;
                let body = FieldBody::new(value)?;
                Ok((name, body))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self::new(value))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<[HeaderField]> for HeaderFields {
    fn as_ref(&self) -> &[HeaderField] {
        &self.0
    }
}

impl From<HeaderFields> for Vec<HeaderField> {
    fn from(header_fields: HeaderFields) -> Self {
        header_fields.0.into()
    }
}

impl FromStr for HeaderFields {
    type Err = HeaderFieldError;

    /// Parses a header block. Lines may be terminated by CRLF or LF; folded
    /// continuation lines are kept in the field body with CRLF line breaks.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s
            .strip_suffix(CRLF)
            .or_else(|| s.strip_suffix('\n'))
            .unwrap_or(s);

        if s.is_empty() {
            return Ok(Default::default());
        }

        let mut fields: Vec<(&str, String)> = vec![];

        for line in s.split('\n') {
            let line = line.strip_suffix('\r').unwrap_or(line);

            if is_continuation_line(line) {
                let (_, value) = fields.last_mut().ok_or(HeaderFieldError)?;
                value.push_str(CRLF);
                value.push_str(line);
            } else {
                let (name, value) = line.split_once(':').ok_or(HeaderFieldError)?;
                fields.push((name, value.into()));
            }
        }

        let fields: Vec<_> = fields
            .into_iter()
            .map(|(name, value)| {
                let name = FieldName::new(name)?;
                let body = FieldBody::new(value.into_bytes())?;
                Ok((name, body))
            })
            .collect::<Result<_, _>>()?;

        Ok(Self::new(fields))
    }
}

/// A header field name.
///
/// The name is kept exactly as it appeared, including any whitespace between
/// name and colon (obsolete syntax). Comparison ignores ASCII case and such
/// trailing whitespace.
#[derive(Clone, Eq)]
pub struct FieldName(Box<str>);

impl FieldName {
    pub fn new(value: impl Into<Box<str>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();
        let name = rstrip_wsp(&value);
        if name.is_empty() {
            return Err(HeaderFieldError);
        }
        if !name.chars().all(|c| c.is_ascii_graphic() && c != ':') {
            return Err(HeaderFieldError);
        }
        Ok(Self(value))
    }

    /// Returns the name without trailing whitespace.
    pub fn trimmed(&self) -> &str {
        rstrip_wsp(&self.0)
    }
}

impl AsRef<str> for FieldName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Debug for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Debug::fmt(&self.0, f)
    }
}

impl Display for FieldName {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl PartialEq for FieldName {
    fn eq(&self, other: &Self) -> bool {
        self.trimmed().eq_ignore_ascii_case(other.trimmed())
    }
}

impl PartialEq<&str> for FieldName {
    fn eq(&self, other: &&str) -> bool {
        self.trimmed().eq_ignore_ascii_case(other)
    }
}

impl Hash for FieldName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.trimmed().to_ascii_lowercase().hash(state);
    }
}

/// A raw header field body: everything after the colon, with folding line
/// breaks (CRLF) preserved.
#[derive(Clone, Eq, Hash, PartialEq)]
pub struct FieldBody(Box<[u8]>);

impl FieldBody {
    pub fn new(value: impl Into<Box<[u8]>>) -> Result<Self, HeaderFieldError> {
        let value = value.into();
        // only folded continuation lines, no trailing CRLF:
        if !value
            .split_str(CRLF)
            .skip(1)
            .all(|line| line.starts_with(b" ") || line.starts_with(b"\t"))
        {
            return Err(HeaderFieldError);
        }
        // no stray LF; a lone CR is tolerated as an ordinary byte
        if value.split_str(CRLF).any(|line| line.contains(&b'\n')) {
            return Err(HeaderFieldError);
        }
        Ok(Self(value))
    }
}

impl AsRef<[u8]> for FieldBody {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Debug for FieldBody {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldBody")
            .field(&self.0.as_bstr())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_name_ok() {
        assert!(FieldName::new("abc").is_ok());
        assert!(FieldName::new("abc ").is_ok());

        assert!(FieldName::new("").is_err());
        assert!(FieldName::new(" ").is_err());
        assert!(FieldName::new(" abc").is_err());
        assert!(FieldName::new("a:c").is_err());
        assert!(FieldName::new("a c").is_err());
    }

    #[test]
    fn field_name_eq() {
        let name = FieldName::new("Subject \t").unwrap();

        assert_eq!(name.as_ref(), "Subject \t");
        assert_eq!(name.trimmed(), "Subject");
        assert_eq!(name, FieldName::new("SUBJECT").unwrap());
        assert!(name == "subject");
    }

    #[test]
    fn field_name_fmt() {
        let name = FieldName::new("Subject").unwrap();

        assert_eq!(name.to_string(), "Subject");
        assert_eq!(format!("{name:?}"), "\"Subject\"");
    }

    #[test]
    fn field_body_ok() {
        assert!(FieldBody::new(*b" ab\r\n\tcd ").is_ok());
        assert!(FieldBody::new(*b"\r\n\ta").is_ok());
        assert!(FieldBody::new(*b"  ").is_ok());
        assert!(FieldBody::new(*b"").is_ok());
        assert!(FieldBody::new(*b" a\rb").is_ok());

        assert!(FieldBody::new(*b" \r\na").is_err());
        assert!(FieldBody::new(*b" \na").is_err());
        assert!(FieldBody::new(*b" abc\r\n").is_err());
    }

    #[test]
    fn header_fields_from_str() {
        let headers: HeaderFields = "From: me\r\n\
            To: you,\r\n \tthem\r\n\
            Subject :hello\r\n\
            X-Empty:"
            .parse()
            .unwrap();

        let headers = headers.as_ref();

        assert_eq!(headers.len(), 4);
        assert_eq!(headers[0].0.as_ref(), "From");
        assert_eq!(headers[0].1.as_ref(), b" me");
        assert_eq!(headers[1].0.as_ref(), "To");
        assert_eq!(headers[1].1.as_ref(), b" you,\r\n \tthem");
        assert_eq!(headers[2].0.as_ref(), "Subject ");
        assert_eq!(headers[2].1.as_ref(), b"hello");
        assert_eq!(headers[3].0.as_ref(), "X-Empty");
        assert_eq!(headers[3].1.as_ref(), b"");
    }

    #[test]
    fn header_fields_from_str_lf() {
        let headers: HeaderFields = "From: me\nTo: you\n  again\n".parse().unwrap();

        let headers = headers.as_ref();

        assert_eq!(headers.len(), 2);
        assert_eq!(headers[1].1.as_ref(), b" you\r\n  again");
    }

    #[test]
    fn header_fields_from_str_empty() {
        let headers: HeaderFields = "".parse().unwrap();

        assert!(headers.is_empty());
    }

    #[test]
    fn header_fields_from_str_invalid() {
        assert_eq!(" folded: first".parse::<HeaderFields>(), Err(HeaderFieldError));
        assert_eq!("From: me\r\nno colon".parse::<HeaderFields>(), Err(HeaderFieldError));
        assert_eq!("Bad Name: x".parse::<HeaderFields>(), Err(HeaderFieldError));
        assert_eq!(": x".parse::<HeaderFields>(), Err(HeaderFieldError));
    }

    #[test]
    fn header_fields_from_vec() {
        assert!(HeaderFields::from_vec(vec![
            ("From".to_owned(), b" me".to_vec()),
            ("To".to_owned(), b" you (yes,\r\n\t you!)".to_vec()),
        ])
        .is_ok());

        assert!(HeaderFields::from_vec(vec![("From".to_owned(), b" me\r\n".to_vec())]).is_err());
    }
}
