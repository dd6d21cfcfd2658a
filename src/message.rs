// dkimsign – DKIM signing of email messages
// Copyright © 2022–2023 David Bürgin <dbuergin@gluet.ch>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, either version 3 of the License, or (at your option) any later
// version.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more
// details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.

//! Raw message handling: line ending normalization and splitting into header
//! and body.

use crate::{
    header::{HeaderFieldError, HeaderFields},
    parse::CRLF,
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    str,
};

/// An error indicating that a message could not be processed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum MalformedMessage {
    /// The message is not valid UTF-8 text.
    InvalidEncoding,
    /// The header block could not be parsed into header fields.
    InvalidHeader,
}

impl Display for MalformedMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEncoding => write!(f, "message is not valid text"),
            Self::InvalidHeader => write!(f, "malformed message header"),
        }
    }
}

impl Error for MalformedMessage {}

impl From<HeaderFieldError> for MalformedMessage {
    fn from(_: HeaderFieldError) -> Self {
        Self::InvalidHeader
    }
}

/// An email message with normalized CRLF line endings.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct RawMessage(String);

impl RawMessage {
    /// Creates a message from text, normalizing line endings.
    pub fn new(message: &str) -> Self {
        Self(normalize_line_endings(message))
    }

    /// Creates a message from bytes, which must be UTF-8 text.
    pub fn from_bytes(message: &[u8]) -> Result<Self, MalformedMessage> {
        let message = str::from_utf8(message).map_err(|_| MalformedMessage::InvalidEncoding)?;
        Ok(Self::new(message))
    }

    /// The header block, without the line break that ends the last header.
    pub fn header_block(&self) -> &str {
        split_message(&self.0).0
    }

    /// The body, following the blank line; empty if there is none.
    pub fn body(&self) -> &str {
        split_message(&self.0).1
    }

    /// Parses the header block and returns the header fields and the body.
    pub fn parse(&self) -> Result<(HeaderFields, &str), MalformedMessage> {
        let (header, body) = split_message(&self.0);
        let headers = header.parse()?;
        Ok((headers, body))
    }
}

impl AsRef<str> for RawMessage {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<RawMessage> for String {
    fn from(message: RawMessage) -> Self {
        message.0
    }
}

/// Converts all line endings (LF or CRLF) to CRLF. A CR not followed by LF is
/// left as is.
pub fn normalize_line_endings(s: &str) -> String {
    let mut result = String::with_capacity(s.len() + s.len() / 16);

    for line in s.split_inclusive('\n') {
        match line.strip_suffix('\n') {
            Some(line) => {
                result.push_str(line.strip_suffix('\r').unwrap_or(line));
                result.push_str(CRLF);
            }
            None => result.push_str(line),
        }
    }

    result
}

/// Splits a message with CRLF line endings at the first empty line.
///
/// When there is no empty line, the whole message is header and the body is
/// empty.
pub fn split_message(message: &str) -> (&str, &str) {
    if let Some(body) = message.strip_prefix(CRLF) {
        return ("", body);
    }

    match message.split_once("\r\n\r\n") {
        Some((header, body)) => (header, body),
        None => (message.strip_suffix(CRLF).unwrap_or(message), ""),
    }
}
