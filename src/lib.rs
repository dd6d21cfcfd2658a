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

//! A library for signing email messages with *DomainKeys Identified Mail*
//! (DKIM) signatures as described in [RFC 6376].
//!
//! The high-level API signs a message with a resolved signing configuration, a
//! [`SignRequest`], and produces a *DKIM-Signature* header. Most users will
//! want to use [`sign`] or [`sign_message`], or the streaming [`Signer`].
//! For convenience, all the relevant items are re-exported at the top level.
//!
//! The building blocks of the signing process are available as low-level APIs
//! in additional modules: message splitting, header parsing, canonicalization,
//! header selection, and hashing and signing.
//!
//! # Usage
//!
//! ```
//! use dkimsign::{SignRequestBuilder, SigningKey};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let pem = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/keys/rsa2048.pem"));
//! let request = SignRequestBuilder::new()
//!     .domain("example.com")
//!     .selector("mail")
//!     .signing_key(SigningKey::from_pem(pem)?)
//!     .build()?;
//!
//! let message = "From: me@example.com\nSubject: hi\n\nHello!\n";
//!
//! let signed = dkimsign::sign(&request, message)?;
//!
//! assert!(signed.starts_with("DKIM-Signature: v=1; a=rsa-sha256; c=relaxed/relaxed;"));
//! assert!(signed.ends_with("\r\nFrom: me@example.com\r\nSubject: hi\r\n\r\nHello!\r\n"));
//! # Ok(())
//! # }
//! ```
//!
//! [RFC 6376]: https://www.rfc-editor.org/rfc/rfc6376

pub mod canonicalize;
pub mod crypto;
pub mod header;
pub mod message;
pub mod message_hash;
mod parse;
pub mod select;
pub mod signature;
pub mod signer;
mod util;

pub use crate::{
    crypto::{SigningError, SigningKey},
    header::{FieldBody, FieldName, HeaderField, HeaderFields},
    message::{MalformedMessage, RawMessage},
    signature::{DkimSignature, DomainName, Selector, SignatureAlgorithm},
    signer::{
        sign, sign_message, ErrorKind, SignRequest, SignRequestBuilder, Signer, SignerError,
        SigningResult,
    },
    util::{decode_base64, encode_base64, Base64Error, CanonicalStr},
};
