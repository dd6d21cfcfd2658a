//! Signer and supporting types.
//!
//! A [`SignRequest`] holds the resolved signing configuration. It is either
//! constructed directly or resolved from loosely specified string settings
//! with a [`SignRequestBuilder`]. The [`Signer`] then signs one message with
//! it: headers are given up front, the body is fed in chunks.
//!
//! For the common case of signing a complete message in memory, use
//! [`sign_message`] or [`sign`].

mod builder;
mod format;
mod request;
mod sign;

pub use crate::signer::{
    builder::SignRequestBuilder,
    request::{default_signed_headers, Expiration, OutputFormat, SignRequest, Timestamp},
};

use crate::{
    crypto::{SigningError, SigningKey},
    header::HeaderFields,
    message::{MalformedMessage, RawMessage},
    message_hash::BodyHasher,
    signature::DkimSignature,
};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};
use tracing::trace;

/// The kind of a [`SignerError`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// The signing configuration is incomplete or invalid.
    Configuration,
    /// The message to be signed cannot be processed.
    Input,
    /// The signing key is unusable or the signing primitive failed.
    Crypto,
}

/// An error that occurs when using a [`Signer`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SignerError {
    MissingDomain,
    MissingSelector,
    MissingSigningKey,
    UnsupportedAlgorithm,
    UnsupportedCanonicalization,
    InvalidDomain,
    InvalidSelector,
    InvalidIdentity,
    IdentityDomainMismatch,
    InvalidSignedHeaders,
    ExpirationNotAfterTimestamp,
    InvalidOutputFormat,
    MalformedMessage(MalformedMessage),
    Signing(SigningError),
}

impl SignerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedMessage(_) => ErrorKind::Input,
            Self::Signing(_) => ErrorKind::Crypto,
            _ => ErrorKind::Configuration,
        }
    }
}

impl Display for SignerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingDomain => write!(f, "no signing domain configured"),
            Self::MissingSelector => write!(f, "no selector configured"),
            Self::MissingSigningKey => write!(f, "no signing key configured"),
            Self::UnsupportedAlgorithm => write!(f, "unsupported signature algorithm"),
            Self::UnsupportedCanonicalization => write!(f, "unsupported canonicalization"),
            Self::InvalidDomain => write!(f, "invalid signing domain"),
            Self::InvalidSelector => write!(f, "invalid selector"),
            Self::InvalidIdentity => write!(f, "invalid agent or user identifier"),
            Self::IdentityDomainMismatch => {
                write!(f, "identifier domain not a subdomain of signing domain")
            }
            Self::InvalidSignedHeaders => write!(f, "invalid signed headers"),
            Self::ExpirationNotAfterTimestamp => write!(f, "expiration not after timestamp"),
            Self::InvalidOutputFormat => write!(f, "invalid output format"),
            Self::MalformedMessage(e) => write!(f, "malformed message: {e}"),
            Self::Signing(e) => write!(f, "{e}"),
        }
    }
}

impl Error for SignerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MalformedMessage(e) => Some(e),
            Self::Signing(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MalformedMessage> for SignerError {
    fn from(error: MalformedMessage) -> Self {
        Self::MalformedMessage(error)
    }
}

impl From<SigningError> for SignerError {
    fn from(error: SigningError) -> Self {
        Self::Signing(error)
    }
}

/// The result of signing a message.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningResult {
    pub signature: DkimSignature,
    /// The header name, as configured in the output format.
    pub header_name: String,
    /// The header value: all text after the colon, including the initial
    /// space and any line breaks from folding.
    pub header_value: String,
}

impl SigningResult {
    /// Returns the complete header, `name:value`, without line terminator.
    ///
    /// Name and value are joined with only a colon, as signed.
    pub fn format_header(&self) -> String {
        format!("{}:{}", self.header_name, self.header_value)
    }

    /// Returns the complete header terminated with CRLF, ready to be
    /// prepended to the message.
    pub fn to_header_line(&self) -> String {
        let mut line = self.format_header();
        line.push_str("\r\n");
        line
    }
}

/// A signer for an email message.
///
/// # Examples
///
/// ```
/// use dkimsign::{
///     signature::{DomainName, Selector, SignatureAlgorithm},
///     HeaderFields, SignRequest, Signer, SigningKey,
/// };
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let key = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/keys/rsa2048.pem"));
/// let signing_key = SigningKey::from_pem(key)?;
///
/// let request = SignRequest::new(
///     DomainName::new("example.com")?,
///     Selector::new("selector")?,
///     SignatureAlgorithm::RsaSha256,
///     signing_key,
/// );
///
/// let headers: HeaderFields = "From: me@example.com\r\nTo: you@example.org\r\n".parse()?;
/// let body = b"Hello!\r\n";
///
/// let mut signer = Signer::prepare_signing(&request, headers)?;
/// signer.process_body_chunk(body);
/// let result = signer.finish()?;
///
/// assert!(result.format_header().starts_with("DKIM-Signature: v=1; a=rsa-sha256;"));
/// # Ok(())
/// # }
/// ```
pub struct Signer<'a, T> {
    request: &'a SignRequest<T>,
    headers: HeaderFields,
    body_hasher: BodyHasher,
}

impl<'a, T> Signer<'a, T>
where
    T: AsRef<SigningKey>,
{
    /// Prepares a message signing process.
    pub fn prepare_signing(
        request: &'a SignRequest<T>,
        headers: HeaderFields,
    ) -> Result<Self, SignerError> {
        request::validate_request(request)?;

        let hash_alg = request.algorithm.hash_algorithm();
        let body_hasher = BodyHasher::new(hash_alg, request.canonicalization.body);

        Ok(Self {
            request,
            headers,
            body_hasher,
        })
    }

    /// Processes a chunk of the message body.
    ///
    /// Note that the chunk is canonicalised and hashed, but not otherwise
    /// retained in memory.
    pub fn process_body_chunk(&mut self, chunk: &[u8]) {
        self.body_hasher.hash_chunk(chunk);
    }

    /// Computes the signature and returns the formatted signature header.
    pub fn finish(self) -> Result<SigningResult, SignerError> {
        let (body_hash, body_len) = self.body_hasher.finish();

        trace!(body_len, "body hash computed");

        sign::perform_signing(self.request, &self.headers, body_hash)
    }
}

/// Signs a complete message, given as text, and returns the signature.
///
/// Line endings are normalized to CRLF before processing.
pub fn sign_message<T>(request: &SignRequest<T>, message: &str) -> Result<SigningResult, SignerError>
where
    T: AsRef<SigningKey>,
{
    sign_raw_message(request, &RawMessage::new(message))
}

/// Signs a complete message given as bytes. The message must be UTF-8 text.
pub fn sign_message_bytes<T>(
    request: &SignRequest<T>,
    message: &[u8],
) -> Result<SigningResult, SignerError>
where
    T: AsRef<SigningKey>,
{
    let message = RawMessage::from_bytes(message)?;
    sign_raw_message(request, &message)
}

/// Signs a message that has already been normalized.
pub fn sign_raw_message<T>(
    request: &SignRequest<T>,
    message: &RawMessage,
) -> Result<SigningResult, SignerError>
where
    T: AsRef<SigningKey>,
{
    let (headers, body) = message.parse()?;

    let mut signer = Signer::prepare_signing(request, headers)?;
    signer.process_body_chunk(body.as_bytes());
    signer.finish()
}

/// Signs a complete message and returns it with the *DKIM-Signature* header
/// prepended.
///
/// The returned message has CRLF line endings throughout.
pub fn sign<T>(request: &SignRequest<T>, message: &str) -> Result<String, SignerError>
where
    T: AsRef<SigningKey>,
{
    let message = RawMessage::new(message);

    let result = sign_raw_message(request, &message)?;

    let mut signed = result.to_header_line();
    signed.push_str(message.as_ref());
    Ok(signed)
}
