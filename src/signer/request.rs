use crate::{
    header::FieldName,
    signature::{
        Canonicalization, CanonicalizationAlgorithm, DomainName, Identity, Selector,
        SignatureAlgorithm, DKIM_SIGNATURE_NAME,
    },
    signer::SignerError,
};
use std::{num::NonZeroUsize, time::Duration};
use tracing::warn;

/// A generator for the timestamp tag.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Timestamp {
    /// Use the current time at signing.
    #[default]
    Now,
    /// Use the given Unix time.
    Exact(u64),
}

/// A generator for the expiration tag.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Expiration {
    /// Expire at the given Unix time.
    At(u64),
    /// Expire the given duration after the signature timestamp.
    After(Duration),
}

/// Returns the header names signed by default.
///
/// Each name is listed twice: the second occurrence consumes a header field
/// that is added after signing, so that such an addition breaks the
/// signature.
pub fn default_signed_headers() -> Vec<FieldName> {
    let names = [
        "Date",
        "From",
        "To",
        "Message-ID",
        "Subject",
        "MIME-Version",
        "Content-Type",
        "Content-Transfer-Encoding",
        "List-Unsubscribe",
        "List-Id",
        "Reply-To",
        "Cc",
    ];

    names
        .into_iter()
        .chain(names)
        .filter_map(|n| FieldName::new(n).ok())
        .collect()
}

/// Formatting options.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OutputFormat {
    /// The header name, must be equal to `DKIM-Signature` ignoring case.
    pub header_name: String,
    /// The maximum line width in characters to use when breaking lines. The
    /// default is `None`: the header is not folded.
    pub line_width: Option<NonZeroUsize>,
    /// The indentation whitespace to use for continuation lines. Must be a
    /// non-empty sequence of space and tab characters. The default is `"\t"`.
    pub indentation: String,
}

impl Default for OutputFormat {
    fn default() -> Self {
        Self {
            header_name: DKIM_SIGNATURE_NAME.into(),
            line_width: None,
            indentation: "\t".into(),
        }
    }
}

/// A request for creation of a DKIM signature.
///
/// The request is the resolved signing configuration. It is only borrowed
/// during signing and may be reused for any number of messages.
#[derive(Clone, Debug, PartialEq)]
pub struct SignRequest<T> {
    /// The key to use for producing the cryptographic signature.
    pub signing_key: T,

    /// The signature algorithm to use in the *a=* tag.
    pub algorithm: SignatureAlgorithm,
    /// The canonicalization to use in the *c=* tag.
    pub canonicalization: Canonicalization,
    /// The header names to include in the *h=* tag, in this order.
    pub signed_headers: Vec<FieldName>,
    /// The signing domain to use in the *d=* tag.
    pub domain: DomainName,
    /// The agent or user identifier to use in the *i=* tag.
    pub identity: Option<Identity>,
    /// The selector to use in the *s=* tag.
    pub selector: Selector,
    /// The timestamp value to record in the *t=* tag.
    pub timestamp: Timestamp,
    /// The expiration to record in the *x=* tag.
    pub expiration: Option<Expiration>,

    /// The formatting options to use for producing the formatted
    /// *DKIM-Signature* header.
    pub format: OutputFormat,
}

impl<T> SignRequest<T> {
    /// Creates a request with default settings: relaxed/relaxed
    /// canonicalization, the default signed headers, timestamp now, no
    /// identity and no expiration.
    pub fn new(
        domain: DomainName,
        selector: Selector,
        algorithm: SignatureAlgorithm,
        signing_key: T,
    ) -> Self {
        use CanonicalizationAlgorithm::*;

        Self {
            signing_key,

            algorithm,
            canonicalization: (Relaxed, Relaxed).into(),
            signed_headers: default_signed_headers(),
            domain,
            identity: None,
            selector,
            timestamp: Timestamp::Now,
            expiration: None,

            format: Default::default(),
        }
    }
}

pub fn validate_request<T>(request: &SignRequest<T>) -> Result<(), SignerError> {
    validate_signed_headers(&request.signed_headers)?;

    if let Some(identity) = &request.identity {
        if !identity.domain_part.eq_or_subdomain_of(&request.domain) {
            return Err(SignerError::IdentityDomainMismatch);
        }
    }

    match (request.timestamp, request.expiration) {
        (Timestamp::Exact(t), Some(Expiration::At(x))) if x <= t => {
            return Err(SignerError::ExpirationNotAfterTimestamp);
        }
        (_, Some(Expiration::After(duration))) if duration.as_secs() == 0 => {
            return Err(SignerError::ExpirationNotAfterTimestamp);
        }
        _ => {}
    }

    let format = &request.format;
    if !format.header_name.eq_ignore_ascii_case(DKIM_SIGNATURE_NAME)
        || format.indentation.is_empty()
        || !format.indentation.chars().all(|c| matches!(c, ' ' | '\t'))
    {
        return Err(SignerError::InvalidOutputFormat);
    }

    Ok(())
}

// Names go into the h= tag as they are: no whitespace and no ‘;’ allowed.
fn validate_signed_headers(signed_headers: &[FieldName]) -> Result<(), SignerError> {
    if signed_headers
        .iter()
        .any(|name| name.as_ref() != name.trimmed() || name.as_ref().contains(';'))
    {
        return Err(SignerError::InvalidSignedHeaders);
    }

    if !signed_headers.iter().any(|name| *name == "From") {
        warn!("signed headers do not include From");
    }

    Ok(())
}
