use crate::{
    crypto::SigningKey,
    header::FieldName,
    signature::{
        Canonicalization, CanonicalizationAlgorithm, DomainName, Identity, Selector,
        SignatureAlgorithm,
    },
    signer::{
        request::{self, default_signed_headers},
        Expiration, OutputFormat, SignRequest, SignerError, Timestamp,
    },
};

/// A builder resolving loosely specified settings into a [`SignRequest`].
///
/// Settings are given as strings, the way they come out of a configuration
/// file or command line. Nothing is checked until [`build`][Self::build].
/// Builders can be layered with [`overlay`][Self::overlay], for example
/// site-wide defaults overlaid with per-domain settings.
///
/// # Examples
///
/// ```
/// use dkimsign::{SignRequestBuilder, SigningKey};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// # let key = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/keys/rsa2048.pem"));
/// let defaults = SignRequestBuilder::new()
///     .algorithm("rsa-sha256")
///     .header_canonicalization("relaxed")
///     .body_canonicalization("simple");
///
/// let request = defaults
///     .overlay(SignRequestBuilder::new().domain("example.com").selector("mail"))
///     .signing_key(SigningKey::from_pem(key)?)
///     .build()?;
///
/// assert_eq!(request.domain.as_ref(), "example.com");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug)]
pub struct SignRequestBuilder<T> {
    signing_key: Option<T>,
    domain: Option<String>,
    selector: Option<String>,
    algorithm: Option<String>,
    header_canonicalization: Option<String>,
    body_canonicalization: Option<String>,
    identity: Option<String>,
    signed_headers: Option<Vec<String>>,
    timestamp: Option<u64>,
    expiration: Option<Expiration>,
    format: Option<OutputFormat>,
}

impl<T> Default for SignRequestBuilder<T> {
    fn default() -> Self {
        Self {
            signing_key: None,
            domain: None,
            selector: None,
            algorithm: None,
            header_canonicalization: None,
            body_canonicalization: None,
            identity: None,
            signed_headers: None,
            timestamp: None,
            expiration: None,
            format: None,
        }
    }
}

impl<T> SignRequestBuilder<T> {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn signing_key(mut self, signing_key: T) -> Self {
        self.signing_key = Some(signing_key);
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Sets the signature algorithm, `rsa-sha256` or `rsa-sha1`.
    pub fn algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.algorithm = Some(algorithm.into());
        self
    }

    /// Sets the header canonicalization, `simple` or `relaxed`.
    pub fn header_canonicalization(mut self, canon: impl Into<String>) -> Self {
        self.header_canonicalization = Some(canon.into());
        self
    }

    /// Sets the body canonicalization, `simple` or `relaxed`.
    pub fn body_canonicalization(mut self, canon: impl Into<String>) -> Self {
        self.body_canonicalization = Some(canon.into());
        self
    }

    /// Sets the identity, in the form `[local-part]@domain`.
    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    /// Sets the header names to sign, in *h=* order.
    pub fn signed_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.signed_headers = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the signing time as Unix time. By default the current time at
    /// signing is used.
    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn expiration(mut self, expiration: Expiration) -> Self {
        self.expiration = Some(expiration);
        self
    }

    pub fn format(mut self, format: OutputFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Overlays this builder with another one: every setting present in
    /// `other` replaces the one in `self`.
    pub fn overlay(self, other: Self) -> Self {
        Self {
            signing_key: other.signing_key.or(self.signing_key),
            domain: other.domain.or(self.domain),
            selector: other.selector.or(self.selector),
            algorithm: other.algorithm.or(self.algorithm),
            header_canonicalization: other.header_canonicalization.or(self.header_canonicalization),
            body_canonicalization: other.body_canonicalization.or(self.body_canonicalization),
            identity: other.identity.or(self.identity),
            signed_headers: other.signed_headers.or(self.signed_headers),
            timestamp: other.timestamp.or(self.timestamp),
            expiration: other.expiration.or(self.expiration),
            format: other.format.or(self.format),
        }
    }
}

impl<T> SignRequestBuilder<T>
where
    T: AsRef<SigningKey>,
{
    /// Resolves the settings into a validated sign request.
    pub fn build(self) -> Result<SignRequest<T>, SignerError> {
        let domain = self.domain.ok_or(SignerError::MissingDomain)?;
        let domain = DomainName::new(&domain).map_err(|_| SignerError::InvalidDomain)?;

        let selector = self.selector.ok_or(SignerError::MissingSelector)?;
        let selector = Selector::new(&selector).map_err(|_| SignerError::InvalidSelector)?;

        let signing_key = self.signing_key.ok_or(SignerError::MissingSigningKey)?;

        let algorithm = match self.algorithm {
            Some(s) => s.parse().map_err(|_| SignerError::UnsupportedAlgorithm)?,
            None => SignatureAlgorithm::RsaSha256,
        };

        let header = parse_canonicalization(self.header_canonicalization.as_deref())?;
        let body = parse_canonicalization(self.body_canonicalization.as_deref())?;
        let canonicalization = Canonicalization { header, body };

        let identity = self
            .identity
            .map(|s| Identity::new(&s))
            .transpose()
            .map_err(|_| SignerError::InvalidIdentity)?;

        let signed_headers = match self.signed_headers {
            Some(names) => names
                .into_iter()
                .map(FieldName::new)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| SignerError::InvalidSignedHeaders)?,
            None => default_signed_headers(),
        };

        let timestamp = self.timestamp.map_or(Timestamp::Now, Timestamp::Exact);

        let request = SignRequest {
            signing_key,
            algorithm,
            canonicalization,
            signed_headers,
            domain,
            identity,
            selector,
            timestamp,
            expiration: self.expiration,
            format: self.format.unwrap_or_default(),
        };

        request::validate_request(&request)?;

        Ok(request)
    }
}

fn parse_canonicalization(s: Option<&str>) -> Result<CanonicalizationAlgorithm, SignerError> {
    match s {
        Some(s) => s.parse().map_err(|_| SignerError::UnsupportedCanonicalization),
        None => Ok(CanonicalizationAlgorithm::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::SigningKey;
    use std::sync::Arc;

    fn key() -> Arc<SigningKey> {
        Arc::new(SigningKey::from_pem(include_str!("../../tests/keys/rsa2048.pem")).unwrap())
    }

    fn complete() -> SignRequestBuilder<Arc<SigningKey>> {
        SignRequestBuilder::new()
            .domain("example.com")
            .selector("sel")
            .signing_key(key())
    }

    #[test]
    fn build_defaults() {
        use CanonicalizationAlgorithm::*;

        let request = complete().build().unwrap();

        assert_eq!(request.algorithm, SignatureAlgorithm::RsaSha256);
        assert_eq!(request.canonicalization, Canonicalization::from((Relaxed, Relaxed)));
        assert_eq!(request.signed_headers, default_signed_headers());
        assert_eq!(request.timestamp, Timestamp::Now);
        assert_eq!(request.identity, None);
        assert_eq!(request.expiration, None);
        assert_eq!(request.format, OutputFormat::default());
    }

    #[test]
    fn build_missing_settings() {
        let builder = SignRequestBuilder::new().selector("sel").signing_key(key());
        assert_eq!(builder.build().unwrap_err(), SignerError::MissingDomain);

        let builder = SignRequestBuilder::new().domain("example.com").signing_key(key());
        assert_eq!(builder.build().unwrap_err(), SignerError::MissingSelector);

        let builder = SignRequestBuilder::<Arc<SigningKey>>::new()
            .domain("example.com")
            .selector("sel");
        assert_eq!(builder.build().unwrap_err(), SignerError::MissingSigningKey);
    }

    #[test]
    fn build_unsupported_values() {
        let builder = complete().algorithm("ed25519-sha256");
        assert_eq!(builder.build().unwrap_err(), SignerError::UnsupportedAlgorithm);

        let builder = complete().body_canonicalization("nofws");
        assert_eq!(builder.build().unwrap_err(), SignerError::UnsupportedCanonicalization);

        let builder = complete().domain("example..com");
        assert_eq!(builder.build().unwrap_err(), SignerError::InvalidDomain);

        let builder = complete().identity("no-at-sign");
        assert_eq!(builder.build().unwrap_err(), SignerError::InvalidIdentity);

        let builder = complete().identity("me@example.org");
        assert_eq!(builder.build().unwrap_err(), SignerError::IdentityDomainMismatch);

        let builder = complete().signed_headers(["From", "Bad:Name"]);
        assert_eq!(builder.build().unwrap_err(), SignerError::InvalidSignedHeaders);
    }

    #[test]
    fn overlay_later_settings_win() {
        let base = SignRequestBuilder::new()
            .domain("example.com")
            .selector("base")
            .algorithm("rsa-sha1")
            .timestamp(100);

        let site = SignRequestBuilder::new()
            .selector("site")
            .header_canonicalization("simple")
            .signing_key(key());

        let request = base.overlay(site).build().unwrap();

        assert_eq!(request.domain.as_ref(), "example.com");
        assert_eq!(request.selector.as_ref(), "site");
        assert_eq!(request.algorithm, SignatureAlgorithm::RsaSha1);
        assert_eq!(
            request.canonicalization,
            Canonicalization::from((
                CanonicalizationAlgorithm::Simple,
                CanonicalizationAlgorithm::Relaxed,
            ))
        );
        assert_eq!(request.timestamp, Timestamp::Exact(100));
    }

    #[test]
    fn error_kinds() {
        use crate::signer::ErrorKind;

        assert_eq!(SignerError::MissingDomain.kind(), ErrorKind::Configuration);
        assert_eq!(
            SignerError::MalformedMessage(crate::message::MalformedMessage::InvalidHeader).kind(),
            ErrorKind::Input
        );
        assert_eq!(
            SignerError::Signing(crate::crypto::SigningError::InvalidKey).kind(),
            ErrorKind::Crypto
        );
    }
}
