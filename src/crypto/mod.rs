//! Cryptographic utilities.
//!
//! Signing uses RSA with PKCS#1 v1.5 padding, which is deterministic: the same
//! key and input always produce the same signature.

mod hash;
mod rsa;

pub use self::{
    hash::{digest, digest_slices, Hasher},
    rsa::sign_rsa,
};

use crate::util::CanonicalStr;
use ::rsa::{pkcs1::DecodeRsaPrivateKey, traits::PublicKeyParts, RsaPrivateKey};
use pkcs8::{der::pem::PemLabel, Document, PrivateKeyInfo};
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// A private key used to produce signatures.
#[derive(Debug)]
pub enum SigningKey {
    Rsa(RsaPrivateKey),
}

impl SigningKey {
    /// Reads a private key in PEM format, either PKCS#8 (`PRIVATE KEY`) or
    /// PKCS#1 (`RSA PRIVATE KEY`).
    pub fn from_pem(s: &str) -> Result<Self, SigningError> {
        Self::from_pkcs8_pem(s).or_else(|_| Self::from_pkcs1_pem(s))
    }

    pub fn from_pkcs8_pem(s: &str) -> Result<Self, SigningError> {
        let (label, private_key_der) =
            Document::from_pem(s).map_err(|_| SigningError::InvalidKey)?;

        PrivateKeyInfo::validate_pem_label(label).map_err(|_| SigningError::InvalidKey)?;

        let pk = PrivateKeyInfo::try_from(private_key_der.as_bytes())
            .map_err(|_| SigningError::InvalidKey)?;

        RsaPrivateKey::try_from(pk)
            .map(Self::Rsa)
            .map_err(|_| SigningError::InvalidKey)
    }

    pub fn from_pkcs1_pem(s: &str) -> Result<Self, SigningError> {
        RsaPrivateKey::from_pkcs1_pem(s)
            .map(Self::Rsa)
            .map_err(|_| SigningError::InvalidKey)
    }

    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Rsa(_) => KeyType::Rsa,
        }
    }

    /// Returns the length in bytes of signatures produced with this key.
    pub fn signature_length(&self) -> usize {
        match self {
            Self::Rsa(k) => k.size(),
        }
    }
}

impl AsRef<SigningKey> for SigningKey {
    fn as_ref(&self) -> &SigningKey {
        self
    }
}

impl From<RsaPrivateKey> for SigningKey {
    fn from(key: RsaPrivateKey) -> Self {
        Self::Rsa(key)
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum KeyType {
    Rsa,
}

impl CanonicalStr for KeyType {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Rsa => "rsa",
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HashAlgorithm {
    Sha1,
    Sha256,
}

impl CanonicalStr for HashAlgorithm {
    fn canonical_str(&self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
        }
    }
}

/// An error that occurs when reading a key or producing a signature.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SigningError {
    /// The key material could not be read or is not a supported key type.
    InvalidKey,
    /// The signing primitive failed, for example because the key is too small
    /// for the hash algorithm.
    SigningFailure,
}

impl Display for SigningError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidKey => write!(f, "invalid signing key"),
            Self::SigningFailure => write!(f, "signing failed"),
        }
    }
}

impl Error for SigningError {}
