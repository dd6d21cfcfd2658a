use crate::crypto::HashAlgorithm;
use digest::{Digest, DynDigest};
use sha1::Sha1;
use sha2::Sha256;

/// Computes the message digest of the given bytes.
pub fn digest(hash_alg: HashAlgorithm, bytes: &[u8]) -> Box<[u8]> {
    digest_slices(hash_alg, [bytes])
}

/// Computes the message digest of the concatenation of the given slices.
pub fn digest_slices<I, T>(hash_alg: HashAlgorithm, slices: I) -> Box<[u8]>
where
    I: IntoIterator<Item = T>,
    T: AsRef<[u8]>,
{
    fn digest_all<D: Digest, I, T>(slices: I) -> Box<[u8]>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let mut hasher = D::new();
        for bytes in slices {
            hasher.update(bytes.as_ref());
        }
        Box::from(&hasher.finalize()[..])
    }

    match hash_alg {
        HashAlgorithm::Sha1 => digest_all::<Sha1, _, _>(slices),
        HashAlgorithm::Sha256 => digest_all::<Sha256, _, _>(slices),
    }
}

/// An incremental hasher for a hash algorithm selected at runtime.
pub struct Hasher {
    digest: Box<dyn DynDigest + Send>,
    bytes_written: usize,
}

impl Hasher {
    pub fn new(hash_alg: HashAlgorithm) -> Self {
        let digest: Box<dyn DynDigest + Send> = match hash_alg {
            HashAlgorithm::Sha1 => Box::new(Sha1::default()),
            HashAlgorithm::Sha256 => Box::new(Sha256::default()),
        };

        Self {
            digest,
            bytes_written: 0,
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        self.digest.update(bytes);
        self.bytes_written += bytes.len();
    }

    /// Returns the digest and the number of bytes that were digested.
    pub fn finish(self) -> (Box<[u8]>, usize) {
        (self.digest.finalize(), self.bytes_written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    #[test]
    fn hasher_ok() {
        let mut hasher = Hasher::new(HashAlgorithm::Sha256);
        hasher.update(b"a");
        hasher.update(b"");
        hasher.update(b"bc");

        let (hash, len) = hasher.finish();

        assert_eq!(hash, digest(HashAlgorithm::Sha256, b"abc"));
        assert_eq!(util::encode_base64(&hash), "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0=");
        assert_eq!(len, 3);
    }

    #[test]
    fn digest_rfc_examples() {
        // See RFC 6376, §3.4.3 and §3.4.4:
        let hash = digest(HashAlgorithm::Sha256, b"\r\n");
        assert_eq!(util::encode_base64(&hash), "frcCV1k9oG9oKj3dpUqdJg1PxRT2RSN/XKdLCPjaYaY=");

        let hash = digest(HashAlgorithm::Sha256, b"");
        assert_eq!(util::encode_base64(&hash), "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=");

        let hash = digest(HashAlgorithm::Sha1, b"\r\n");
        assert_eq!(util::encode_base64(&hash), "uoq1oCgLlTqpdDX/iUbLy7J1Wic=");

        let hash = digest(HashAlgorithm::Sha1, b"");
        assert_eq!(util::encode_base64(&hash), "2jmj7l5rSw0yVb/vlWAYkK/YBwk=");
    }

    #[test]
    fn digest_slices_ok() {
        assert_eq!(
            digest_slices(HashAlgorithm::Sha1, [&b"a"[..], &b"bc"[..]]),
            digest(HashAlgorithm::Sha1, b"abc")
        );
    }
}
