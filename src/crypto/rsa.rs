use crate::crypto::{HashAlgorithm, SigningError};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha1::Sha1;
use sha2::Sha256;

/// Signs a message digest with RSASSA-PKCS1-v1_5.
///
/// `data_hash` is the already computed digest of the signing input, produced
/// with `hash_alg`.
pub fn sign_rsa(
    hash_alg: HashAlgorithm,
    private_key: &RsaPrivateKey,
    data_hash: &[u8],
) -> Result<Vec<u8>, SigningError> {
    let result = match hash_alg {
        HashAlgorithm::Sha1 => private_key.sign(Pkcs1v15Sign::new::<Sha1>(), data_hash),
        HashAlgorithm::Sha256 => private_key.sign(Pkcs1v15Sign::new::<Sha256>(), data_hash),
    };

    result.map_err(|_| SigningError::SigningFailure)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{self, SigningKey};
    use rsa::{pkcs8::DecodePublicKey, RsaPublicKey};

    const PRIVATE_KEY: &str = include_str!("../../tests/keys/rsa2048.pem");
    const PRIVATE_KEY_PKCS1: &str = include_str!("../../tests/keys/rsa2048_pkcs1.pem");
    const PUBLIC_KEY: &str = include_str!("../../tests/keys/rsa2048pub.pem");

    fn read_rsa_key(s: &str) -> RsaPrivateKey {
        match SigningKey::from_pem(s).unwrap() {
            SigningKey::Rsa(k) => k,
        }
    }

    #[test]
    fn read_rsa2048_key() {
        let privkey = read_rsa_key(PRIVATE_KEY);
        let privkey2 = read_rsa_key(PRIVATE_KEY_PKCS1);

        assert_eq!(privkey, privkey2);

        let signing_key = SigningKey::from(privkey);
        assert_eq!(signing_key.key_type(), crypto::KeyType::Rsa);
        assert_eq!(signing_key.signature_length(), 256);
    }

    #[test]
    fn sign_rsa_verifies() {
        let privkey = read_rsa_key(PRIVATE_KEY);
        let pubkey = RsaPublicKey::from_public_key_pem(PUBLIC_KEY).unwrap();

        for hash_alg in [HashAlgorithm::Sha1, HashAlgorithm::Sha256] {
            let data_hash = crypto::digest(hash_alg, b"hello");

            let signature = sign_rsa(hash_alg, &privkey, &data_hash).unwrap();

            assert_eq!(signature.len(), 256);

            let result = match hash_alg {
                HashAlgorithm::Sha1 => {
                    pubkey.verify(Pkcs1v15Sign::new::<Sha1>(), &data_hash, &signature)
                }
                HashAlgorithm::Sha256 => {
                    pubkey.verify(Pkcs1v15Sign::new::<Sha256>(), &data_hash, &signature)
                }
            };
            assert!(result.is_ok());

            // deterministic padding: signing again yields the same bytes
            assert_eq!(sign_rsa(hash_alg, &privkey, &data_hash).unwrap(), signature);
        }
    }

    #[test]
    fn sign_rsa_wrong_digest_length() {
        let privkey = read_rsa_key(PRIVATE_KEY);

        let data_hash = crypto::digest(HashAlgorithm::Sha1, b"hello");

        assert_eq!(
            sign_rsa(HashAlgorithm::Sha256, &privkey, &data_hash),
            Err(SigningError::SigningFailure)
        );
    }
}
