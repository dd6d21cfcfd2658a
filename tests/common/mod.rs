use dkimsign::{
    crypto::{self, SigningKey},
    header::HeaderFields,
    message_hash,
    signature::SignatureAlgorithm,
    SigningResult,
};
use rsa::{pkcs8::DecodePublicKey, Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::Sha256;
use std::io;
use tokio::fs;

pub async fn read_signing_key_from_file(file_name: &str) -> io::Result<SigningKey> {
    let s = fs::read_to_string(file_name).await?;
    Ok(SigningKey::from_pem(&s).unwrap())
}

pub async fn read_public_key_from_file(file_name: &str) -> io::Result<RsaPublicKey> {
    let s = fs::read_to_string(file_name).await?;
    Ok(RsaPublicKey::from_public_key_pem(&s).unwrap())
}

/// Removes the value of the final *b=* tag, including folding whitespace.
pub fn strip_signature_data(header_value: &str) -> String {
    let (tags, last) = header_value.rsplit_once(';').unwrap();
    let (b, _) = last.split_once('=').unwrap();
    format!("{tags};{b}=")
}

/// Reproduces the signing input from the output header: selected headers
/// followed by the header with empty *b=* tag.
pub fn signing_input(headers: &HeaderFields, result: &SigningResult) -> Vec<u8> {
    let sig = &result.signature;

    message_hash::compute_data_input(
        sig.canonicalization.header,
        headers,
        &sig.signed_headers,
        &result.header_name,
        &strip_signature_data(&result.header_value),
    )
}

/// Verifies the signature in the result against the given header fields.
pub fn verify(public_key: &RsaPublicKey, headers: &HeaderFields, result: &SigningResult) -> bool {
    let sig = &result.signature;

    // the b= tag value must be the signature data
    let (_, last) = result.header_value.rsplit_once(';').unwrap();
    let (_, b) = last.split_once('=').unwrap();
    let b: String = b.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    if dkimsign::decode_base64(&b).unwrap() != &sig.signature_data[..] {
        return false;
    }

    let input = signing_input(headers, result);
    let data_hash = crypto::digest(sig.algorithm.hash_algorithm(), &input);

    let scheme = match sig.algorithm {
        SignatureAlgorithm::RsaSha1 => Pkcs1v15Sign::new::<Sha1>(),
        SignatureAlgorithm::RsaSha256 => Pkcs1v15Sign::new::<Sha256>(),
    };

    public_key.verify(scheme, &data_hash, &sig.signature_data).is_ok()
}
