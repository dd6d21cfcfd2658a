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

//! Computation of the message hashes.

use crate::{
    canonicalize::{self, BodyCanonicalizer},
    crypto::{self, HashAlgorithm, Hasher},
    header::{FieldName, HeaderFields},
    signature::{CanonicalizationAlgorithm, DKIM_SIGNATURE_NAME},
};
use tracing::trace;

/// Computes the hash of the header data that is input to the signing
/// algorithm.
///
/// This covers the canonicalized selected headers, followed by the
/// canonicalized DKIM-Signature header with the given (not yet signed) value.
/// The DKIM-Signature header is not terminated with CRLF.
pub fn compute_data_hash(
    hash_alg: HashAlgorithm,
    canon_alg: CanonicalizationAlgorithm,
    headers: &HeaderFields,
    selected_headers: &[FieldName],
    dkim_sig_header_name: &str,
    formatted_dkim_sig_header_value: &str,
) -> Box<[u8]> {
    debug_assert!(dkim_sig_header_name.eq_ignore_ascii_case(DKIM_SIGNATURE_NAME));

    let cheaders = compute_data_input(
        canon_alg,
        headers,
        selected_headers,
        dkim_sig_header_name,
        formatted_dkim_sig_header_value,
    );

    trace!(input = ?bstr::BStr::new(&cheaders), "computing data hash");

    crypto::digest(hash_alg, &cheaders)
}

/// Produces the byte string over which the data hash is computed.
pub fn compute_data_input(
    canon_alg: CanonicalizationAlgorithm,
    headers: &HeaderFields,
    selected_headers: &[FieldName],
    dkim_sig_header_name: &str,
    formatted_dkim_sig_header_value: &str,
) -> Vec<u8> {
    // canonicalize selected headers
    let mut cheaders = canonicalize::canonicalize_headers(canon_alg, headers, selected_headers);

    // canonicalize DKIM-Signature header
    canonicalize::canonicalize_header(
        &mut cheaders,
        canon_alg,
        dkim_sig_header_name,
        formatted_dkim_sig_header_value,
    );

    cheaders
}

/// Computes the body hash of a complete message body.
pub fn compute_body_hash(
    hash_alg: HashAlgorithm,
    canon_alg: CanonicalizationAlgorithm,
    body: &[u8],
) -> Box<[u8]> {
    let mut hasher = BodyHasher::new(hash_alg, canon_alg);
    hasher.hash_chunk(body);
    hasher.finish().0
}

/// A body hasher that canonicalizes and digests the message body piece by
/// piece.
pub struct BodyHasher {
    canonicalizer: BodyCanonicalizer,
    hasher: Hasher,
}

impl BodyHasher {
    pub fn new(hash_alg: HashAlgorithm, canon_alg: CanonicalizationAlgorithm) -> Self {
        Self {
            canonicalizer: BodyCanonicalizer::new(canon_alg),
            hasher: Hasher::new(hash_alg),
        }
    }

    pub fn hash_chunk(&mut self, chunk: &[u8]) {
        let canonicalized_chunk = self.canonicalizer.canonicalize_chunk(chunk);
        self.hasher.update(&canonicalized_chunk);
    }

    /// Finishes hashing, returning the body hash and the length of the
    /// canonicalized body.
    pub fn finish(self) -> (Box<[u8]>, usize) {
        let Self { canonicalizer, mut hasher } = self;

        let canonicalized_chunk = canonicalizer.finish();
        hasher.update(&canonicalized_chunk);

        hasher.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util;

    #[test]
    fn body_hash_empty_body() {
        use CanonicalizationAlgorithm::*;

        for canon_alg in [Simple, Relaxed] {
            let bh = compute_body_hash(HashAlgorithm::Sha256, canon_alg, b"");
            assert_eq!(
                util::encode_base64(bh),
                "47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="
            );

            let bh = compute_body_hash(HashAlgorithm::Sha1, canon_alg, b"\r\n\r\n");
            assert_eq!(util::encode_base64(bh), "2jmj7l5rSw0yVb/vlWAYkK/YBwk=");
        }
    }

    #[test]
    fn body_hash_crlf_body() {
        let bh = compute_body_hash(HashAlgorithm::Sha256, CanonicalizationAlgorithm::Relaxed, b"abc");

        // canonical form "abc\r\n"
        assert_eq!(
            bh,
            crypto::digest(HashAlgorithm::Sha256, b"abc\r\n")
        );
    }

    #[test]
    fn body_hasher_chunked() {
        let body = b"Hello  there \r\n\r\nbye\r\n\r\n";

        let mut hasher = BodyHasher::new(HashAlgorithm::Sha256, CanonicalizationAlgorithm::Relaxed);
        for chunk in body.chunks(3) {
            hasher.hash_chunk(chunk);
        }
        let (bh, len) = hasher.finish();

        assert_eq!(bh, crypto::digest(HashAlgorithm::Sha256, b"Hello there\r\n\r\nbye\r\n"));
        assert_eq!(len, 20);
        assert_eq!(
            bh,
            compute_body_hash(HashAlgorithm::Sha256, CanonicalizationAlgorithm::Relaxed, body)
        );
    }

    #[test]
    fn data_input_ends_without_crlf() {
        let headers: HeaderFields = "From: me\r\nTo: you\r\n".parse().unwrap();
        let selected_headers = [FieldName::new("to").unwrap(), FieldName::new("from").unwrap()];

        let input = compute_data_input(
            CanonicalizationAlgorithm::Relaxed,
            &headers,
            &selected_headers,
            "DKIM-Signature",
            " v=1; a=rsa-sha256; b=",
        );

        assert_eq!(
            bstr::BStr::new(&input),
            bstr::BStr::new(b"to:you\r\nfrom:me\r\ndkim-signature:v=1; a=rsa-sha256; b=")
        );
    }
}
