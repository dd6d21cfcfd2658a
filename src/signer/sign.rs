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

use crate::{
    crypto::{self, HashAlgorithm, SigningError, SigningKey},
    header::HeaderFields,
    message_hash,
    signer::{
        format::{self, UnsignedDkimSignature},
        Expiration, OutputFormat, SignRequest, SignerError, SigningResult, Timestamp,
    },
    util::CanonicalStr,
};
use std::time::SystemTime;
use tracing::trace;

pub fn perform_signing<T>(
    request: &SignRequest<T>,
    headers: &HeaderFields,
    body_hash: Box<[u8]>,
) -> Result<SigningResult, SignerError>
where
    T: AsRef<SigningKey>,
{
    // calculate timestamp and expiration

    let timestamp = match request.timestamp {
        Timestamp::Now => now_unix_secs(),
        Timestamp::Exact(t) => t,
    };

    let expiration = request.expiration.map(|expiration| match expiration {
        Expiration::At(x) => x,
        Expiration::After(duration) => timestamp.saturating_add(duration.as_secs()),
    });

    if let Some(expiration) = expiration {
        if expiration <= timestamp {
            return Err(SignerError::ExpirationNotAfterTimestamp);
        }
    }

    let signed_headers = &request.signed_headers;

    trace!(requested = signed_headers.len(), "signing headers");

    // prepare complete formatted signature header with body hash except with contents of b= tag

    let sig = UnsignedDkimSignature {
        algorithm: request.algorithm,
        body_hash,
        canonicalization: request.canonicalization,
        domain: request.domain.clone(),
        signed_headers: signed_headers.as_slice().into(),
        identity: request.identity.clone(),
        selector: request.selector.clone(),
        timestamp,
        expiration,
    };

    produce_signature(sig, request.signing_key.as_ref(), &request.format, headers)
}

fn produce_signature(
    sig: UnsignedDkimSignature,
    signing_key: &SigningKey,
    format: &OutputFormat,
    headers: &HeaderFields,
) -> Result<SigningResult, SignerError> {
    let (mut formatted_header_value, insertion_index) = sig.format_without_signature(format);

    let header_name = &format.header_name;

    let hash_alg = sig.algorithm.hash_algorithm();

    let data_hash = message_hash::compute_data_hash(
        hash_alg,
        sig.canonicalization.header,
        headers,
        &sig.signed_headers,
        header_name,
        &formatted_header_value,
    );

    trace!(
        key_type = signing_key.key_type().canonical_str(),
        hash_alg = hash_alg.canonical_str(),
        "signing data hash"
    );

    let signature_data = sign_hash(signing_key, hash_alg, &data_hash)?.into_boxed_slice();

    let sig = sig.into_signature(signature_data);

    // insert signature into formatted dkim-sig header

    format::insert_signature_data(
        &mut formatted_header_value,
        insertion_index,
        format,
        &sig.signature_data,
    );

    Ok(SigningResult {
        header_name: header_name.clone(),
        header_value: formatted_header_value,
        signature: sig,
    })
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_or(0, |t| t.as_secs())
}

fn sign_hash(
    signing_key: &SigningKey,
    hash_alg: HashAlgorithm,
    data_hash: &[u8],
) -> Result<Vec<u8>, SigningError> {
    match signing_key {
        SigningKey::Rsa(k) => match crypto::sign_rsa(hash_alg, k, data_hash) {
            Ok(s) => {
                trace!("RSA signing successful");
                Ok(s)
            }
            Err(e) => {
                trace!("RSA signing failed: {e}");
                Err(e)
            }
        },
    }
}
