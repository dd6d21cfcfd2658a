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
    header::FieldName,
    signature::{
        Canonicalization, DkimSignature, DomainName, Identity, Selector, SignatureAlgorithm,
    },
    signer::OutputFormat,
    util::{self, CanonicalStr},
};
use std::{fmt::Write, iter};

// Note: Careful with offsets: formatting works with *characters*, not bytes!

/// DKIM signature data that does not yet have a cryptographic signature.
pub struct UnsignedDkimSignature {
    pub algorithm: SignatureAlgorithm,
    pub body_hash: Box<[u8]>,
    pub canonicalization: Canonicalization,
    pub domain: DomainName,
    pub signed_headers: Box<[FieldName]>,
    pub identity: Option<Identity>,
    pub selector: Selector,
    pub timestamp: u64,
    pub expiration: Option<u64>,
}

impl UnsignedDkimSignature {
    /// Returns the formatted signature header value with an empty *b=* tag,
    /// and the index where the *b=* tag value is to be inserted.
    pub fn format_without_signature(&self, format: &OutputFormat) -> (String, usize) {
        format_without_signature(self, format)
    }

    pub fn into_signature(self, signature_data: Box<[u8]>) -> DkimSignature {
        DkimSignature {
            algorithm: self.algorithm,
            signature_data,
            body_hash: self.body_hash,
            canonicalization: self.canonicalization,
            domain: self.domain,
            signed_headers: self.signed_headers,
            identity: self.identity,
            selector: self.selector,
            timestamp: self.timestamp,
            expiration: self.expiration,
        }
    }
}

// Ephemeral context holding current formatting options.
#[derive(Clone, Copy)]
struct Fmt<'a> {
    width: usize,
    indent: &'a str,
    last: bool,
}

impl<'a> Fmt<'a> {
    fn new(format: &'a OutputFormat) -> Self {
        // without a line width the header stays on one line
        let width = format.line_width.map_or(usize::MAX, |w| w.get());
        Self {
            width,
            indent: &format.indentation,
            last: false,
        }
    }
}

// Tags are always written in the order v, a, c, d, i, q, s, t, x, bh, h, b.
fn format_without_signature(sig: &UnsignedDkimSignature, format: &OutputFormat) -> (String, usize) {
    let fmt = Fmt::new(format);

    // The starting point of cursor `i` is just past header name + ':'.
    let mut output = String::new();
    let mut i = format.header_name.chars().count() + 1;

    let out = &mut output;
    let i = &mut i;

    format_tag(out, i, fmt, "v", "1");
    format_tag(out, i, fmt, "a", sig.algorithm.canonical_str());
    format_tag(out, i, fmt, "c", sig.canonicalization.canonical_str());
    format_tag_d(out, i, fmt, &sig.domain);
    if let Some(identity) = &sig.identity {
        format_tag_i(out, i, fmt, identity);
    }
    format_tag(out, i, fmt, "q", "dns/txt");
    format_tag_s(out, i, fmt, &sig.selector);
    format_tag(out, i, fmt, "t", &sig.timestamp.to_string());
    if let Some(expiration) = sig.expiration {
        format_tag(out, i, fmt, "x", &expiration.to_string());
    }
    format_tag_bh(out, i, fmt, &sig.body_hash);
    format_tag_h(out, i, fmt, &sig.signed_headers);

    let insertion_i = format_tag_name_b(out, i, Fmt { last: true, ..fmt });

    (output, insertion_i)
}

// Note: Throughout, `out` is the final formatted output. `i` is the ‘cursor’ in
// the current line, based on *characters*, not bytes!

fn format_tag_d(out: &mut String, i: &mut usize, fmt: Fmt<'_>, domain: &DomainName) {
    format_tag(out, i, fmt, "d", domain.as_ref());
}

fn format_tag_s(out: &mut String, i: &mut usize, fmt: Fmt<'_>, selector: &Selector) {
    format_tag(out, i, fmt, "s", selector.as_ref());
}

fn format_tag_i(out: &mut String, i: &mut usize, fmt: Fmt<'_>, identity: &Identity) {
    format_tag(out, i, fmt, "i", &identity.to_string());
}

fn format_tag(out: &mut String, i: &mut usize, fmt: Fmt<'_>, name: &str, value: &str) {
    debug_assert!(name.is_ascii());

    let Fmt { last, .. } = fmt;

    // name + '=' + val [+ ';']
    let taglen = name.len() + value.chars().count() + if last { 1 } else { 2 };

    advance_i_initial(out, i, taglen, fmt);
    out.push_str(name);
    out.push('=');
    out.push_str(value);

    if !last {
        out.push(';');
    }
}

fn format_tag_h(out: &mut String, i: &mut usize, fmt: Fmt<'_>, value: &[FieldName]) {
    let Fmt { last, .. } = fmt;

    let mut names = value.iter().map(|f| f.as_ref()).peekable();

    let first_name = names.next().unwrap_or_default();

    // "h=" + name [+ ';'/':']
    let taglen = first_name.chars().count() + if names.peek().is_none() && last { 2 } else { 3 };

    advance_i_initial(out, i, taglen, fmt);
    out.push_str("h=");
    out.push_str(first_name);
    // now still need to write ;/: to match current i, this is done right away in the next stmt below

    while let Some(name) = names.next() {
        out.push(':');

        // name [+ ';'/':']
        let len = name.chars().count() + if names.peek().is_none() && last { 0 } else { 1 };

        advance_i(out, i, len, fmt);
        out.push_str(name);
        // again, still need to write ;/:, it is done right away
    }

    if !last {
        out.push(';');
    }
}

fn format_tag_bh(out: &mut String, i: &mut usize, fmt: Fmt<'_>, value: &[u8]) {
    let Fmt { last, .. } = fmt;

    let value = util::encode_base64(value);

    // "bh=" + 1 char (we prefer at least one additional char behind =)
    let taglen = 4;

    advance_i_initial(out, i, taglen, fmt);
    *i -= 1;  // backwards again before the ghost character
    out.push_str("bh=");

    format_chunks_into_string(out, i, fmt, &value);

    // if final chunk makes line *width* chars long, the final ; will be
    // appended nevertheless (giving a width of *width + 1*; this is fine)
    if !last {
        out.push(';');
        *i += 1;
    }
}

// The b= tag comes last, its value is inserted after signing.
fn format_tag_name_b(out: &mut String, i: &mut usize, fmt: Fmt<'_>) -> usize {
    // "b=" + 1 char (we prefer at least one additional char behind =)
    let taglen = 3;
    advance_i_initial(out, i, taglen, fmt);
    *i -= 1;  // backwards again before the ghost character
    out.push_str("b=");

    out.len()
}

/// Advances the cursor `i`, making space for an item of length `len`, inserting
/// line break and indentation if necessary.
fn advance_i(out: &mut String, i: &mut usize, len: usize, fmt: Fmt<'_>) {
    let Fmt { width, indent, .. } = fmt;

    if i.saturating_add(len) <= width {
        *i += len;
    } else {
        out.push_str("\r\n");
        out.push_str(indent);
        *i = indent.chars().count() + len;
    }
}

fn advance_i_initial(out: &mut String, i: &mut usize, len: usize, fmt: Fmt<'_>) {
    let Fmt { width, indent, .. } = fmt;

    // + 1 for initial SP
    if i.saturating_add(len + 1) <= width {
        out.push(' ');
        *i += len + 1;
    } else {
        out.push_str("\r\n");
        out.push_str(indent);
        *i = indent.chars().count() + len;
    }
}

fn format_chunks_into_string(out: &mut String, i: &mut usize, fmt: Fmt<'_>, mut s: &str) {
    let Fmt { width, indent, .. } = fmt;

    let first_chunk_len = width.saturating_sub(*i);
    let first_chunk_len = first_chunk_len.min(s.chars().count());

    if first_chunk_len > 0 {
        let c = match s.char_indices().nth(first_chunk_len) {
            Some((c, _)) => c,
            None => s.len(),
        };
        let first_chunk;
        (first_chunk, s) = s.split_at(c);
        out.push_str(first_chunk);
        *i += first_chunk.chars().count();
    }

    let chunk_width = width.saturating_sub(indent.chars().count()).max(1);  // no empty chunks
    let chunks = iter::from_fn(|| {
        if s.is_empty() {
            None
        } else {
            let chunk;
            match s.char_indices().nth(chunk_width) {
                Some((c, _)) => {
                    (chunk, s) = s.split_at(c);
                    Some(chunk)
                }
                None => {
                    (chunk, s) = s.split_at(s.len());
                    Some(chunk)
                }
            }
        }
    });

    for chunk in chunks {
        let _ = write!(out, "\r\n{indent}{chunk}");
        *i = chunk.chars().count() + indent.chars().count();
    }
}

/// Inserts the Base64-encoded signature data into the formatted header value
/// at the insertion index, continuing the line folding of `format`.
pub fn insert_signature_data(
    formatted_header: &mut String,
    insertion_index: usize,
    format: &OutputFormat,
    signature_data: &[u8],
) {
    debug_assert!(insertion_index <= formatted_header.len());

    let fmt = Fmt::new(format);

    let s = util::encode_base64(signature_data);
    // s contains only ASCII now

    let formatted_header_pre = &formatted_header[..insertion_index];

    let mut it = formatted_header_pre.rsplit("\r\n");
    let last_line = it.next().unwrap_or_default();
    let mut len = if it.next().is_some() {
        last_line.chars().count()
    } else {
        format.header_name.chars().count() + last_line.chars().count() + 1
    };

    let mut result = String::with_capacity(s.len());
    format_chunks_into_string(&mut result, &mut len, fmt, &s);

    formatted_header.insert_str(insertion_index, &result);
}
