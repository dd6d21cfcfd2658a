//! Canonicalization algorithms.
//!
//! Header canonicalization operates on single header fields, body
//! canonicalization on the message body, either as a whole or incrementally in
//! chunks. Both come in the two variants *simple* and *relaxed*.

use crate::{
    header::{FieldName, HeaderField, HeaderFields},
    parse::rstrip_wsp,
    select,
    signature::CanonicalizationAlgorithm,
};
use bstr::ByteSlice;

const SP: u8 = b' ';
const CR: u8 = b'\r';
const LF: u8 = b'\n';
const CRLF: [u8; 2] = [CR, LF];

// which state are we in = what did we see last?
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum CanonState {
    Init,
    CrLf,
    Cr,
    Wsp,
    WspCr,
    Byte,
}

/// A canonicalizer using the body canonicalization algorithm.
///
/// Trailing empty lines are held back until it is known whether more content
/// follows them, so that the output of `canonicalize_chunk` and `finish`
/// concatenated does not depend on how the body was split into chunks.
pub struct BodyCanonicalizer {
    kind: CanonicalizationAlgorithm,
    state: CanonState,
    blank_line: bool,  // whether currently on an empty or blank line
    empty_lines: usize,  // number of empty lines seen
}

impl BodyCanonicalizer {
    pub fn new(kind: CanonicalizationAlgorithm) -> Self {
        Self {
            kind,
            state: CanonState::Init,
            blank_line: true,
            empty_lines: 0,
        }
    }

    pub fn simple() -> Self {
        Self::new(CanonicalizationAlgorithm::Simple)
    }

    pub fn relaxed() -> Self {
        Self::new(CanonicalizationAlgorithm::Relaxed)
    }

    // canonicalisation recognises only CRLF as line separator/terminator, stray
    // CR and LF are treated like other bytes
    pub fn canonicalize_chunk(&mut self, bytes: &[u8]) -> Vec<u8> {
        match self.kind {
            CanonicalizationAlgorithm::Simple => self.canonicalize_chunk_simple(bytes),
            CanonicalizationAlgorithm::Relaxed => self.canonicalize_chunk_relaxed(bytes),
        }
    }

    fn canonicalize_chunk_simple(&mut self, bytes: &[u8]) -> Vec<u8> {
        let mut result = Vec::with_capacity(bytes.len());

        for &b in bytes {
            match self.state {
                CanonState::Init | CanonState::CrLf => {
                    if b == CR {
                        self.state = CanonState::Cr;
                    } else {
                        self.flush_empty_lines(&mut result);
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Cr => {
                    if b == LF {
                        self.end_line(&mut result);
                        continue;
                    }

                    self.flush_empty_lines(&mut result);
                    result.push(CR);

                    if b != CR {
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Byte => {
                    if b == CR {
                        self.state = CanonState::Cr;
                    } else {
                        result.push(b);
                    }
                }
                CanonState::Wsp | CanonState::WspCr => unreachable!(),
            }
        }

        result
    }

    fn canonicalize_chunk_relaxed(&mut self, bytes: &[u8]) -> Vec<u8> {
        fn is_wsp(b: u8) -> bool {
            matches!(b, b'\t' | b' ')
        }

        let mut result = Vec::with_capacity(bytes.len());

        for &b in bytes {
            match self.state {
                CanonState::Init | CanonState::CrLf | CanonState::Byte => {
                    if is_wsp(b) {
                        self.state = CanonState::Wsp;
                    } else if b == CR {
                        self.state = CanonState::Cr;
                    } else {
                        self.flush_empty_lines(&mut result);
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Wsp => {
                    if b == CR {
                        self.state = CanonState::WspCr;
                    } else if !is_wsp(b) {
                        self.flush_empty_lines(&mut result);
                        result.push(SP);
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::Cr => {
                    if b == LF {
                        self.end_line(&mut result);
                        continue;
                    }

                    self.flush_empty_lines(&mut result);
                    result.push(CR);

                    if is_wsp(b) {
                        self.state = CanonState::Wsp;
                    } else if b != CR {
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
                CanonState::WspCr => {
                    if b == LF {
                        // trailing whitespace is dropped
                        self.end_line(&mut result);
                        continue;
                    }

                    self.flush_empty_lines(&mut result);
                    result.push(SP);
                    result.push(CR);

                    if b == CR {
                        self.state = CanonState::Cr;
                    } else if is_wsp(b) {
                        self.state = CanonState::Wsp;
                    } else {
                        result.push(b);
                        self.state = CanonState::Byte;
                    }
                }
            }
        }

        result
    }

    /// Completes canonicalization and returns the final piece of output.
    ///
    /// A body that is empty or contains only empty lines canonicalizes to the
    /// empty string; any other body ends with CRLF.
    pub fn finish(mut self) -> Vec<u8> {
        match self.state {
            CanonState::Init | CanonState::CrLf => vec![],
            CanonState::Cr => {
                let mut result = vec![];
                self.flush_empty_lines(&mut result);
                result.push(CR);
                result.extend(CRLF);
                result
            }
            CanonState::Wsp => {
                debug_assert_eq!(self.kind, CanonicalizationAlgorithm::Relaxed);
                // final WSP is trailing whitespace: drop, and if the line was
                // blank drop it together with the held-back empty lines
                if self.blank_line {
                    vec![]
                } else {
                    CRLF.to_vec()
                }
            }
            CanonState::WspCr => {
                let mut result = vec![];
                self.flush_empty_lines(&mut result);
                result.push(SP);
                result.push(CR);
                result.extend(CRLF);
                result
            }
            CanonState::Byte => CRLF.to_vec(),
        }
    }

    fn end_line(&mut self, result: &mut Vec<u8>) {
        if self.blank_line {
            self.empty_lines += 1;
        } else {
            result.extend(CRLF);
            self.blank_line = true;
        }
        self.state = CanonState::CrLf;
    }

    // write out remembered empty lines after encountering/before processing
    // byte that ends a section of empty lines
    fn flush_empty_lines(&mut self, result: &mut Vec<u8>) {
        for _ in 0..self.empty_lines {
            result.extend(CRLF);
        }
        self.empty_lines = 0;
        self.blank_line = false;
    }
}

/// Canonicalizes a complete message body.
pub fn canonicalize_body(algorithm: CanonicalizationAlgorithm, body: &[u8]) -> Vec<u8> {
    let mut bc = BodyCanonicalizer::new(algorithm);
    let mut result = bc.canonicalize_chunk(body);
    result.extend(bc.finish());
    result
}

/// Produces the header canonicalization result for the header fields selected
/// by the given names.
///
/// Header fields are chosen as described in [`select::select_headers`]; each
/// selected field is canonicalized and terminated with CRLF, in the order of
/// `selected_headers`. Names without a remaining matching field contribute
/// nothing.
pub fn canonicalize_headers(
    algorithm: CanonicalizationAlgorithm,
    headers: &HeaderFields,
    selected_headers: &[FieldName],
) -> Vec<u8> {
    let mut result = vec![];

    for (name, value) in select::select_headers(headers, selected_headers).into_iter().flatten() {
        canonicalize_header(&mut result, algorithm, name, value);
        result.extend(CRLF);
    }

    result
}

/// Canonicalizes a single header field, returning it terminated with CRLF.
pub fn canonicalize_header_field(
    algorithm: CanonicalizationAlgorithm,
    (name, value): &HeaderField,
) -> Vec<u8> {
    let mut result = Vec::with_capacity(name.as_ref().len() + value.as_ref().len() + 3);
    canonicalize_header(&mut result, algorithm, name, value);
    result.extend(CRLF);
    result
}

/// Canonicalizes a header field into some result vector. No line terminator
/// is appended.
pub fn canonicalize_header(
    result: &mut Vec<u8>,
    algorithm: CanonicalizationAlgorithm,
    name: impl AsRef<str>,
    value: impl AsRef<[u8]>,
) {
    let name = name.as_ref();
    let value = value.as_ref();

    match algorithm {
        CanonicalizationAlgorithm::Simple => {
            result.extend(name.bytes());
            result.push(b':');
            result.extend(value);
        }
        CanonicalizationAlgorithm::Relaxed => {
            result.extend(rstrip_wsp(name).to_ascii_lowercase().bytes());
            result.push(b':');
            canonicalize_header_relaxed(result, value);
        }
    }
}

fn canonicalize_header_relaxed(result: &mut Vec<u8>, value: &[u8]) {
    fn is_wsp(c: char) -> bool {
        matches!(c, ' ' | '\t')
    }

    // unfold: a continuation line begins with WSP, which is kept and then
    // compressed below
    let value = value.replace(CRLF, b"");

    let value = value.trim_with(is_wsp);

    let mut compressing = false;
    for &b in value {
        if is_wsp(b.into()) {
            if !compressing {
                result.push(SP);
                compressing = true;
            }
        } else {
            result.push(b);
            compressing = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::FieldBody;
    use bstr::BStr;

    fn canon_relaxed(name: &str, value: &[u8]) -> Vec<u8> {
        let field = (FieldName::new(name).unwrap(), FieldBody::new(value).unwrap());
        canonicalize_header_field(CanonicalizationAlgorithm::Relaxed, &field)
    }

    #[test]
    fn canonicalize_header_relaxed_ok() {
        assert_eq!(BStr::new(&canon_relaxed("a", b"   b   c  ")), BStr::new(b"a:b c\r\n"));
        assert_eq!(BStr::new(&canon_relaxed("SUBJECT ", b" \t x")), BStr::new(b"subject:x\r\n"));
        assert_eq!(
            BStr::new(&canon_relaxed("To", b" you,\r\n\t them ,\r\n  all ")),
            BStr::new(b"to:you, them , all\r\n")
        );
        assert_eq!(BStr::new(&canon_relaxed("X-Empty", b"")), BStr::new(b"x-empty:\r\n"));
        assert_eq!(BStr::new(&canon_relaxed("X-Blank", b" \t ")), BStr::new(b"x-blank:\r\n"));
    }

    #[test]
    fn canonicalize_header_relaxed_idempotent() {
        let once = canon_relaxed("Subject", b"  Hello \t  world\r\n again  ");
        assert_eq!(BStr::new(&once), BStr::new(b"subject:Hello world again\r\n"));

        let (name, value) = once.strip_suffix(b"\r\n").unwrap().split_once_str(":").unwrap();
        let twice = canon_relaxed(std::str::from_utf8(name).unwrap(), value);

        assert_eq!(once, twice);
    }

    #[test]
    fn canonicalize_header_simple_ok() {
        let field = (
            FieldName::new("SubJect ").unwrap(),
            FieldBody::new(*b"  A \r\n\t b  ").unwrap(),
        );

        assert_eq!(
            BStr::new(&canonicalize_header_field(CanonicalizationAlgorithm::Simple, &field)),
            BStr::new(b"SubJect :  A \r\n\t b  \r\n")
        );
    }

    #[test]
    fn canonicalize_headers_relaxed_ok() {
        let headers = HeaderFields::from_vec(vec![
            ("from".to_owned(), b" Good \t ".to_vec()),
            ("to".to_owned(), b" see   me".to_vec()),
            ("Date".to_owned(), b" Fri 24\r\n\tfoo".to_vec()),
            ("To".to_owned(), b" another one".to_vec()),
        ])
        .unwrap();

        let selected_headers = vec![
            FieldName::new("to").unwrap(),
            FieldName::new("from").unwrap(),
            FieldName::new("to").unwrap(),
            FieldName::new("date").unwrap(),
        ];

        assert_eq!(
            BStr::new(&canonicalize_headers(
                CanonicalizationAlgorithm::Relaxed,
                &headers,
                &selected_headers,
            )),
            BStr::new(&b"to:another one\r\nfrom:Good\r\nto:see me\r\ndate:Fri 24 foo\r\n"[..]),
        );
    }

    #[test]
    fn canonicalize_headers_oversigned() {
        let headers = HeaderFields::from_vec(vec![
            ("From".to_owned(), b" me".to_vec()),
            ("Subject".to_owned(), b" hi".to_vec()),
        ])
        .unwrap();

        let selected_headers = vec![
            FieldName::new("Subject").unwrap(),
            FieldName::new("Subject").unwrap(),
            FieldName::new("Cc").unwrap(),
        ];

        assert_eq!(
            BStr::new(&canonicalize_headers(
                CanonicalizationAlgorithm::Simple,
                &headers,
                &selected_headers,
            )),
            BStr::new(b"Subject: hi\r\n"),
        );
    }

    #[test]
    fn body_canon_simple_ok() {
        let bc = BodyCanonicalizer::simple();

        let body = canonicalize_chunks(
            bc,
            &[b"well  hello \r\n", b"\r\n what agi \r\n\r\n", b"\r\n"],
        );

        assert_eq!(BStr::new(&body), BStr::new(b"well  hello \r\n\r\n what agi \r\n"));
    }

    #[test]
    fn body_canon_relaxed_basic() {
        let bc = BodyCanonicalizer::relaxed();

        let body = canonicalize_chunks(
            bc,
            &[b"well  hello \r\n", b"\r\n what agi \r\n\r\n", b"\r\n"],
        );

        assert_eq!(BStr::new(&body), BStr::new(b"well hello\r\n\r\n what agi\r\n"));
    }

    #[test]
    fn body_canon_relaxed_small_chunks() {
        let bc = BodyCanonicalizer::relaxed();

        let body = canonicalize_chunks(
            bc,
            &[
                b"well ",
                b" hello ",
                b"\r",
                b"\n\r",
                b"\n what agi \r\n\r\n",
                b"\r\n",
            ],
        );

        assert_eq!(BStr::new(&body), BStr::new(b"well hello\r\n\r\n what agi\r\n"));
    }

    #[test]
    fn body_canon_relaxed_initial_empty_lines() {
        let bc = BodyCanonicalizer::relaxed();

        let body = canonicalize_chunks(bc, &[b"\r\n\r\n", b"\ra \r", b"\nb  ", b"c"]);

        assert_eq!(BStr::new(&body), BStr::new(b"\r\n\r\n\ra\r\nb c\r\n"));
    }

    #[test]
    fn body_canon_trailing_empty_lines() {
        for alg in [CanonicalizationAlgorithm::Simple, CanonicalizationAlgorithm::Relaxed] {
            assert_eq!(canonicalize_body(alg, b"x\r\n\r\n\r\n"), b"x\r\n");
            assert_eq!(canonicalize_body(alg, b"x"), b"x\r\n");
            assert_eq!(canonicalize_body(alg, b"x\r\n"), b"x\r\n");
            assert_eq!(canonicalize_body(alg, b""), b"");
            assert_eq!(canonicalize_body(alg, b"\r\n"), b"");
            assert_eq!(canonicalize_body(alg, b"\r\n\r\n\r\n"), b"");
        }
    }

    #[test]
    fn body_canon_blank_lines() {
        use CanonicalizationAlgorithm::*;

        assert_eq!(canonicalize_body(Relaxed, b" \r\n\t\r\n"), b"");
        assert_eq!(canonicalize_body(Relaxed, b"\r\n  "), b"");
        assert_eq!(canonicalize_body(Relaxed, b"x \r\n \r\n"), b"x\r\n");
        assert_eq!(canonicalize_body(Relaxed, b"x\r\n \r\ny"), b"x\r\n\r\ny\r\n");

        assert_eq!(canonicalize_body(Simple, b" \r\n\t\r\n"), b" \r\n\t\r\n");
        assert_eq!(canonicalize_body(Simple, b"x \r\n \r\n\r\n"), b"x \r\n \r\n");
    }

    #[test]
    fn body_canon_chunking_is_irrelevant() {
        let body = b"  a  b \r\n\r\n \t\r\nc\rd \r\n\r\n\r\n";

        for alg in [CanonicalizationAlgorithm::Simple, CanonicalizationAlgorithm::Relaxed] {
            let whole = canonicalize_body(alg, body);

            let chunks: Vec<&[u8]> = body.chunks(1).collect();
            let bytewise = canonicalize_chunks(BodyCanonicalizer::new(alg), &chunks);

            assert_eq!(BStr::new(&whole), BStr::new(&bytewise));
        }
    }

    fn canonicalize_chunks(mut bc: BodyCanonicalizer, chunks: &[&[u8]]) -> Vec<u8> {
        let mut result = vec![];
        for c in chunks {
            result.extend(bc.canonicalize_chunk(c));
        }
        result.extend(bc.finish());
        result
    }
}
