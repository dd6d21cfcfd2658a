//! Selection of header fields for signing.

use crate::header::{FieldName, HeaderField, HeaderFields};

/// Selects the header field instances to sign, one slot per requested name.
///
/// Header fields are consumed from the bottom of the header up: for each
/// requested name the last not yet consumed header field with that name
/// (compared case-insensitively) is chosen. Once all instances of a name are
/// used up, further requests for it yield `None`; such a request still
/// belongs into the `h=` tag, where it prevents a header field of that name
/// from being added later without breaking the signature.
pub fn select_headers<'a>(
    headers: &'a HeaderFields,
    selected_headers: &[FieldName],
) -> Vec<Option<&'a HeaderField>> {
    let headers = headers.as_ref();

    let mut consumed = vec![false; headers.len()];

    selected_headers
        .iter()
        .map(|selected| {
            let i = headers
                .iter()
                .enumerate()
                .rev()
                .find(|(i, (name, _))| !consumed[*i] && name == selected)
                .map(|(i, _)| i)?;
            consumed[i] = true;
            Some(&headers[i])
        })
        .collect()
}
