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

//! Common parsing utilities.

pub const CRLF: &str = "\r\n";

// RFC 5234, appendix B.1

pub fn is_wsp(c: char) -> bool {
    matches!(c, ' ' | '\t')
}

/// Strips trailing whitespace (WSP, not FWS).
pub fn rstrip_wsp(input: &str) -> &str {
    input.trim_end_matches(is_wsp)
}

/// Whether a line is a header field continuation line.
pub fn is_continuation_line(line: &str) -> bool {
    line.starts_with(is_wsp)
}
