// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright © 2024 RemasteredArch
//
// This file is part of smtp_frontend.
//
// smtp_frontend is free software: you can redistribute it and/or modify it under the terms of the
// GNU Affero General Public License as published by the Free Software Foundation, either version
// 3 of the License, or (at your option) any later version.
//
// smtp_frontend is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See
// the GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License along with
// smtp_frontend. If not, see <https://www.gnu.org/licenses/>.

//! Wire-level text constants and helpers shared by the reader, the command parser, and the
//! session driver.

pub(crate) mod max_lengths;

/// The line ending sequence required by [RFC 821 section
/// 2](https://www.rfc-editor.org/rfc/rfc821.html#section-2).
pub const CRLF: &str = "\r\n";

/// The sequence that ends the mail data after a `DATA` command: a line holding only a period.
///
/// [RFC 821 section 4.1.1](https://www.rfc-editor.org/rfc/rfc821.html#page-20).
pub const END_OF_DATA: &str = "\r\n.\r\n";

/// Normalize a raw command line for dispatch.
///
/// Strips spaces, carriage returns, and line feeds from both ends, then upper-cases the entire
/// line. Verb matching is case-insensitive because of this, but so is everything after the verb.
///
/// ```rust
/// # use smtp_frontend::str::normalize_command;
/// assert_eq!(normalize_command("  mail from:<a@b>  \r\n"), "MAIL FROM:<A@B>");
/// assert_eq!(normalize_command("\r\n"), "");
/// ```
#[must_use]
pub fn normalize_command(raw: &str) -> String {
    raw.trim_matches([' ', '\r', '\n']).to_uppercase()
}

/// Undo the transparency procedure of [RFC 821 section
/// 4.5.2](https://www.rfc-editor.org/rfc/rfc821.html#section-4.5.2).
///
/// A sender doubles the leading period of any line that starts with one, so that a lone `"."` in
/// the text cannot end the mail data early. This removes the first period from every line that
/// starts with one.
///
/// If no line starts with a period, the body is returned unchanged.
#[must_use]
pub fn unstuff_dots(body: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(body.len());
    let mut at_line_start = true;

    for &byte in body {
        if !(at_line_start && byte == b'.') {
            output.push(byte);
        }

        at_line_start = byte == b'\n';
    }

    output
}
