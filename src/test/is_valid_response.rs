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

/// Checks whether a string is ASCII and ends with `CRLF`.
///
/// [RFC 821 section 4.2](https://www.rfc-editor.org/rfc/rfc821.html#section-4.2) replies are
/// a three-digit code, a space, some text, and `CRLF`.
#[inline]
pub fn smtp_line(str: &str) -> bool {
    str.ends_with("\r\n") && str.is_ascii()
}

/// Checks whether `str` is a reply line with `code`.
fn with_code(str: &str, code: &str) -> bool {
    smtp_line(str) && str.starts_with(code) && str.as_bytes().get(3) == Some(&b' ')
}

/// Checks if the server's opening message is the expected greeting.
pub fn server_greeting(str: &str) -> bool {
    str == "220 go-smtp-server\r\n"
}

/// Checks if the server accepted a `HELO`.
pub fn helo(str: &str) -> bool {
    str == "250 localhost\r\n"
}

/// Checks if the server accepted a `MAIL FROM:`, `RCPT TO:`, `RSET`, or `NOOP`.
pub fn ok(str: &str) -> bool {
    with_code(str, "250")
}

/// Checks if the server is ready for the message after `DATA`.
pub fn data(str: &str) -> bool {
    with_code(str, "354")
}

/// Checks if the server refused a command before `HELO`.
pub fn bad_parameters(str: &str) -> bool {
    with_code(str, "501")
}

/// Checks if the server's response to the `QUIT` command matches [RFC 821 page
/// 23](https://www.rfc-editor.org/rfc/rfc821.html#page-23).
pub fn quit(str: &str) -> bool {
    with_code(str, "221")
}

/// Checks if the server is closing the session because it is shutting down.
pub fn shutting_down(str: &str) -> bool {
    with_code(str, "421")
}
