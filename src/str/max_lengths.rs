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

//! The maximum length, in number of 8-bit bytes, of the items the session reader accepts.
//!
//! Note that the RFC values are *minimums*. SMTP servers must be able to handle at least these
//! limits, and may choose to exceed them.
//!
//! Per [RFC 821 section 4.5.3](https://www.rfc-editor.org/rfc/rfc821.html#section-4.5.3).

/// The maximum length of a command line (including the verb and line ending sequence) in
/// bytes.
///
/// [RFC 5321 § 4.5.3.1.4](https://www.rfc-editor.org/rfc/rfc5321.html#section-4.5.3.1.4).
pub const COMMAND_LINE: usize = 512;

/// The maximum length of a message (including both the headers and body) in bytes.
///
/// RFC 5321 only requires 64 000 bytes. Given the evolution of email, this is raised to 10 MiB,
/// which is still reasonable to hold in memory for a single session.
pub const MESSAGE: usize = 10 * 1024 * 1024;
