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

//! The errors that can end a session.

use thiserror::Error;

/// Something went wrong reading from or writing to a client.
///
/// Protocol mistakes by the client are not errors; they are answered with a reply and the
/// session continues.
#[derive(Error, Debug)]
pub enum Error {
    /// The transport failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client closed its side of the connection before sending the terminator.
    #[error("connection closed by the client")]
    ConnectionClosed,

    /// More than `limit` bytes arrived without the terminator.
    #[error("input exceeded {limit} bytes without a terminator")]
    TooLong { limit: usize },

    /// The idle deadline passed before the terminator arrived.
    #[error("timed out waiting for the client")]
    TimedOut,

    /// The server is shutting down.
    #[error("session cancelled by server shutdown")]
    Cancelled,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
