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

//! The replies a session sends.
//!
//! See [`Reply`].

use std::fmt::Display;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::str::CRLF;

/// One line sent from the server to the client.
///
/// [`Display`] renders the code and text without the trailing [`CRLF`]; [`write`] adds it.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Reply<'a> {
    /// `220`, sent once when the session opens. Holds the banner text.
    Greeting(&'a str),
    /// `250 localhost`, the reply to `HELO`.
    Hello,
    /// `250 OK`.
    Ok,
    /// `354`, sent after `DATA` before the message is read.
    StartMailInput,
    /// `221`, sent after `QUIT` before the connection is closed.
    Closing,
    /// `421`, sent when the server shuts down under an open session.
    ShuttingDown,
    /// `500`, for a command that is not recognized.
    Unrecognized,
    /// `500`, for a command line longer than the configured limit.
    LineTooLong,
    /// `501`, for anything other than `HELO` before a `HELO`.
    BadParameters,
    /// `552`, for a message longer than the configured limit.
    TooMuchData,
}

impl Reply<'_> {
    /// The three-digit reply code.
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::Greeting(_) => 220,
            Self::Hello | Self::Ok => 250,
            Self::StartMailInput => 354,
            Self::Closing => 221,
            Self::ShuttingDown => 421,
            Self::Unrecognized | Self::LineTooLong => 500,
            Self::BadParameters => 501,
            Self::TooMuchData => 552,
        }
    }

    /// The human-readable text after the code.
    #[must_use]
    pub const fn text(&self) -> &str {
        match self {
            Self::Greeting(banner) => *banner,
            Self::Hello => "localhost",
            Self::Ok => "OK",
            Self::StartMailInput => "Start mail input; end with <CRLF>.<CRLF>",
            Self::Closing => "<domain> Service closing transmission channel",
            Self::ShuttingDown => "<domain> Service not available, closing transmission channel",
            Self::Unrecognized => "Syntax error, command unrecognized",
            Self::LineTooLong => "Line too long",
            Self::BadParameters => "Syntax error in parameters or arguments",
            Self::TooMuchData => "Too much mail data",
        }
    }
}

impl Display for Reply<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.code(), self.text())
    }
}

/// Send `reply` as one line and flush it.
///
/// # Errors
///
/// [`std::io::Error`] from [`AsyncWriteExt::write_all`] or [`AsyncWriteExt::flush`].
pub async fn write<W>(writer: &mut W, reply: Reply<'_>) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    tracing::debug!("S: {reply}");

    let line = format!("{reply}{CRLF}");
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}
