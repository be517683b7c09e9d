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

//! Reads from a client until a terminator sequence arrives.
//!
//! See [`read_terminated`].

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::error::{Error, Result};

/// Read line by line from `reader` into `buf` until `buf` ends with `terminator`.
///
/// A "line" is everything up to and including the next `'\n'`, so a terminator that spans
/// several lines (like [`crate::str::END_OF_DATA`]) is found as long as it ends in a line feed.
/// Bytes already in `buf` count towards both the terminator and `limit`.
///
/// # Errors
///
/// Whatever was read before the failure is left in `buf`.
///
/// - [`Error::TooLong`] once `buf` holds `limit` bytes without ending in `terminator`.
/// - [`Error::ConnectionClosed`] if the stream ends first.
/// - [`Error::Io`] from the underlying reader.
pub async fn read_terminated<R>(
    reader: &mut R,
    terminator: &[u8],
    limit: usize,
    buf: &mut Vec<u8>,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    loop {
        let remaining = limit.saturating_sub(buf.len());
        if remaining == 0 {
            return Err(Error::TooLong { limit });
        }

        // `take` keeps a single line that never sends `'\n'` from growing past the limit.
        let read = (&mut *reader)
            .take(u64::try_from(remaining).unwrap_or(u64::MAX))
            .read_until(b'\n', buf)
            .await?;

        if read == 0 {
            return Err(Error::ConnectionClosed);
        }

        if buf.ends_with(terminator) {
            return Ok(());
        }
    }
}
