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

//! Everything about a [`crate::Server`] that can be changed without touching the protocol.
//!
//! See [`Config`].

use std::{net::IpAddr, time::Duration};

use crate::{str::max_lengths, timeouts};

/// The port the server listens on unless told otherwise.
pub const DEFAULT_PORT: u16 = 6666;

/// The text of the `220` greeting unless told otherwise.
pub const DEFAULT_BANNER: &str = "go-smtp-server";

/// Settings shared by the listener and every session it starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The address to bind the listening socket to.
    pub address: IpAddr,
    /// The TCP port to bind the listening socket to.
    pub port: u16,
    /// The text sent after `220` when a session opens.
    pub banner: String,
    /// How long a read may wait for a complete line or message.
    pub idle_timeout: Duration,
    /// When the [`Self::idle_timeout`] is measured from.
    pub deadline: DeadlinePolicy,
    /// The longest command line accepted, in bytes, including the `CRLF`.
    pub max_command_len: usize,
    /// The longest message accepted after `DATA`, in bytes, including the terminating `.` line.
    pub max_message_len: usize,
    /// How many sessions may be open at once. Further connections wait in the accept backlog.
    pub max_sessions: u32,
    /// What a repeated `RCPT TO` does to the envelope.
    pub recipients: RecipientPolicy,
    /// What is sent once the message after `DATA` has been handed to the sink.
    pub data_reply: DataReply,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            address: IpAddr::from([0, 0, 0, 0]),
            port: DEFAULT_PORT,
            banner: DEFAULT_BANNER.to_string(),
            idle_timeout: timeouts::IDLE,
            deadline: DeadlinePolicy::default(),
            max_command_len: max_lengths::COMMAND_LINE,
            max_message_len: max_lengths::MESSAGE,
            max_sessions: 1024,
            recipients: RecipientPolicy::default(),
            data_reply: DataReply::default(),
        }
    }
}

/// When a session's idle deadline is measured from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeadlinePolicy {
    /// The deadline is pushed back before every read, so only a silent client is disconnected.
    #[default]
    PerRead,
    /// One deadline is set when the session opens and is never moved. A slow client can be
    /// disconnected while still making progress.
    Fixed,
}

/// What a repeated `RCPT TO` does to the envelope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RecipientPolicy {
    /// Every recipient is kept, in the order given.
    #[default]
    Append,
    /// Only the most recent recipient is kept.
    Replace,
}

/// What is sent once the message after `DATA` has been handed to the sink.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DataReply {
    /// Nothing. The client's next command is answered as usual.
    #[default]
    Silent,
    /// `250 OK`, as [RFC 821 section 4.1.1](https://www.rfc-editor.org/rfc/rfc821.html#page-20)
    /// expects.
    Acknowledge,
}
