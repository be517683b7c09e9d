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

//! Reads a command from an SMTP client and decides what it does to the session.
//!
//! See [`read`] and [`dispatch`].

mod commands;

use tokio::io::AsyncBufRead;

use super::{reader::read_terminated, reply::Reply, Envelope};
use crate::{
    config::RecipientPolicy,
    error::Result,
    str::{normalize_command, CRLF},
};

/// Read one `CRLF`-terminated command line out of `reader`.
///
/// The raw line is logged before it is normalized.
///
/// # Errors
///
/// Whatever [`read_terminated`] returns. `limit` is the longest line accepted, in bytes.
pub async fn read<R>(reader: &mut R, limit: usize) -> Result<Command>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    read_terminated(reader, CRLF.as_bytes(), limit, &mut buf).await?;

    let raw = String::from_utf8_lossy(&buf);
    tracing::debug!("C: {raw:?}");

    Ok(Command::parse(&raw))
}

/// One command line from a client.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Command {
    /// The line after [`normalize_command`].
    normalized: String,
}

impl Command {
    /// Normalize a raw line into a command.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        Self {
            normalized: normalize_command(raw),
        }
    }

    /// Get the trimmed, upper-cased line.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.normalized
    }

    /// Get the [`Verb`] the command starts with, if any.
    #[must_use]
    pub fn verb(&self) -> Option<Verb> {
        Verb::recognize(&self.normalized)
    }

    /// Get the normalized text after its first `count` characters.
    ///
    /// Returns `None` if the text is no longer than `count` characters.
    fn text_after(&self, count: usize) -> Option<&str> {
        self.normalized
            .char_indices()
            .nth(count)
            .map(|(start, _)| &self.normalized[start..])
    }
}

/// The verbs a session understands.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Verb {
    /// `HELO`, [RFC 821 page 20](https://www.rfc-editor.org/rfc/rfc821.html#page-20).
    Hello,
    /// `MAIL FROM:`, [RFC 821 page 20](https://www.rfc-editor.org/rfc/rfc821.html#page-20).
    MailFrom,
    /// `RCPT TO:`, [RFC 821 page 20](https://www.rfc-editor.org/rfc/rfc821.html#page-20).
    RcptTo,
    /// `DATA`, [RFC 821 page 20](https://www.rfc-editor.org/rfc/rfc821.html#page-20).
    Data,
    /// `RSET`, [RFC 821 page 21](https://www.rfc-editor.org/rfc/rfc821.html#page-21).
    Reset,
    /// `NOOP`, [RFC 821 page 23](https://www.rfc-editor.org/rfc/rfc821.html#page-23).
    Noop,
    /// `QUIT`, [RFC 821 page 23](https://www.rfc-editor.org/rfc/rfc821.html#page-23).
    Quit,
}

impl Verb {
    /// Every verb, in the order they are tried.
    const ALL: [Self; 7] = [
        Self::Hello,
        Self::MailFrom,
        Self::RcptTo,
        Self::Data,
        Self::Reset,
        Self::Noop,
        Self::Quit,
    ];

    /// Get the text a normalized command must start with to be this verb.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Hello => "HELO",
            Self::MailFrom => "MAIL FROM:",
            Self::RcptTo => "RCPT TO:",
            Self::Data => "DATA",
            Self::Reset => "RSET",
            Self::Noop => "NOOP",
            Self::Quit => "QUIT",
        }
    }

    /// Find the first verb that `command` starts with.
    ///
    /// This is a prefix match, not a tokenizer: `"HELOXYZ"` is a `HELO`, and `"NOOPS"` is a
    /// `NOOP`.
    #[must_use]
    pub fn recognize(command: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|verb| command.starts_with(verb.prefix()))
    }
}

/// Where a session is in the protocol.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Default)]
pub enum Phase {
    /// No `HELO` yet. Only `HELO` is accepted.
    ///
    /// [RFC 821 page 27](https://www.rfc-editor.org/rfc/rfc821.html#page-27): "The first command
    /// in a session must be the HELO command."
    #[default]
    AwaitingIdentity,
    /// A `HELO` was accepted. Every verb is accepted.
    Established,
    /// `QUIT` was accepted. Nothing more is read.
    Closed,
}

/// What the session driver has to do after a command, beyond sending the reply.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum Effect {
    /// Nothing.
    None,
    /// Report the new sender to the sink.
    MailFrom,
    /// Report the newest recipient to the sink.
    Recipient,
    /// Read the message text and hand it to the sink.
    ReceiveMessage,
    /// Close the connection.
    Close,
}

/// The outcome of [`dispatch`].
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub struct Transition {
    /// The phase the session is in after the command.
    pub phase: Phase,
    /// The reply to send, if any.
    pub reply: Option<Reply<'static>>,
    /// What to do after sending the reply.
    pub effect: Effect,
}

impl Transition {
    /// Move to `phase` after sending `reply`, with no further effect.
    const fn reply(phase: Phase, reply: Reply<'static>) -> Self {
        Self {
            phase,
            reply: Some(reply),
            effect: Effect::None,
        }
    }

    /// Attach `effect` to the transition.
    const fn with_effect(mut self, effect: Effect) -> Self {
        self.effect = effect;
        self
    }
}

/// Apply `command` to a session in `phase` holding `envelope`.
///
/// The only state this touches is `envelope`. Everything else the driver must do is described by
/// the returned [`Transition`].
pub fn dispatch(
    phase: Phase,
    envelope: &mut Envelope,
    command: &Command,
    recipients: RecipientPolicy,
) -> Transition {
    match (phase, command.verb()) {
        (Phase::AwaitingIdentity | Phase::Established, Some(Verb::Hello)) => {
            commands::hello(envelope, command)
        }
        (Phase::AwaitingIdentity, _) => commands::identity_required(),
        (Phase::Established, Some(Verb::MailFrom)) => commands::mail_from(envelope, command),
        (Phase::Established, Some(Verb::RcptTo)) => {
            commands::rcpt_to(envelope, command, recipients)
        }
        (Phase::Established, Some(Verb::Data)) => commands::data(),
        (Phase::Established, Some(Verb::Reset)) => commands::reset(envelope),
        (Phase::Established, Some(Verb::Noop)) => commands::noop(),
        (Phase::Established, Some(Verb::Quit)) => commands::quit(),
        (Phase::Established, None) => commands::unrecognized(),
        (Phase::Closed, _) => Transition {
            phase: Phase::Closed,
            reply: None,
            effect: Effect::Close,
        },
    }
}
