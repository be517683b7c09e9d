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

//! Handles particular commands from SMTP clients.
//!
//! Arguments are taken by fixed character offsets into the normalized line, not by parsing:
//! whatever follows the verb is stored as-is.

use super::{
    super::{reply::Reply, Envelope},
    Command, Effect, Phase, Transition, Verb,
};
use crate::config::RecipientPolicy;

/// How many characters of a `HELO` line come before the identity: `"HELO"` and one separator.
const HELO_IDENTITY_OFFSET: usize = Verb::Hello.prefix().len() + 1;

/// Reply to anything other than `HELO` before the first `HELO`.
///
/// [RFC 821 page 27](https://www.rfc-editor.org/rfc/rfc821.html#page-27): "If the HELO command
/// argument is not acceptable a 501 failure reply must be returned and the receiver-SMTP must stay
/// in the same state." The client may retry as often as it likes.
pub const fn identity_required() -> Transition {
    Transition::reply(Phase::AwaitingIdentity, Reply::BadParameters)
}

/// Reply to an unrecognized command from a client.
///
/// A malformed command and a well-formed but unsupported one get the same reply.
pub const fn unrecognized() -> Transition {
    Transition::reply(Phase::Established, Reply::Unrecognized)
}

/// Reply to the hello (`HELO`) command from a client.
///
/// If anything follows `"HELO "`, it becomes the identity. Otherwise the previous identity stays.
/// The reply does not echo the identity back.
pub fn hello(envelope: &mut Envelope, command: &Command) -> Transition {
    if let Some(identity) = command
        .text_after(HELO_IDENTITY_OFFSET)
        .filter(|identity| !identity.is_empty())
    {
        envelope.identity = identity.to_string();
    }

    Transition::reply(Phase::Established, Reply::Hello)
}

/// Reply to the `MAIL FROM:` command from a client.
///
/// Everything after the colon becomes the sender, which may be empty.
pub fn mail_from(envelope: &mut Envelope, command: &Command) -> Transition {
    envelope.mail_from = command
        .text_after(Verb::MailFrom.prefix().len())
        .unwrap_or_default()
        .to_string();

    Transition::reply(Phase::Established, Reply::Ok).with_effect(Effect::MailFrom)
}

/// Reply to the `RCPT TO:` command from a client.
///
/// Everything after the colon becomes a recipient, which may be empty.
pub fn rcpt_to(envelope: &mut Envelope, command: &Command, policy: RecipientPolicy) -> Transition {
    let recipient = command
        .text_after(Verb::RcptTo.prefix().len())
        .unwrap_or_default()
        .to_string();

    if policy == RecipientPolicy::Replace {
        envelope.recipients.clear();
    }
    envelope.recipients.push(recipient);

    Transition::reply(Phase::Established, Reply::Ok).with_effect(Effect::Recipient)
}

/// Reply to the `DATA` command from a client.
///
/// The message itself is read by the driver, which also decides whether anything is sent after
/// it.
pub const fn data() -> Transition {
    Transition::reply(Phase::Established, Reply::StartMailInput).with_effect(Effect::ReceiveMessage)
}

/// Reply to the reset (`RSET`) command from a client.
pub fn reset(envelope: &mut Envelope) -> Transition {
    envelope.reset();

    Transition::reply(Phase::Established, Reply::Ok)
}

/// Reply to the `NOOP` command from a client.
pub const fn noop() -> Transition {
    Transition::reply(Phase::Established, Reply::Ok)
}

/// Reply to the quit (`QUIT`) command from a client.
pub const fn quit() -> Transition {
    Transition::reply(Phase::Closed, Reply::Closing).with_effect(Effect::Close)
}
