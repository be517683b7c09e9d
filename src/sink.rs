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

//! Where completed envelopes and messages go.
//!
//! A session reports every sender, recipient, and message to an [`EnvelopeSink`]. This crate does
//! not deliver, queue, or store mail; plug in a sink that does.

use tokio::sync::mpsc;

use crate::connection::Envelope;

/// Receives what clients send, as they send it.
///
/// One sink is shared by every session, so implementations must be [`Send`] and [`Sync`]. The
/// methods are called from inside a session's task and hold up that session until they return;
/// anything slow belongs on another task.
pub trait EnvelopeSink: Send + Sync {
    /// A `MAIL FROM:` was accepted.
    fn on_mail_from(&self, _reverse_path: &str) {}

    /// A `RCPT TO:` was accepted.
    fn on_recipient(&self, _forward_path: &str) {}

    /// A message was read after `DATA`.
    ///
    /// `body` has had its terminating `.` line removed and leading periods unstuffed.
    fn on_message(&self, envelope: &Envelope, body: &[u8]);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl EnvelopeSink for NullSink {
    fn on_message(&self, _: &Envelope, _: &[u8]) {}
}

/// A message received by a session, as sent over a [`ChannelSink`].
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct Message {
    /// The envelope at the time the message was read.
    pub envelope: Envelope,
    /// The message text.
    pub body: Vec<u8>,
}

/// Forwards every message over an unbounded channel.
///
/// Senders and recipients are not forwarded on their own; they arrive with the message.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Message>,
}

impl ChannelSink {
    /// Create a sink and the receiver its messages arrive on.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (sender, receiver) = mpsc::unbounded_channel();

        (Self { sender }, receiver)
    }
}

impl EnvelopeSink for ChannelSink {
    fn on_message(&self, envelope: &Envelope, body: &[u8]) {
        let message = Message {
            envelope: envelope.clone(),
            body: body.to_vec(),
        };

        if self.sender.send(message).is_err() {
            tracing::warn!("message dropped, the receiving end of the channel is closed");
        }
    }
}
