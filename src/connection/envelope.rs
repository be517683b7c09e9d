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

//! The transaction a session is building up.

/// The identity, sender, and recipients given by the client so far.
///
/// All fields hold the normalized (upper-cased) text after the command's verb, exactly as sent.
/// Nothing is parsed or validated.
#[derive(PartialEq, Eq, Debug, Clone, Default)]
pub struct Envelope {
    /// The argument of the most recent `HELO` that had one.
    pub identity: String,
    /// The argument of the most recent `MAIL FROM:`.
    pub mail_from: String,
    /// The arguments of the `RCPT TO:` commands since the last reset.
    pub recipients: Vec<String>,
}

impl Envelope {
    /// Create an empty envelope.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            identity: String::new(),
            mail_from: String::new(),
            recipients: Vec::new(),
        }
    }

    /// Forget the sender and the recipients, keeping the identity.
    ///
    /// [RFC 821 section 4.1.1](https://www.rfc-editor.org/rfc/rfc821.html#page-21) (`RSET`).
    pub fn reset(&mut self) {
        self.mail_from.clear();
        self.recipients.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_reset_keeps_identity() {
        let mut envelope = Envelope {
            identity: "CLIENT.EXAMPLE".to_string(),
            mail_from: "<A@B>".to_string(),
            recipients: vec!["<C@D>".to_string(), "<E@F>".to_string()],
        };

        envelope.reset();

        assert_eq!(
            envelope,
            Envelope {
                identity: "CLIENT.EXAMPLE".to_string(),
                ..Envelope::new()
            }
        );
    }
}
