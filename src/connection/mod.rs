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

//! Handles TCP connections as SMTP sessions.
//!
//! See [`handle`] and [`Session`].

mod command;
mod envelope;
mod reader;
pub mod reply;

use std::{future::Future, sync::Arc};

use tokio::{
    io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::TcpStream,
    time::Instant,
};
use tokio_util::sync::CancellationToken;

pub use self::{
    command::{Command, Phase, Verb},
    envelope::Envelope,
    reader::read_terminated,
    reply::Reply,
};
use self::command::Effect;
use crate::{
    config::{Config, DataReply, DeadlinePolicy},
    error::{Error, Result},
    sink::{EnvelopeSink, NullSink},
    str::{unstuff_dots, CRLF, END_OF_DATA},
};

/// Everything a session shares with the listener and with other sessions.
#[derive(Clone)]
pub struct SessionContext {
    /// Limits and policies.
    pub config: Arc<Config>,
    /// Where envelopes and messages go.
    pub sink: Arc<dyn EnvelopeSink>,
    /// Cancelled when the server shuts down.
    pub cancel: CancellationToken,
}

impl SessionContext {
    /// Create a context that discards all mail.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
            sink: Arc::new(NullSink),
            cancel: CancellationToken::new(),
        }
    }

    /// Replace the sink.
    #[must_use]
    pub fn with_sink(mut self, sink: impl EnvelopeSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }
}

/// Handle a TCP connection as an SMTP session.
///
/// # Errors
///
/// - I/O errors from the session itself, see [`Session::run`].
/// - I/O errors encountered in [`TcpStream::local_addr`] and [`TcpStream::peer_addr`]. On POSIX,
///   these come from `getsockname` and `getpeername`.
pub async fn handle(stream: TcpStream, context: SessionContext) -> Result<CloseReason> {
    let local_socket = stream.local_addr()?;
    let client_socket = stream.peer_addr()?;
    tracing::info!("connection opened on {local_socket} by {client_socket}");

    let result = Session::new(stream, context).run().await;

    match &result {
        Ok(reason) => tracing::info!(
            "connection on {local_socket} with {client_socket} closed ({reason:?})"
        ),
        Err(err) => tracing::warn!(
            "connection on {local_socket} with {client_socket} failed: {err}"
        ),
    }

    result
}

/// Indicates why a session ended without an I/O error.
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum CloseReason {
    /// The SMTP client requested to quit the session.
    Quit,
    /// No complete line arrived before the idle deadline.
    TimedOut,
    /// The client closed the TCP connection.
    ClosedByClient,
    /// The server is shutting down.
    Shutdown,
    /// A command or message was longer than `limit` bytes.
    TooLong { limit: usize },
}

/// One client, from greeting to close.
///
/// A session owns its transport exclusively. It is driven by [`Self::run`], which consumes it,
/// so the transport is shut down and dropped exactly once whichever way the session ends.
pub struct Session<S> {
    transport: BufReader<S>,
    envelope: Envelope,
    phase: Phase,
    /// When the session opened, for [`DeadlinePolicy::Fixed`].
    opened: Instant,
    context: SessionContext,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Start a session on `stream`. The idle clock starts now.
    pub fn new(stream: S, context: SessionContext) -> Self {
        Self {
            transport: BufReader::new(stream),
            envelope: Envelope::new(),
            phase: Phase::default(),
            opened: Instant::now(),
            context,
        }
    }

    /// Greet the client, then answer commands until the session ends.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if reading from or writing to the transport fails. Every other way a
    /// session can end is a [`CloseReason`].
    pub async fn run(mut self) -> Result<CloseReason> {
        let result = self.converse().await;

        if let Err(err) = self.transport.shutdown().await {
            tracing::debug!("failed to shut down the transport: {err}");
        }

        result
    }

    /// The point at which the next read gives up.
    fn deadline(&self) -> Instant {
        let idle = self.context.config.idle_timeout;

        match self.context.config.deadline {
            DeadlinePolicy::PerRead => Instant::now() + idle,
            DeadlinePolicy::Fixed => self.opened + idle,
        }
    }

    async fn converse(&mut self) -> Result<CloseReason> {
        /// Await a read bounded by `$deadline` and `$cancel`, or `break` with the
        /// [`CloseReason`] and the farewell [`Reply`] for the way it failed.
        ///
        /// `$too_long` is the farewell if the read ran over its limit.
        ///
        /// # Errors
        ///
        /// Returns early with [`Error::Io`] from the read.
        macro_rules! read_or_break {
            ($cancel:expr, $deadline:expr, $read:expr, $too_long:expr) => {
                match bounded($cancel, $deadline, $read).await {
                    Ok(value) => value,
                    Err(Error::ConnectionClosed) => break (CloseReason::ClosedByClient, None),
                    Err(Error::TimedOut) => break (CloseReason::TimedOut, None),
                    Err(Error::Cancelled) => {
                        break (CloseReason::Shutdown, Some(Reply::ShuttingDown))
                    }
                    Err(Error::TooLong { limit }) => {
                        break (CloseReason::TooLong { limit }, Some($too_long))
                    }
                    Err(err @ Error::Io(_)) => return Err(err),
                }
            };
        }

        let config = Arc::clone(&self.context.config);
        let cancel = self.context.cancel.clone();

        reply::write(&mut self.transport, Reply::Greeting(&config.banner)).await?;

        let (reason, farewell) = loop {
            let command = read_or_break!(
                &cancel,
                self.deadline(),
                command::read(&mut self.transport, config.max_command_len),
                Reply::LineTooLong
            );

            let transition = command::dispatch(
                self.phase,
                &mut self.envelope,
                &command,
                config.recipients,
            );
            self.phase = transition.phase;

            if let Some(response) = transition.reply {
                reply::write(&mut self.transport, response).await?;
            }

            match transition.effect {
                Effect::None => (),
                Effect::MailFrom => self.context.sink.on_mail_from(&self.envelope.mail_from),
                Effect::Recipient => {
                    if let Some(recipient) = self.envelope.recipients.last() {
                        self.context.sink.on_recipient(recipient);
                    }
                }
                Effect::ReceiveMessage => {
                    let body = read_or_break!(
                        &cancel,
                        self.deadline(),
                        read_message(&mut self.transport, config.max_message_len),
                        Reply::TooMuchData
                    );

                    self.context.sink.on_message(&self.envelope, &body);

                    if config.data_reply == DataReply::Acknowledge {
                        reply::write(&mut self.transport, Reply::Ok).await?;
                    }
                }
                Effect::Close => return Ok(CloseReason::Quit),
            }
        };

        if let Some(farewell) = farewell {
            let deadline = self.deadline();
            let write = reply::write(&mut self.transport, farewell);

            match tokio::time::timeout_at(deadline, write).await {
                Ok(Ok(())) => (),
                Ok(Err(err)) => tracing::debug!("failed to send {farewell}: {err}"),
                Err(_) => tracing::debug!("timed out sending {farewell}"),
            }
        }

        Ok(reason)
    }
}

/// Await `read`, giving up at `deadline` or when `cancel` is cancelled.
async fn bounded<T>(
    cancel: &CancellationToken,
    deadline: Instant,
    read: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(Error::Cancelled),
        result = tokio::time::timeout_at(deadline, read) => match result {
            Ok(result) => result,
            Err(_) => Err(Error::TimedOut),
        },
    }
}

/// Read the mail data after a `DATA` command, up to and including the lone `.` line.
///
/// The `CRLF` that ended the `DATA` line counts as the start of the terminator, so an empty
/// message (a `.` line straight away) is accepted. The returned text has the terminating `.` line
/// removed and its leading periods unstuffed; it keeps the `CRLF` of its last line.
///
/// # Errors
///
/// Whatever [`read_terminated`] returns. `limit` does not count the leading `CRLF`.
async fn read_message<R>(reader: &mut R, limit: usize) -> Result<Vec<u8>>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = CRLF.as_bytes().to_vec();
    read_terminated(
        reader,
        END_OF_DATA.as_bytes(),
        limit.saturating_add(CRLF.len()),
        &mut buf,
    )
    .await?;

    tracing::debug!("C: <{} bytes of mail data>", buf.len() - CRLF.len());

    // Everything between the leading `CRLF` and the final `".\r\n"`.
    let text = &buf[CRLF.len()..buf.len() - (END_OF_DATA.len() - CRLF.len())];

    Ok(unstuff_dots(text))
}
