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

//! A minimal SMTP front-end.
//!
//! It accepts TCP connections and speaks the part of [RFC 821](https://www.rfc-editor.org/rfc/rfc821.html)
//! needed to collect an envelope: `HELO`, `MAIL FROM:`, `RCPT TO:`, `DATA`, `RSET`, `NOOP`, and
//! `QUIT`. Each sender, recipient, and message is handed to an [`EnvelopeSink`]; nothing is
//! delivered, queued, relayed, or stored by this crate.
//!
//! ```rust,no_run
//! # use smtp_frontend::{ChannelSink, Config, Server};
//! # #[tokio::main]
//! # async fn main() -> std::io::Result<()> {
//! let (sink, mut messages) = ChannelSink::new();
//! let server = Server::new(Config::default()).with_sink(sink);
//!
//! tokio::spawn(async move {
//!     while let Some(message) = messages.recv().await {
//!         println!("mail from {}", message.envelope.mail_from);
//!     }
//! });
//!
//! let listener = server.bind().await?;
//! server.serve(listener).await
//! # }
//! ```

#![warn(clippy::nursery, clippy::pedantic)]
#![cfg_attr(debug_assertions, allow(clippy::missing_errors_doc))]

use std::{io, sync::Arc, time::Duration};

use async_stream::stream;
use futures_core::Stream;
use futures_util::{pin_mut, StreamExt};
use tokio::{net::TcpListener, sync::Semaphore, task::JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

pub mod config;
pub mod connection;
pub mod error;
pub mod sink;
pub mod str;
#[cfg(test)]
mod test;
pub mod timeouts;

pub use config::Config;
pub use connection::{CloseReason, Envelope, Reply, Session, SessionContext};
pub use error::{Error, Result};
pub use sink::{ChannelSink, EnvelopeSink, Message, NullSink};

/// How long [`Server::serve`] waits after a failed `accept` before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// The task running one session, as yielded by [`Server::listen`].
pub type SessionHandle = JoinHandle<Result<CloseReason>>;

/// Accepts connections and runs one [`Session`] per connection.
///
/// Sessions share nothing but the [`Config`], the [`EnvelopeSink`], and a cancellation token.
/// At most [`Config::max_sessions`] run at once.
pub struct Server {
    context: SessionContext,
    permits: Arc<Semaphore>,
}

impl Server {
    /// Create a server that discards all mail. See [`Self::with_sink`].
    ///
    /// A [`Config::max_sessions`] of zero is raised to one, since no connection could ever be
    /// accepted otherwise.
    #[must_use]
    pub fn new(mut config: Config) -> Self {
        if config.max_sessions == 0 {
            tracing::warn!("max_sessions is 0, allowing 1 session at a time instead");
            config.max_sessions = 1;
        }

        let permits = usize::try_from(config.max_sessions)
            .unwrap_or(usize::MAX)
            .min(Semaphore::MAX_PERMITS);

        Self {
            context: SessionContext::new(config),
            permits: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Hand every envelope and message to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: impl EnvelopeSink + 'static) -> Self {
        self.context = self.context.with_sink(sink);
        self
    }

    /// Get the configuration shared by every session.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Get a token that shuts the server down when cancelled.
    #[must_use]
    pub fn cancellation_token(&self) -> CancellationToken {
        self.context.cancel.clone()
    }

    /// Stop accepting connections and close every open session with a `421` reply.
    pub fn shutdown(&self) {
        self.context.cancel.cancel();
    }

    /// Bind a listener to [`Config::address`] and [`Config::port`].
    ///
    /// # Errors
    ///
    /// [`std::io::Error`] from [`TcpListener::bind`].
    pub async fn bind(&self) -> io::Result<TcpListener> {
        TcpListener::bind((self.config().address, self.config().port)).await
    }

    /// Accept connections from `listener`, spawning a task for each session.
    ///
    /// Each item is the handle to one spawned session, or the error from a failed `accept`. The
    /// stream waits for a free session slot before accepting, and ends once the server is shut
    /// down. Dropping a handle does not stop its session.
    pub fn listen(&self, listener: TcpListener) -> impl Stream<Item = io::Result<SessionHandle>> {
        let context = self.context.clone();
        let permits = Arc::clone(&self.permits);

        stream! {
            loop {
                let permit = tokio::select! {
                    biased;
                    () = context.cancel.cancelled() => break,
                    permit = Arc::clone(&permits).acquire_owned() => match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    },
                };

                let accepted = tokio::select! {
                    biased;
                    () = context.cancel.cancelled() => break,
                    accepted = listener.accept() => accepted,
                };

                match accepted {
                    Ok((stream, peer)) => {
                        let context = context.clone();
                        let span = tracing::info_span!("session", %peer);

                        yield Ok(tokio::spawn(
                            async move {
                                let _permit = permit;
                                connection::handle(stream, context).await
                            }
                            .instrument(span),
                        ));
                    }
                    Err(err) => yield Err(err),
                }
            }
        }
    }

    /// Run sessions for connections from `listener` until [`Self::shutdown`] is called.
    ///
    /// Failed `accept`s are logged and retried. After shutdown, this waits up to
    /// [`timeouts::DRAIN`] for open sessions to close.
    ///
    /// # Errors
    ///
    /// [`std::io::Error`] from [`TcpListener::local_addr`].
    pub async fn serve(&self, listener: TcpListener) -> io::Result<()> {
        tracing::info!("listening on {}", listener.local_addr()?);

        let sessions = self.listen(listener);
        pin_mut!(sessions);

        while let Some(session) = sessions.next().await {
            if let Err(err) = session {
                tracing::warn!("failed to accept a connection: {err}");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }

        self.drain().await;
        Ok(())
    }

    /// Wait up to [`timeouts::DRAIN`] for every session to give back its slot.
    ///
    /// Returns whether every session closed in time.
    async fn drain(&self) -> bool {
        let open = || {
            let total = usize::try_from(self.config().max_sessions).unwrap_or(usize::MAX);
            total.saturating_sub(self.permits.available_permits())
        };

        tracing::info!("shutting down, waiting for {} open sessions", open());

        let all = self.permits.acquire_many(self.config().max_sessions);
        match tokio::time::timeout(timeouts::DRAIN, all).await {
            Ok(_) => {
                tracing::info!("all sessions closed");
                true
            }
            Err(_) => {
                tracing::warn!("{} sessions still open after {:?}", open(), timeouts::DRAIN);
                false
            }
        }
    }
}
