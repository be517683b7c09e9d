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

//! Run an SMTP front-end that logs every envelope it receives.

use std::{net::IpAddr, time::Duration};

use anyhow::Context;
use clap::Parser;
use smtp_frontend::{
    config::{DataReply, DeadlinePolicy, RecipientPolicy, DEFAULT_BANNER, DEFAULT_PORT},
    ChannelSink, Config, Message, Server,
};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug, Clone)]
#[command(version, about)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "SMTP_FRONTEND_ADDRESS", default_value = "0.0.0.0")]
    address: IpAddr,

    /// Port to listen on
    #[arg(short, long, env = "SMTP_FRONTEND_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Name sent in the `220` greeting
    #[arg(long, env = "SMTP_FRONTEND_BANNER", default_value = DEFAULT_BANNER)]
    banner: String,

    /// Seconds a session may wait for the client before it is closed
    #[arg(long, env = "SMTP_FRONTEND_IDLE_TIMEOUT", default_value_t = 60)]
    idle_timeout: u64,

    /// Measure the idle timeout from the start of the session instead of from each read
    #[arg(long, env = "SMTP_FRONTEND_FIXED_DEADLINE")]
    fixed_deadline: bool,

    /// Maximum number of sessions open at once
    #[arg(
        long,
        env = "SMTP_FRONTEND_MAX_SESSIONS",
        default_value_t = 1024,
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    max_sessions: u32,

    /// Maximum length of a command line, in bytes
    #[arg(long, env = "SMTP_FRONTEND_MAX_COMMAND_LEN")]
    max_command_len: Option<usize>,

    /// Maximum size of a message, in bytes
    #[arg(long, env = "SMTP_FRONTEND_MAX_MESSAGE_LEN")]
    max_message_len: Option<usize>,

    /// Keep only the latest `RCPT TO:` of each transaction
    #[arg(long, env = "SMTP_FRONTEND_SINGLE_RECIPIENT")]
    single_recipient: bool,

    /// Reply `250 OK` once a message has been read
    #[arg(long, env = "SMTP_FRONTEND_ACKNOWLEDGE_DATA")]
    acknowledge_data: bool,

    /// Log more; repeat for even more
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Args {
    fn config(&self) -> Config {
        let defaults = Config::default();

        Config {
            address: self.address,
            port: self.port,
            banner: self.banner.clone(),
            idle_timeout: Duration::from_secs(self.idle_timeout),
            deadline: if self.fixed_deadline {
                DeadlinePolicy::Fixed
            } else {
                DeadlinePolicy::PerRead
            },
            max_command_len: self.max_command_len.unwrap_or(defaults.max_command_len),
            max_message_len: self.max_message_len.unwrap_or(defaults.max_message_len),
            max_sessions: self.max_sessions,
            recipients: if self.single_recipient {
                RecipientPolicy::Replace
            } else {
                RecipientPolicy::Append
            },
            data_reply: if self.acknowledge_data {
                DataReply::Acknowledge
            } else {
                DataReply::Silent
            },
            ..defaults
        }
    }

    const fn default_directive(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// Log each message as it arrives.
async fn log_messages(mut messages: UnboundedReceiver<Message>) {
    while let Some(Message { envelope, body }) = messages.recv().await {
        tracing::info!(
            identity = %envelope.identity,
            mail_from = %envelope.mail_from,
            recipients = ?envelope.recipients,
            bytes = body.len(),
            "received a message",
        );
        tracing::trace!("{}", String::from_utf8_lossy(&body));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // `RUST_LOG` wins over `-v`.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.default_directive()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let (sink, messages) = ChannelSink::new();
    let server = Server::new(args.config()).with_sink(sink);
    tokio::spawn(log_messages(messages));

    let token = server.cancellation_token();
    tokio::spawn(async move {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl-C: {err}");
            return;
        }

        tracing::info!("received Ctrl-C");
        token.cancel();
    });

    let listener = server.bind().await.with_context(|| {
        format!(
            "failed to listen on {}:{}",
            server.config().address,
            server.config().port
        )
    })?;

    server.serve(listener).await.context("server failed")
}

#[cfg(test)]
mod test {
    use clap::Parser;
    use smtp_frontend::Config;

    use super::Args;

    type Result = std::result::Result<(), Box<dyn std::error::Error>>;

    #[test]
    fn test_defaults() -> Result {
        let args = Args::try_parse_from(["smtp_frontend_server"])?;

        assert_eq!(args.config(), Config::default());

        Ok(())
    }

    #[test]
    fn test_limits() -> Result {
        let args = Args::try_parse_from([
            "smtp_frontend_server",
            "--max-command-len",
            "1000",
            "--max-message-len",
            "2048",
        ])?;
        let config = args.config();

        assert_eq!(config.max_command_len, 1000);
        assert_eq!(config.max_message_len, 2048);
        assert_eq!(config.max_sessions, Config::default().max_sessions);

        Ok(())
    }

    #[test]
    fn test_zero_sessions_rejected() {
        assert!(Args::try_parse_from(["smtp_frontend_server", "--max-sessions", "0"]).is_err());
    }
}
