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

use std::{error::Error, net::Ipv4Addr, time::Duration};

use futures_util::{pin_mut, StreamExt};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{tcp::OwnedReadHalf, TcpListener, TcpStream},
};

use crate::{ChannelSink, CloseReason, Config, Server};

mod is_valid_response;

type Result = std::result::Result<(), Box<dyn Error>>;

/// Bind a listener on a free local port.
async fn local_listener() -> std::io::Result<TcpListener> {
    TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).await
}

/// Read one reply line.
async fn read_line(reader: &mut BufReader<OwnedReadHalf>) -> std::io::Result<String> {
    let mut line = String::new();
    reader.read_line(&mut line).await?;

    Ok(line)
}

/// Write one command line.
macro_rules! write_line {
    ($write_stream:expr, $line:expr) => {
        $write_stream.write_all(concat!($line, "\r\n").as_bytes())
    };
}

// RFC 821 4.5.1 Minimum Implementation:
//
// - [x] `HELO`
// - [x] `MAIL`
// - [x] `RCPT`
// - [x] `DATA`
// - [x] `RSET`
// - [x] `NOOP`
// - [x] `QUIT`
//
// <https://www.rfc-editor.org/rfc/rfc821.html#section-4.5.1>
#[tokio::test]
async fn test_listen() -> Result {
    let listener = local_listener().await?;
    let addr = listener.local_addr()?;

    let (sink, mut messages) = ChannelSink::new();
    let server = Server::new(Config::default()).with_sink(sink);
    let sessions = server.listen(listener);

    let stream = TcpStream::connect(addr).await?;
    let (read_stream, mut write_stream) = stream.into_split();
    let mut reader = BufReader::new(read_stream);

    let client = async {
        assert!(is_valid_response::server_greeting(&read_line(&mut reader).await?));

        write_line!(write_stream, "NOOP").await?;
        assert!(is_valid_response::bad_parameters(&read_line(&mut reader).await?));

        write_line!(write_stream, "HELO client.example").await?;
        assert!(is_valid_response::helo(&read_line(&mut reader).await?));

        write_line!(write_stream, "MAIL FROM:<x@y>").await?;
        assert!(is_valid_response::ok(&read_line(&mut reader).await?));

        write_line!(write_stream, "RCPT TO:<z@y>").await?;
        assert!(is_valid_response::ok(&read_line(&mut reader).await?));

        write_line!(write_stream, "DATA").await?;
        assert!(is_valid_response::data(&read_line(&mut reader).await?));

        write_line!(write_stream, "hello\r\n.").await?;

        write_line!(write_stream, "QUIT").await?;
        assert!(is_valid_response::quit(&read_line(&mut reader).await?));

        // The server closes the connection after `QUIT`.
        assert_eq!(read_line(&mut reader).await?, "");

        Ok::<_, Box<dyn Error>>(())
    };

    let session = async {
        pin_mut!(sessions);

        // Unwrap the stream's `Option`, then the `accept`.
        let handle = sessions.next().await.ok_or("listener stopped")??;

        // Await the session's task, then the session itself.
        Ok::<_, Box<dyn Error>>(handle.await??)
    };

    let (client, session) = tokio::join!(client, session);
    client?;
    assert_eq!(session?, CloseReason::Quit);

    let message = messages.try_recv()?;
    assert_eq!(message.envelope.identity, "CLIENT.EXAMPLE");
    assert_eq!(message.envelope.mail_from, "<X@Y>");
    assert_eq!(message.envelope.recipients, ["<Z@Y>"]);
    assert_eq!(message.body, b"hello\r\n");

    Ok(())
}

#[tokio::test]
async fn test_sessions_are_independent() -> Result {
    let listener = local_listener().await?;
    let addr = listener.local_addr()?;

    let (sink, mut messages) = ChannelSink::new();
    let server = Server::new(Config::default()).with_sink(sink);
    let cancel = server.cancellation_token();
    let serving = tokio::spawn(async move { server.serve(listener).await });

    let first = TcpStream::connect(addr).await?;
    let second = TcpStream::connect(addr).await?;
    let (first_read, mut first_write) = first.into_split();
    let (second_read, mut second_write) = second.into_split();
    let mut first_read = BufReader::new(first_read);
    let mut second_read = BufReader::new(second_read);

    assert!(is_valid_response::server_greeting(&read_line(&mut first_read).await?));
    assert!(is_valid_response::server_greeting(&read_line(&mut second_read).await?));

    // Interleave the two sessions; neither sees the other's envelope.
    write_line!(first_write, "HELO first").await?;
    assert!(is_valid_response::helo(&read_line(&mut first_read).await?));
    write_line!(second_write, "HELO second").await?;
    assert!(is_valid_response::helo(&read_line(&mut second_read).await?));
    write_line!(first_write, "MAIL FROM:<first@example>").await?;
    assert!(is_valid_response::ok(&read_line(&mut first_read).await?));

    write_line!(second_write, "DATA").await?;
    assert!(is_valid_response::data(&read_line(&mut second_read).await?));
    write_line!(second_write, "from the second session\r\n.").await?;
    write_line!(second_write, "QUIT").await?;
    assert!(is_valid_response::quit(&read_line(&mut second_read).await?));

    write_line!(first_write, "DATA").await?;
    assert!(is_valid_response::data(&read_line(&mut first_read).await?));
    write_line!(first_write, "from the first session\r\n.").await?;
    write_line!(first_write, "QUIT").await?;
    assert!(is_valid_response::quit(&read_line(&mut first_read).await?));

    let second_message = messages.recv().await.ok_or("sink closed")?;
    assert_eq!(second_message.envelope.identity, "SECOND");
    assert_eq!(second_message.envelope.mail_from, "");
    assert_eq!(second_message.body, b"from the second session\r\n");

    let first_message = messages.recv().await.ok_or("sink closed")?;
    assert_eq!(first_message.envelope.identity, "FIRST");
    assert_eq!(first_message.envelope.mail_from, "<FIRST@EXAMPLE>");
    assert_eq!(first_message.body, b"from the first session\r\n");

    cancel.cancel();
    serving.await??;

    Ok(())
}

#[tokio::test]
async fn test_shutdown_closes_open_sessions() -> Result {
    let listener = local_listener().await?;
    let addr = listener.local_addr()?;

    let server = Server::new(Config::default());
    let cancel = server.cancellation_token();
    let serving = tokio::spawn(async move { server.serve(listener).await });

    let (read_stream, mut write_stream) = TcpStream::connect(addr).await?.into_split();
    let mut reader = BufReader::new(read_stream);

    assert!(is_valid_response::server_greeting(&read_line(&mut reader).await?));
    write_line!(write_stream, "HELO a").await?;
    assert!(is_valid_response::helo(&read_line(&mut reader).await?));

    cancel.cancel();

    assert!(is_valid_response::shutting_down(&read_line(&mut reader).await?));
    assert_eq!(read_line(&mut reader).await?, "");

    // `serve` returns once the session has given back its slot.
    tokio::time::timeout(Duration::from_secs(1), serving).await???;

    Ok(())
}

#[tokio::test]
async fn test_session_limit() -> Result {
    let listener = local_listener().await?;
    let addr = listener.local_addr()?;

    let server = Server::new(Config {
        max_sessions: 1,
        ..Config::default()
    });
    let cancel = server.cancellation_token();
    let serving = tokio::spawn(async move { server.serve(listener).await });

    let (first_read, mut first_write) = TcpStream::connect(addr).await?.into_split();
    let mut first_read = BufReader::new(first_read);
    assert!(is_valid_response::server_greeting(&read_line(&mut first_read).await?));

    // The second connection completes in the backlog but is not greeted while the first session
    // holds the only slot.
    let (second_read, _second_write) = TcpStream::connect(addr).await?.into_split();
    let mut second_read = BufReader::new(second_read);
    let early = tokio::time::timeout(Duration::from_millis(200), read_line(&mut second_read)).await;
    assert!(early.is_err(), "second session was greeted early");

    write_line!(first_write, "HELO a").await?;
    assert!(is_valid_response::helo(&read_line(&mut first_read).await?));
    write_line!(first_write, "QUIT").await?;
    assert!(is_valid_response::quit(&read_line(&mut first_read).await?));

    assert!(is_valid_response::server_greeting(&read_line(&mut second_read).await?));

    cancel.cancel();
    serving.await??;

    Ok(())
}

#[tokio::test]
async fn test_zero_session_limit_still_accepts() -> Result {
    let listener = local_listener().await?;
    let addr = listener.local_addr()?;

    let server = Server::new(Config {
        max_sessions: 0,
        ..Config::default()
    });
    assert_eq!(server.config().max_sessions, 1);

    let cancel = server.cancellation_token();
    let serving = tokio::spawn(async move { server.serve(listener).await });

    let (read_stream, mut write_stream) = TcpStream::connect(addr).await?.into_split();
    let mut reader = BufReader::new(read_stream);

    let greeting = tokio::time::timeout(Duration::from_secs(1), read_line(&mut reader)).await??;
    assert!(is_valid_response::server_greeting(&greeting));

    write_line!(write_stream, "QUIT").await?;
    assert!(is_valid_response::bad_parameters(&read_line(&mut reader).await?));

    cancel.cancel();
    assert!(is_valid_response::shutting_down(&read_line(&mut reader).await?));
    serving.await??;

    Ok(())
}
