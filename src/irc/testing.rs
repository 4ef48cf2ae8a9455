//! In-process IRC server stand-in for tests.

use super::client::{Client, Identity, Target};
use super::hooks::HookRegistry;
use irc::client::prelude::{Command, Message};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

const WAIT: Duration = Duration::from_secs(5);

pub struct FakeServer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl FakeServer {
    pub async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{}\r\n", line).as_bytes())
            .await
            .unwrap();
    }

    pub async fn expect_raw(&mut self) -> String {
        tokio::time::timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for a line")
            .unwrap()
            .expect("connection closed")
    }

    pub async fn expect(&mut self) -> Command {
        let line = self.expect_raw().await;
        line.parse::<Message>().unwrap().command
    }

    pub async fn expect_eof(&mut self) {
        let next = tokio::time::timeout(WAIT, self.lines.next_line())
            .await
            .expect("timed out waiting for EOF")
            .unwrap();
        assert_eq!(next, None);
    }
}

pub fn identity(nick: &str) -> Identity {
    Identity {
        nick: nick.to_string(),
        name: "Crab Drop".to_string(),
        ident: "crab".to_string(),
    }
}

pub fn client_for(port: u16, hooks: HookRegistry) -> Client {
    Client::new(
        identity("bot"),
        Target {
            host: "127.0.0.1".to_string(),
            port,
            tls: false,
        },
        Arc::new(hooks),
    )
}

/// A connected client named `bot` and the server end of its socket.
pub async fn connected(hooks: HookRegistry) -> (Client, FakeServer) {
    connected_as(identity("bot"), HashMap::new(), hooks).await
}

pub async fn connected_as(
    identity: Identity,
    settings: HashMap<String, String>,
    hooks: HookRegistry,
) -> (Client, FakeServer) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let target = Target {
        host: "127.0.0.1".to_string(),
        port,
        tls: false,
    };
    let mut client = Client::new(identity, target, Arc::new(hooks)).with_config(settings);

    let (result, server) = tokio::join!(client.connect(), accept(&listener));
    result.unwrap();
    (client, server)
}

/// Wait for the next client to connect to `listener`.
pub async fn accept(listener: &TcpListener) -> FakeServer {
    let (socket, _) = tokio::time::timeout(WAIT, listener.accept())
        .await
        .expect("timed out waiting for a client")
        .unwrap();
    let (read, writer) = socket.into_split();
    FakeServer {
        lines: BufReader::new(read).lines(),
        writer,
    }
}

pub fn settings(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
