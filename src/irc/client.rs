//! The IRC client: connection lifecycle, registration, the receive loop and
//! outbound commands.
//!
//! A [`Client`] owns one connection. [`Client::run`] reads frames until the
//! connection fails or the server ends the session, answering PINGs itself
//! and handing every other frame to the registered hooks in order. Hooks get
//! `&mut Client` and may send replies directly; background tasks send through
//! a [`ClientHandle`] instead.

use super::codec;
use super::connection::{self, Connection, DEFAULT_IO_TIMEOUT};
use super::error::ClientError;
use super::hooks::HookRegistry;
use irc::client::prelude::{Command, Message};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

/// Line budget for one PRIVMSG. Well under the 512 byte protocol limit since
/// the server prepends our nick!user@host when relaying.
const MAX_MESSAGE: usize = 412;

/// Bytes of a PRIVMSG line that are not the target or the text.
const MESSAGE_OVERHEAD: usize = "PRIVMSG ".len() + " :".len() + "\r\n".len();

/// Maximum bytes of message text sent per PRIVMSG.
pub const MESSAGE_CHUNK: usize = MAX_MESSAGE - MESSAGE_OVERHEAD;

/// Who we say we are.
#[derive(Debug, Clone)]
pub struct Identity {
    pub nick: String,
    pub name: String,
    pub ident: String,
}

/// Where we connect.
#[derive(Debug, Clone)]
pub struct Target {
    pub host: String,
    pub port: u16,
    pub tls: bool,
}

enum Inbound {
    Line(io::Result<String>),
    Queued(Command),
}

pub struct Client {
    identity: Identity,
    target: Target,
    /// Free-form settings for hooks. Never interpreted by the client.
    config: HashMap<String, String>,
    /// Set by a hook once the server welcomes us.
    registered: bool,
    /// Deadline applied to each read and write.
    timeout: Duration,
    hooks: Arc<HookRegistry>,
    /// `Some` exactly while a transport is live.
    conn: Option<Connection>,
    queue_tx: mpsc::UnboundedSender<Command>,
    queue_rx: mpsc::UnboundedReceiver<Command>,
}

impl Client {
    pub fn new(identity: Identity, target: Target, hooks: Arc<HookRegistry>) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            identity,
            target,
            config: HashMap::new(),
            registered: false,
            timeout: DEFAULT_IO_TIMEOUT,
            hooks,
            conn: None,
            queue_tx,
            queue_rx,
        }
    }

    pub fn with_config(mut self, config: HashMap<String, String>) -> Self {
        self.config = config;
        self
    }

    pub fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn nick(&self) -> &str {
        &self.identity.nick
    }

    pub fn config(&self) -> &HashMap<String, String> {
        &self.config
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.config.get(key).map(String::as_str)
    }

    /// Liveness hint only: a half-open socket shows up on the next I/O.
    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub fn set_registered(&mut self) {
        self.registered = true;
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    /// A cloneable sender for commands originating off the client's task.
    pub fn handle(&self) -> ClientHandle {
        ClientHandle {
            queue: self.queue_tx.clone(),
        }
    }

    /// Dial the server. An existing connection is dropped first, along with
    /// any commands still queued for it.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        if let Some(old) = self.conn.take() {
            debug!("replacing existing connection");
            if let Err(e) = old.close(self.timeout).await {
                debug!(error = %e, "error closing previous connection");
            }
        }
        self.registered = false;
        while self.queue_rx.try_recv().is_ok() {}

        let transport =
            connection::dial(&self.target.host, self.target.port, self.target.tls).await?;
        self.conn = Some(Connection::new(transport));

        info!(
            host = %self.target.host,
            port = self.target.port,
            tls = self.target.tls,
            "connected"
        );
        Ok(())
    }

    /// Drop the connection. Calling this while disconnected is a no-op.
    pub async fn close(&mut self) -> Result<(), ClientError> {
        self.registered = false;
        match self.conn.take() {
            Some(conn) => Ok(conn.close(self.timeout).await?),
            None => Ok(()),
        }
    }

    /// Read and decode one frame, waiting at most the I/O timeout.
    pub async fn read_message(&mut self) -> Result<Message, ClientError> {
        let deadline = Instant::now() + self.timeout;
        let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;
        let line = conn.read_line(deadline).await;
        self.accept_line(line)
    }

    /// Encode and write one frame, waiting at most the I/O timeout.
    pub async fn write_message(&mut self, message: &Message) -> Result<(), ClientError> {
        let encoded = codec::encode(message)?;
        if encoded.truncated {
            warn!(line = %encoded.line.trim_end(), "outbound message truncated");
        }

        let timeout = self.timeout;
        let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;
        match conn.write_line(&encoded.line, timeout).await {
            Ok(()) => {
                debug!(line = %encoded.line.trim_end(), "sent");
                Ok(())
            }
            Err(e) => {
                self.conn = None;
                Err(e.into())
            }
        }
    }

    pub async fn send(&mut self, command: Command) -> Result<(), ClientError> {
        self.write_message(&Message::from(command)).await
    }

    /// Process frames until the connection ends.
    ///
    /// Returns an error for any transport or decode failure. When the server
    /// sends ERROR (its acknowledgement of our QUIT) the connection is closed
    /// and the close outcome is returned.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        loop {
            let message = self.next_message().await?;

            if let Command::PING(token, _) = &message.command {
                self.pong(token).await?;
            }

            if is_server_error(&message.command) {
                info!("server ended the session");
                return self.close().await;
            }

            self.dispatch(&message).await;
        }
    }

    /// Wait for the next inbound frame, writing out queued commands while
    /// waiting. The read deadline is armed once per frame.
    async fn next_message(&mut self) -> Result<Message, ClientError> {
        let deadline = Instant::now() + self.timeout;
        loop {
            let inbound = {
                let conn = self.conn.as_mut().ok_or(ClientError::NotConnected)?;
                tokio::select! {
                    biased;
                    Some(command) = self.queue_rx.recv() => Inbound::Queued(command),
                    line = conn.read_line(deadline) => Inbound::Line(line),
                }
            };

            match inbound {
                Inbound::Queued(command) => {
                    let name = command_name(&command);
                    self.send(command).await.map_err(|e| e.sending(name))?
                }
                Inbound::Line(line) => return self.accept_line(line),
            }
        }
    }

    fn accept_line(&mut self, line: io::Result<String>) -> Result<Message, ClientError> {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                self.conn = None;
                return Err(e.into());
            }
        };
        debug!(line = %line, "read");

        let decoded = codec::decode(&line)?;
        if decoded.truncated {
            warn!(line = %line, "inbound message truncated");
        }
        Ok(decoded.message)
    }

    async fn dispatch(&mut self, message: &Message) {
        let hooks = Arc::clone(&self.hooks);
        for hook in hooks.iter() {
            trace!(hook = hook.name(), "dispatching");
            hook.on_message(self, message).await;
        }
    }

    /// Send NICK then USER. Stops at the first failure.
    pub async fn register(&mut self) -> Result<(), ClientError> {
        self.nick_command().await?;
        self.user_command().await
    }

    pub async fn nick_command(&mut self) -> Result<(), ClientError> {
        let nick = self.identity.nick.clone();
        self.send(Command::NICK(nick))
            .await
            .map_err(|e| e.sending("NICK"))
    }

    pub async fn user_command(&mut self) -> Result<(), ClientError> {
        let ident = self.identity.ident.clone();
        let name = self.identity.name.clone();
        self.send(Command::USER(ident, "0".to_string(), name))
            .await
            .map_err(|e| e.sending("USER"))
    }

    pub async fn pong(&mut self, token: &str) -> Result<(), ClientError> {
        self.send(Command::PONG(token.to_string(), None))
            .await
            .map_err(|e| e.sending("PONG"))
    }

    pub async fn join(&mut self, channel: &str) -> Result<(), ClientError> {
        self.send(Command::JOIN(channel.to_string(), None, None))
            .await
            .map_err(|e| e.sending("JOIN"))
    }

    /// Send a PRIVMSG, split over as many lines as the text needs.
    ///
    /// Pieces go out in order. If one fails, the ones before it have already
    /// been delivered and the rest are not attempted.
    pub async fn message(&mut self, target: &str, text: &str) -> Result<(), ClientError> {
        let pieces = codec::split_message(text, MESSAGE_CHUNK);
        let total = pieces.len();
        for (sent, piece) in pieces.into_iter().enumerate() {
            let command = Command::PRIVMSG(target.to_string(), piece.to_string());
            if let Err(e) = self.send(command).await {
                return Err(ClientError::PartialMessage {
                    sent,
                    total,
                    source: Box::new(e.sending("PRIVMSG")),
                });
            }
        }
        Ok(())
    }

    pub async fn notice(&mut self, target: &str, text: &str) -> Result<(), ClientError> {
        self.send(Command::NOTICE(target.to_string(), text.to_string()))
            .await
            .map_err(|e| e.sending("NOTICE"))
    }

    /// Ask the server to end the session. It answers with ERROR, which ends
    /// [`run`](Self::run).
    pub async fn quit(&mut self, message: &str) -> Result<(), ClientError> {
        self.send(Command::QUIT(Some(message.to_string())))
            .await
            .map_err(|e| e.sending("QUIT"))
    }

    pub async fn oper(&mut self, name: &str, password: &str) -> Result<(), ClientError> {
        self.send(Command::OPER(name.to_string(), password.to_string()))
            .await
            .map_err(|e| e.sending("OPER"))
    }

    pub async fn user_mode(&mut self, nick: &str, modes: &str) -> Result<(), ClientError> {
        // The typed UserMODE variant wants parsed modes; pass the string through.
        let command = Command::Raw("MODE".to_string(), vec![nick.to_string(), modes.to_string()]);
        self.send(command).await.map_err(|e| e.sending("MODE"))
    }
}

fn is_server_error(command: &Command) -> bool {
    match command {
        Command::ERROR(_) => true,
        Command::Raw(name, _) => name.eq_ignore_ascii_case("ERROR"),
        _ => false,
    }
}

/// The verb of `command` as it goes on the wire, e.g. `PRIVMSG` or `001`.
fn command_name(command: &Command) -> String {
    match command {
        Command::Raw(name, _) => name.clone(),
        other => String::from(other)
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}

/// Queues commands for the client's loop to send.
///
/// Safe to use from any task. Commands are written in queue order while the
/// loop waits for its next frame; they are discarded if the client reconnects
/// before sending them.
#[derive(Debug, Clone)]
pub struct ClientHandle {
    queue: mpsc::UnboundedSender<Command>,
}

impl ClientHandle {
    pub fn send(&self, command: Command) -> Result<(), ClientError> {
        self.queue
            .send(command)
            .map_err(|_| ClientError::HandleClosed)
    }

    pub fn join(&self, channel: &str) -> Result<(), ClientError> {
        self.send(Command::JOIN(channel.to_string(), None, None))
    }

    pub fn message(&self, target: &str, text: &str) -> Result<(), ClientError> {
        for piece in codec::split_message(text, MESSAGE_CHUNK) {
            self.send(Command::PRIVMSG(target.to_string(), piece.to_string()))?;
        }
        Ok(())
    }

    pub fn quit(&self, message: &str) -> Result<(), ClientError> {
        self.send(Command::QUIT(Some(message.to_string())))
    }
}
