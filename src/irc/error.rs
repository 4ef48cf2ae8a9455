//! Error types for the protocol layer.

use std::io;
use thiserror::Error;

/// Failures turning wire lines into frames and back.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("unable to parse message: {line}: {reason}")]
    Malformed { line: String, reason: String },

    #[error("illegal character {0:?} in outbound message")]
    IllegalCharacter(char),

    #[error("empty outbound message")]
    Empty,
}

/// Errors surfaced by [`Client`](super::client::Client) operations.
///
/// Transport failures (`Connect`, `Io`, `Tls`) are terminal for the current
/// connection; the client has already dropped its transport handle by the
/// time the caller sees them.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not connected")]
    NotConnected,

    #[error("unable to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("TLS setup failed: {0}")]
    Tls(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("failed to send {command}: {source}")]
    Send {
        command: String,
        #[source]
        source: Box<ClientError>,
    },

    #[error("message delivery stopped after {sent} of {total} chunks: {source}")]
    PartialMessage {
        sent: usize,
        total: usize,
        #[source]
        source: Box<ClientError>,
    },

    #[error("client is no longer running")]
    HandleClosed,
}

impl ClientError {
    /// Wrap this error with the name of the command that was being sent.
    pub fn sending(self, command: impl Into<String>) -> Self {
        ClientError::Send {
            command: command.into(),
            source: Box::new(self),
        }
    }

    /// True for errors that came from the socket itself rather than from
    /// building a frame.
    pub fn is_transport(&self) -> bool {
        match self {
            ClientError::Connect { .. } | ClientError::Tls(_) | ClientError::Io(_) => true,
            ClientError::Send { source, .. } | ClientError::PartialMessage { source, .. } => {
                source.is_transport()
            }
            _ => false,
        }
    }
}
