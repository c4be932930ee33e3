use std::fmt;

use vcclient_decode::DecodeError;
use vcclient_frame::{CommandRejected, FrameError};
use vcclient_transport::TransportError;

/// Errors that can occur in client session operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// Reply decoding failed or the server rejected the command.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The server refused the client version; carries the server's reason.
    #[error("handshake rejected by server: {0}")]
    HandshakeRejected(String),

    /// The handshake exchange did not follow the protocol.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// No credential was configured; nothing is sent to the server.
    #[error("no credential configured")]
    MissingCredential,

    /// A generic command failed on every attempt.
    #[error("command failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        source: Box<ClientError>,
    },

    /// The connection has been closed.
    #[error("connection closed")]
    Closed,
}

impl From<CommandRejected> for ClientError {
    fn from(err: CommandRejected) -> Self {
        ClientError::Decode(DecodeError::Command(err))
    }
}

/// Four-way classification of every client error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Socket-level failure or handshake rejection; fatal to the connection.
    Connection,
    /// Bytes that violate the framing or grammar contract.
    Protocol,
    /// The server answered with a non-accepted acknowledgement.
    Command,
    /// A reply record could not be classified.
    Parse,
}

impl ErrorClass {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Connection => "connection",
            ErrorClass::Protocol => "protocol",
            ErrorClass::Command => "command",
            ErrorClass::Parse => "parse",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ClientError {
    /// Class of this error in the connection/protocol/command/parse taxonomy.
    pub fn class(&self) -> ErrorClass {
        match self {
            ClientError::Transport(_)
            | ClientError::HandshakeRejected(_)
            | ClientError::Closed
            | ClientError::MissingCredential
            | ClientError::RetriesExhausted { .. } => ErrorClass::Connection,
            ClientError::Frame(err) if err.is_protocol() => ErrorClass::Protocol,
            ClientError::Frame(_) => ErrorClass::Connection,
            ClientError::Handshake(_) => ErrorClass::Protocol,
            ClientError::Decode(err) => match err {
                DecodeError::Command(_) => ErrorClass::Command,
                DecodeError::Parse { .. }
                | DecodeError::DuplicateKey { .. }
                | DecodeError::UnknownCommand(_) => ErrorClass::Parse,
                DecodeError::Unbalanced { .. }
                | DecodeError::Arity { .. }
                | DecodeError::Json(_) => ErrorClass::Protocol,
            },
        }
    }

    /// The server's diagnostic text when the command was rejected.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            ClientError::Decode(DecodeError::Command(rejected)) => Some(&rejected.message),
            ClientError::HandshakeRejected(reason) => Some(reason),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
