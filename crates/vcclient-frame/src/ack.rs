use std::fmt;

use crate::codec::{Frame, NULL_ENDPOINT};

/// Acknowledgement code carried in the kind position of a reply header.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AckCode {
    /// `A`: the command was accepted.
    Accepted,
    /// `N`: the command was rejected; the payload is the server's diagnostic.
    Rejected,
    /// Any other code, upper-cased.
    Other(String),
}

impl AckCode {
    /// Classify a header kind token (case-insensitive).
    pub fn from_token(token: &str) -> Self {
        match token.to_ascii_uppercase().as_str() {
            "A" => AckCode::Accepted,
            "N" => AckCode::Rejected,
            other => AckCode::Other(other.to_string()),
        }
    }

    /// Wire form of the code.
    pub fn as_str(&self) -> &str {
        match self {
            AckCode::Accepted => "A",
            AckCode::Rejected => "N",
            AckCode::Other(code) => code,
        }
    }
}

impl fmt::Display for AckCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reply to a command: `{ack, endpointId, message}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acknowledgement {
    pub ack: AckCode,
    pub endpoint_id: String,
    pub message: String,
}

impl Acknowledgement {
    /// Build an acknowledgement from a reply frame.
    pub fn from_frame(frame: &Frame) -> Self {
        Self {
            ack: AckCode::from_token(&frame.header.kind),
            endpoint_id: frame.header.endpoint_id.clone(),
            message: frame.payload_text(),
        }
    }

    /// Accepted acknowledgement for an unframed (generic) reply.
    pub fn generic(message: impl Into<String>) -> Self {
        Self {
            ack: AckCode::Accepted,
            endpoint_id: NULL_ENDPOINT.to_string(),
            message: message.into(),
        }
    }

    /// True when the server accepted the command.
    pub fn is_accepted(&self) -> bool {
        self.ack == AckCode::Accepted
    }

    /// Turn a non-accepted acknowledgement into a [`CommandRejected`] error.
    pub fn into_result(self) -> std::result::Result<Self, CommandRejected> {
        if self.is_accepted() {
            Ok(self)
        } else {
            Err(CommandRejected {
                code: self.ack,
                endpoint_id: self.endpoint_id,
                message: self.message,
            })
        }
    }
}

/// The server refused a command; `message` is its diagnostic text, verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("command rejected by server (ack {code}, endpoint {endpoint_id}): {message}")]
pub struct CommandRejected {
    pub code: AckCode,
    pub endpoint_id: String,
    pub message: String,
}
