use vcclient_frame::CommandRejected;

/// Errors that can occur while decoding a reply.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Braces do not balance; `offset` is where the problem was detected.
    #[error("unbalanced braces at byte {offset}: '{fragment}'")]
    Unbalanced { offset: usize, fragment: String },

    /// A record could not be classified.
    #[error("cannot parse record ({reason}): '{fragment}'")]
    Parse { reason: String, fragment: String },

    /// A fixed-arity record had the wrong number of fields.
    #[error("expected {expected} fields, found {found}: '{record}'")]
    Arity {
        expected: usize,
        found: usize,
        record: String,
    },

    /// A key appeared twice within one mapping.
    #[error("duplicate key '{key}' in '{fragment}'")]
    DuplicateKey { key: String, fragment: String },

    /// The payload (or an embedded value) is not valid JSON.
    #[error("invalid JSON payload: {0}")]
    Json(#[from] serde_json::Error),

    /// The server rejected the command.
    #[error(transparent)]
    Command(#[from] CommandRejected),

    /// No decode strategy is registered for the command keyword.
    #[error("no decoder registered for command '{0}'")]
    UnknownCommand(String),
}

impl DecodeError {
    pub(crate) fn parse(reason: impl Into<String>, fragment: impl Into<String>) -> Self {
        DecodeError::Parse {
            reason: reason.into(),
            fragment: fragment.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DecodeError>;
