use std::fmt;
use std::time::Duration;

use crate::handshake::VERSION_COMPONENTS;

/// Configuration for opening a server connection.
#[derive(Clone)]
pub struct ConnectionConfig {
    /// Credential token sent after the version is accepted. Empty by
    /// default; connecting with an empty credential fails with
    /// [`ClientError::MissingCredential`](crate::ClientError::MissingCredential).
    /// Redacted in debug output and never logged.
    pub credential: String,
    /// Bound on each TCP connect. `None` waits for the OS default.
    pub connect_timeout: Option<Duration>,
    /// Read timeout of the event socket; a timeout means "no event yet".
    pub event_read_timeout: Duration,
    /// Attempts for generic (non-endpoint-addressed) commands.
    pub generic_attempts: u32,
    /// Backoff unit between generic attempts, multiplied by the attempt number.
    pub generic_backoff: Duration,
    /// Oldest server version that is asked for JSON replies.
    pub json_min_version: [u32; VERSION_COMPONENTS],
    /// Ask new-enough servers for JSON replies.
    pub negotiate_json: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            credential: String::new(),
            connect_timeout: Some(Duration::from_secs(10)),
            event_read_timeout: Duration::from_millis(200),
            generic_attempts: 3,
            generic_backoff: Duration::from_millis(100),
            json_min_version: [5, 2, 0, 0, 0, 0],
            negotiate_json: true,
        }
    }
}

impl ConnectionConfig {
    /// Default configuration with the given credential.
    pub fn with_credential(credential: impl Into<String>) -> Self {
        Self {
            credential: credential.into(),
            ..Self::default()
        }
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field(
                "credential",
                &format_args!("<redacted:{} bytes>", self.credential.len()),
            )
            .field("connect_timeout", &self.connect_timeout)
            .field("event_read_timeout", &self.event_read_timeout)
            .field("generic_attempts", &self.generic_attempts)
            .field("generic_backoff", &self.generic_backoff)
            .field("json_min_version", &self.json_min_version)
            .field("negotiate_json", &self.negotiate_json)
            .finish()
    }
}
