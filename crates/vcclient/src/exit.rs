use std::fmt;
use std::io;

use vcclient_decode::DecodeError;
use vcclient_frame::FrameError;
use vcclient_session::{ClientError, ErrorClass};
use vcclient_transport::TransportError;

pub const SUCCESS: i32 = 0;
/// The server rejected the command.
pub const FAILURE: i32 = 1;
pub const CONNECTION_ERROR: i32 = 3;
pub const PROTOCOL_ERROR: i32 = 4;
pub const PERMISSION_DENIED: i32 = 50;
pub const DATA_INVALID: i32 = 60;
pub const USAGE: i32 = 64;
pub const TIMEOUT: i32 = 124;
pub const INTERNAL: i32 = 125;

pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug)]
pub struct CliError {
    pub code: i32,
    pub message: String,
}

impl CliError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

pub fn io_error(context: &str, err: io::Error) -> CliError {
    let code = match err.kind() {
        io::ErrorKind::PermissionDenied => PERMISSION_DENIED,
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => TIMEOUT,
        io::ErrorKind::NotFound => USAGE,
        _ => CONNECTION_ERROR,
    };
    CliError::new(code, format!("{context}: {err}"))
}

/// Exit code for an error class.
pub fn class_code(class: ErrorClass) -> i32 {
    match class {
        ErrorClass::Connection => CONNECTION_ERROR,
        ErrorClass::Protocol => PROTOCOL_ERROR,
        ErrorClass::Command => FAILURE,
        ErrorClass::Parse => DATA_INVALID,
    }
}

pub fn client_error(context: &str, err: ClientError) -> CliError {
    if let Some(io_err) = timeout_source(&err) {
        return CliError::new(TIMEOUT, format!("{context}: {io_err}"));
    }
    if let Some(message) = err.server_message() {
        return CliError::new(class_code(err.class()), format!("{context}: {message}"));
    }
    CliError::new(class_code(err.class()), format!("{context}: {err}"))
}

pub fn decode_error(context: &str, err: DecodeError) -> CliError {
    client_error(context, ClientError::Decode(err))
}

fn timeout_source(err: &ClientError) -> Option<&io::Error> {
    let io_err = match err {
        ClientError::Transport(TransportError::Connect { source, .. }) => source,
        ClientError::Transport(TransportError::Io(source)) => source,
        ClientError::Frame(FrameError::Io(source)) => source,
        _ => return None,
    };
    matches!(
        io_err.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
    .then_some(io_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vcclient_frame::{AckCode, CommandRejected};
    use vcclient_transport::ServerAddr;

    #[test]
    fn rejected_command_keeps_server_text() {
        let err = ClientError::from(CommandRejected {
            code: AckCode::Rejected,
            endpoint_id: "00000001".into(),
            message: "no such line".into(),
        });
        let cli = client_error("exec failed", err);
        assert_eq!(cli.code, FAILURE);
        assert_eq!(cli.message, "exec failed: no such line");
    }

    #[test]
    fn connect_timeout_maps_to_timeout_code() {
        let err = ClientError::Transport(TransportError::Connect {
            addr: ServerAddr::new("10.0.0.1", 5000),
            source: io::Error::from(io::ErrorKind::TimedOut),
        });
        assert_eq!(client_error("connect failed", err).code, TIMEOUT);
    }

    #[test]
    fn classes_map_to_distinct_codes() {
        assert_eq!(
            client_error("x", ClientError::Closed).code,
            CONNECTION_ERROR
        );
        assert_eq!(
            decode_error(
                "x",
                DecodeError::Parse {
                    reason: "mixed words and nested records".into(),
                    fragment: "a {b c}".into(),
                }
            )
            .code,
            DATA_INVALID
        );
        assert_eq!(
            client_error("x", ClientError::Frame(FrameError::InvalidLength("zz".into()))).code,
            PROTOCOL_ERROR
        );
    }
}
