//! Client side of the connection handshake.
//!
//! ```text
//! client: vcclientversion:<declen>:<version>
//! server: 'a'                         | <other byte> <4 decimal digits> <reason>
//! client: <declen>:<credential>
//! server: <4 hex digits: event port>
//! ```
//!
//! Unlike command frames, the handshake uses decimal length prefixes.

use std::io::Read;
use std::str;

use tracing::{debug, info, warn};
use vcclient_decode::OutputFormat;
use vcclient_frame::{
    encode_handshake_field, read_exact, read_frame, Acknowledgement, FrameKind, FrameWriter,
};

use crate::error::{ClientError, Result};

/// Number of dot-separated components in a server version.
pub const VERSION_COMPONENTS: usize = 6;

const VERSION_LABEL: &str = "vcclientversion";
const STATUS_ACCEPTED: u8 = b'a';
const REASON_LEN_DIGITS: usize = 4;
const EVENT_PORT_DIGITS: usize = 4;
const MAX_VERSION_LEN: usize = 64;
const MAX_CREDENTIAL_LEN: usize = 4096;

/// Body of the output-format request, including the command terminator.
pub const SET_JSON_COMMAND: &[u8] = b"setoutputformat json@";

/// Result of a successful handshake.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeResult {
    /// Version string the server accepted.
    pub version: String,
    /// Port of the event channel on the same server.
    pub event_port: u16,
}

/// Perform the client handshake on a freshly opened command socket.
///
/// A rejection by the server is [`ClientError::HandshakeRejected`] carrying
/// the server's reason; the caller drops the socket.
pub fn handshake_client<R: Read, W: std::io::Write>(
    reader: &mut R,
    writer: &mut FrameWriter<W>,
    client_version: &str,
    credential: &str,
) -> Result<HandshakeResult> {
    validate_field("client version", client_version, MAX_VERSION_LEN)?;
    validate_field("credential", credential, MAX_CREDENTIAL_LEN)?;

    writer.write_raw(&encode_handshake_field(Some(VERSION_LABEL), client_version))?;

    let status = read_exact(reader, 1)?;
    if status[0] != STATUS_ACCEPTED {
        let len = read_decimal(reader, REASON_LEN_DIGITS)?;
        let reason = read_exact(reader, len)?;
        let reason = String::from_utf8_lossy(&reason).into_owned();
        warn!(version = client_version, %reason, "server rejected client version");
        return Err(ClientError::HandshakeRejected(reason));
    }

    writer.write_raw(&encode_handshake_field(None, credential))?;

    let port_digits = read_exact(reader, EVENT_PORT_DIGITS)?;
    let event_port = str::from_utf8(&port_digits)
        .ok()
        .and_then(|digits| u16::from_str_radix(digits, 16).ok())
        .filter(|port| *port != 0)
        .ok_or_else(|| {
            ClientError::Handshake(format!(
                "invalid event port '{}'",
                String::from_utf8_lossy(&port_digits)
            ))
        })?;

    debug!(version = client_version, event_port, "handshake accepted");
    Ok(HandshakeResult {
        version: client_version.to_string(),
        event_port,
    })
}

/// Ask the server for JSON replies and report the format it settled on.
///
/// Only an accepted reply whose payload is `json` switches the format;
/// anything else keeps [`OutputFormat::Legacy`].
pub fn negotiate_output_format<R: Read, W: std::io::Write>(
    reader: &mut R,
    writer: &mut FrameWriter<W>,
) -> Result<OutputFormat> {
    writer.send(FrameKind::Command, None, SET_JSON_COMMAND)?;
    let ack = Acknowledgement::from_frame(&read_frame(reader)?);
    let format = if ack.is_accepted() && ack.message.trim().eq_ignore_ascii_case("json") {
        OutputFormat::Json
    } else {
        OutputFormat::Legacy
    };
    info!(ack = %ack.ack, %format, "output format negotiated");
    Ok(format)
}

/// Parse a dotted version into six numeric components.
///
/// Missing trailing components are zero. Returns `None` for empty or
/// non-numeric components or more than six of them.
pub fn parse_version(version: &str) -> Option<[u32; VERSION_COMPONENTS]> {
    let mut out = [0u32; VERSION_COMPONENTS];
    let mut count = 0usize;
    for part in version.trim().split('.') {
        if count == VERSION_COMPONENTS {
            return None;
        }
        out[count] = part.parse().ok()?;
        count += 1;
    }
    Some(out)
}

/// True when `version` compares numerically `>=` `min`.
///
/// Unparseable versions never qualify.
pub fn supports_json(version: &str, min: &[u32; VERSION_COMPONENTS]) -> bool {
    parse_version(version).is_some_and(|parsed| parsed >= *min)
}

fn read_decimal<R: Read>(reader: &mut R, digits: usize) -> Result<usize> {
    let raw = read_exact(reader, digits)?;
    str::from_utf8(&raw)
        .ok()
        .filter(|text| text.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|text| text.parse().ok())
        .ok_or_else(|| {
            ClientError::Handshake(format!(
                "invalid decimal length '{}'",
                String::from_utf8_lossy(&raw)
            ))
        })
}

fn validate_field(name: &str, value: &str, max: usize) -> Result<()> {
    if value.len() > max {
        return Err(ClientError::Handshake(format!(
            "{name} too long: {} bytes (max {max})",
            value.len()
        )));
    }
    if value.contains(':') {
        return Err(ClientError::Handshake(format!("{name} must not contain ':'")));
    }
    Ok(())
}
