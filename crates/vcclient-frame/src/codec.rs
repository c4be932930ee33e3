use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};
use crate::kind::FrameKind;

/// Endpoint id used by frames not addressed to an endpoint.
pub const NULL_ENDPOINT: &str = "00000000";

/// Width of the endpoint id field.
pub const ENDPOINT_ID_WIDTH: usize = 8;

/// Largest payload the 4-hex-digit length field can describe.
pub const MAX_PAYLOAD: usize = 0xFFFF;

/// Upper bound on header bytes accumulated before the third `:`.
pub const MAX_HEADER_LEN: usize = 64;

/// Terminator every command body ends with. Part of the payload, not the
/// framing.
pub const COMMAND_TERMINATOR: u8 = b'@';

const HEADER_FIELDS: usize = 3;

/// Decoded frame header: `kind:endpointId:lengthHex:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHeader {
    /// First header token. A frame kind on requests, an ack code on replies,
    /// ignored on events.
    pub kind: String,
    /// Endpoint id token, verbatim.
    pub endpoint_id: String,
    /// Payload length in bytes.
    pub length: u16,
}

impl FrameHeader {
    /// True once `buf` holds a complete header, i.e. three `:` separators.
    pub fn is_complete(buf: &[u8]) -> bool {
        buf.iter().filter(|&&b| b == b':').count() >= HEADER_FIELDS
    }

    /// Parse a complete header (including the trailing colon).
    pub fn parse(buf: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(buf)
            .map_err(|_| FrameError::MalformedHeader(String::from_utf8_lossy(buf).into_owned()))?;
        let body = text
            .strip_suffix(':')
            .ok_or_else(|| FrameError::MalformedHeader(text.to_string()))?;

        let tokens: Vec<&str> = body.split(':').collect();
        if tokens.len() != HEADER_FIELDS {
            return Err(FrameError::MalformedHeader(text.to_string()));
        }

        let length = parse_length(tokens[2])?;
        Ok(Self {
            kind: tokens[0].to_string(),
            endpoint_id: tokens[1].to_string(),
            length,
        })
    }
}

/// A complete frame: header plus exactly `header.length` payload bytes.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: Bytes,
}

impl Frame {
    /// Payload as text, replacing invalid UTF-8.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }
}

/// Encode a payload length as exactly four zero-padded hex digits.
pub fn encode_length(len: usize) -> Result<String> {
    if len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: len,
            max: MAX_PAYLOAD,
        });
    }
    Ok(format!("{len:04x}"))
}

/// Validate an endpoint id and left-pad it with zeros to 8 characters.
///
/// `None` and the empty string map to [`NULL_ENDPOINT`].
pub fn normalize_endpoint_id(endpoint_id: Option<&str>) -> Result<String> {
    let id = match endpoint_id {
        None => return Ok(NULL_ENDPOINT.to_string()),
        Some(id) if id.is_empty() => return Ok(NULL_ENDPOINT.to_string()),
        Some(id) => id,
    };
    if id.len() > ENDPOINT_ID_WIDTH || !id.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(FrameError::InvalidEndpointId(id.to_string()));
    }
    Ok(format!("{id:0>width$}", width = ENDPOINT_ID_WIDTH))
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────┬───┬──────────────┬───┬────────────┬───┬───────────────────┐
/// │ kind │ : │ endpoint (8) │ : │ length (4) │ : │ payload           │
/// │ 'c'  │   │ "00000000"   │   │ hex, BE    │   │ (length bytes)    │
/// └──────┴───┴──────────────┴───┴────────────┴───┴───────────────────┘
/// ```
/// The payload is written as-is; a command body's trailing `@` is the
/// caller's job.
pub fn encode_frame(
    kind: FrameKind,
    endpoint_id: Option<&str>,
    payload: &[u8],
    dst: &mut BytesMut,
) -> Result<()> {
    let length = encode_length(payload.len())?;
    let endpoint = normalize_endpoint_id(endpoint_id)?;

    dst.reserve(1 + ENDPOINT_ID_WIDTH + 4 + HEADER_FIELDS + payload.len());
    dst.put_u8(kind.as_char() as u8);
    dst.put_u8(b':');
    dst.put_slice(endpoint.as_bytes());
    dst.put_u8(b':');
    dst.put_slice(length.as_bytes());
    dst.put_u8(b':');
    dst.put_slice(payload);
    Ok(())
}

/// Encode a frame into a fresh buffer.
pub fn frame_bytes(kind: FrameKind, endpoint_id: Option<&str>, payload: &[u8]) -> Result<Bytes> {
    let mut buf = BytesMut::new();
    encode_frame(kind, endpoint_id, payload, &mut buf)?;
    Ok(buf.freeze())
}

/// Encode one handshake field with a plain decimal length prefix.
///
/// With a label: `<label>:<decimalLen>:<value>`; without: `<decimalLen>:<value>`.
pub fn encode_handshake_field(label: Option<&str>, value: &str) -> Bytes {
    let text = match label {
        Some(label) => format!("{label}:{}:{value}", value.len()),
        None => format!("{}:{value}", value.len()),
    };
    Bytes::from(text)
}

fn parse_length(token: &str) -> Result<u16> {
    if token.is_empty() || token.len() > 4 || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(FrameError::InvalidLength(token.to_string()));
    }
    u16::from_str_radix(token, 16).map_err(|_| FrameError::InvalidLength(token.to_string()))
}
