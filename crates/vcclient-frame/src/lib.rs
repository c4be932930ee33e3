//! Hex length-prefixed framing for the vcclient wire protocol.
//!
//! Every command and reply is framed as:
//! ```text
//! <kind>:<endpointId>:<lengthHex>:<payload>
//! ```
//! where `endpointId` is 8 zero-padded characters (`00000000` when the
//! command is not addressed to an endpoint) and `lengthHex` is the payload
//! length as 4 hex digits. Readers never hand out short payloads.
//!
//! The handshake is the one exception: it uses decimal length prefixes and
//! no kind/endpoint fields, see [`codec::encode_handshake_field`].

pub mod ack;
pub mod codec;
pub mod error;
pub mod kind;
pub mod reader;
pub mod writer;

pub use ack::{AckCode, Acknowledgement, CommandRejected};
pub use codec::{
    encode_frame, encode_handshake_field, encode_length, frame_bytes, normalize_endpoint_id,
    Frame, FrameHeader, COMMAND_TERMINATOR, ENDPOINT_ID_WIDTH, MAX_HEADER_LEN, MAX_PAYLOAD,
    NULL_ENDPOINT,
};
pub use error::{FrameError, Result};
pub use kind::FrameKind;
pub use reader::{read_exact, read_frame, read_header, read_line, FrameReader};
pub use writer::FrameWriter;
