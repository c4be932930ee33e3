//! Static mapping from command keyword to decode strategy.
//!
//! Adding a command means adding one row to [`COMMANDS`]; no command gets
//! bespoke parsing code.

use std::fmt;

use tracing::debug;
use vcclient_frame::Acknowledgement;

use crate::error::{DecodeError, Result};
use crate::format::OutputFormat;
use crate::grammar::{parse, parse_flat};
use crate::records::parse_named_records;
use crate::value::DecodedValue;

/// How the reply payload of a command is turned into a [`DecodedValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStrategy {
    /// The payload, verbatim.
    RawString,
    /// `1`/`0` as `true`/`false`.
    BooleanFromDigit,
    /// A mapping whose values are all scalars.
    FlatMap,
    /// Fixed-arity positional records, each field named.
    RecordList { fields: &'static [&'static str] },
    /// The full nested grammar.
    NestedMap,
    /// A JSON document in either output format.
    JsonPassthrough,
    /// No meaningful reply; the payload is ignored.
    NoOp,
}

impl DecodeStrategy {
    /// Field count for record lists.
    pub fn arity(&self) -> Option<usize> {
        match self {
            DecodeStrategy::RecordList { fields } => Some(fields.len()),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DecodeStrategy::RawString => "raw-string",
            DecodeStrategy::BooleanFromDigit => "boolean",
            DecodeStrategy::FlatMap => "flat-map",
            DecodeStrategy::RecordList { .. } => "record-list",
            DecodeStrategy::NestedMap => "nested-map",
            DecodeStrategy::JsonPassthrough => "json",
            DecodeStrategy::NoOp => "no-op",
        }
    }
}

impl fmt::Display for DecodeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

const CALL_FIELDS: &[&str] = &["call_ref", "line_ref", "state"];
const STREAM_FIELDS: &[&str] = &["stream_ref", "call_ref", "direction", "codec"];
const LINE_FIELDS: &[&str] = &["line_ref", "extension", "state"];
const CONF_FIELDS: &[&str] = &["conf_id", "call_ref"];

use DecodeStrategy::*;

/// Every known command keyword and its strategy.
pub const COMMANDS: &[(&str, DecodeStrategy)] = &[
    // queries
    ("getversion", RawString),
    ("getdisplay", RawString),
    ("getcallerid", RawString),
    ("getmac", RawString),
    ("getlog", RawString),
    ("setoutputformat", RawString),
    ("isregistered", BooleanFromDigit),
    ("isoffhook", BooleanFromDigit),
    ("ismuted", BooleanFromDigit),
    ("isringing", BooleanFromDigit),
    ("hasdialtone", BooleanFromDigit),
    ("getdeviceinfo", FlatMap),
    ("getstate", FlatMap),
    ("getnetworkinfo", FlatMap),
    ("getregistrationinfo", FlatMap),
    ("getcalls", RecordList { fields: CALL_FIELDS }),
    ("getstreams", RecordList { fields: STREAM_FIELDS }),
    ("getlines", RecordList { fields: LINE_FIELDS }),
    ("getconfids", RecordList { fields: CONF_FIELDS }),
    ("getbuttons", NestedMap),
    ("getdetailedstate", NestedMap),
    ("getlinestate", NestedMap),
    ("getfailoverstats", NestedMap),
    ("getprofile", NestedMap),
    ("getsipinfo", NestedMap),
    ("getfeatures", NestedMap),
    ("getcodecs", NestedMap),
    ("getmediastats", JsonPassthrough),
    ("getconfig", JsonPassthrough),
    ("getjsonstate", JsonPassthrough),
    // call control and device actions
    ("createendpoint", NoOp),
    ("attachendpoint", NoOp),
    ("register", NoOp),
    ("unregister", NoOp),
    ("offhook", NoOp),
    ("onhook", NoOp),
    ("dial", NoOp),
    ("answer", NoOp),
    ("hangup", NoOp),
    ("hold", NoOp),
    ("resume", NoOp),
    ("transfer", NoOp),
    ("conference", NoOp),
    ("pressbutton", NoOp),
    ("senddtmf", NoOp),
    ("mute", NoOp),
    ("unmute", NoOp),
    ("setvolume", NoOp),
    ("playaudio", NoOp),
    ("stopaudio", NoOp),
    ("startrecord", NoOp),
    ("stoprecord", NoOp),
    ("reset", NoOp),
];

/// Commands the server answers in the brace grammar even in JSON mode.
pub const LEGACY_ONLY: &[&str] = &["getfailoverstats", "getconfids", "getprofile"];

/// Strategy for `command`, matched case-insensitively.
pub fn strategy_for(command: &str) -> Option<DecodeStrategy> {
    let command = command.trim();
    COMMANDS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(command))
        .map(|(_, strategy)| *strategy)
}

fn is_legacy_only(command: &str) -> bool {
    LEGACY_ONLY
        .iter()
        .any(|name| name.eq_ignore_ascii_case(command.trim()))
}

/// Decode the reply to `command`.
///
/// A rejected acknowledgement becomes [`DecodeError::Command`] carrying the
/// server's diagnostic text.
pub fn decode(command: &str, ack: Acknowledgement, format: OutputFormat) -> Result<DecodedValue> {
    let ack = ack.into_result()?;
    decode_payload(command, &ack.message, format)
}

/// Decode a raw payload for `command`, without an acknowledgement.
pub fn decode_payload(command: &str, payload: &str, format: OutputFormat) -> Result<DecodedValue> {
    let strategy =
        strategy_for(command).ok_or_else(|| DecodeError::UnknownCommand(command.to_string()))?;
    let format = if is_legacy_only(command) {
        OutputFormat::Legacy
    } else {
        format
    };
    debug!(command, %strategy, %format, len = payload.len(), "decoding reply");
    decode_with(strategy, payload, format)
}

/// Apply `strategy` to `payload` in the given output format.
pub fn decode_with(
    strategy: DecodeStrategy,
    payload: &str,
    format: OutputFormat,
) -> Result<DecodedValue> {
    match (strategy, format) {
        (JsonPassthrough, _) | (FlatMap | RecordList { .. } | NestedMap, OutputFormat::Json) => {
            decode_json(strategy, payload)
        }
        (RawString, _) => Ok(DecodedValue::scalar(payload)),
        (BooleanFromDigit, _) => DecodedValue::scalar(payload)
            .as_bool()
            .map(|b| DecodedValue::Scalar(b.to_string()))
            .ok_or_else(|| DecodeError::parse("expected 0 or 1", payload)),
        (FlatMap, OutputFormat::Legacy) => parse_flat(payload),
        (RecordList { fields }, OutputFormat::Legacy) => parse_named_records(payload, fields),
        (NestedMap, OutputFormat::Legacy) => parse(payload),
        (NoOp, _) => Ok(DecodedValue::unit()),
    }
}

fn decode_json(strategy: DecodeStrategy, payload: &str) -> Result<DecodedValue> {
    let payload = payload.trim();
    if payload.is_empty() {
        return Ok(match strategy {
            RecordList { .. } => DecodedValue::Sequence(Vec::new()),
            _ => DecodedValue::Mapping(Vec::new()),
        });
    }
    let json: serde_json::Value = serde_json::from_str(payload)?;
    Ok(DecodedValue::from(json))
}
