//! Response decoding for the vcclient wire protocol.
//!
//! The server answers most queries with a Tcl-like nested-brace text:
//! ```text
//! {state idle} {buttons {1 2 3}} {line {{id 1} {calls 0}}}
//! ```
//! [`grammar`] turns that text into a [`DecodedValue`] tree, [`records`]
//! handles the flat fixed-arity lists (calls, streams, lines), and
//! [`table`] maps every command keyword to the strategy used to decode its
//! reply. Callers above this crate never parse text themselves; they call
//! [`decode`].

pub mod error;
pub mod format;
pub mod grammar;
pub mod keys;
pub mod lexer;
pub mod records;
pub mod split;
pub mod table;
pub mod value;

pub use error::{DecodeError, Result};
pub use format::OutputFormat;
pub use grammar::{parse, parse_flat};
pub use records::{parse_named_records, parse_record_list};
pub use split::{split_records, RawRecord};
pub use table::{
    decode, decode_payload, decode_with, strategy_for, DecodeStrategy, COMMANDS, LEGACY_ONLY,
};
pub use value::DecodedValue;
