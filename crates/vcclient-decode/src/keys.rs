//! Keys whose values do not follow the generic record grammar.
//!
//! These are dispatched by name. Structure alone cannot tell them apart from
//! ordinary records: `{codeclist {{g711u} {g729}}}` is a list of codecs,
//! while the same shape under any other key is a mapping of empty records.

/// Shape of a key-specific value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyShape {
    /// `{{a} {b} {c}}`: a list whose elements are each braced.
    BraceList,
    /// `{event ip date time}`: one server-failover registration entry.
    /// Repeated records with this key accumulate into a list.
    FailoverTimestamp,
    /// An independently serialized JSON document embedded in the text.
    JsonDocument,
}

/// Keys whose value is a list of braced elements.
pub const BRACE_LIST_KEYS: &[&str] = &["codeclist", "features", "speeddials", "blflist"];

/// Key of the server-failover statistics entries.
pub const FAILOVER_TIMESTAMP_KEY: &str = "timestamp";

/// Positional field names of a failover statistics entry.
pub const FAILOVER_FIELDS: [&str; 4] = ["registration_event", "ip", "date", "time"];

/// Keys whose value is an embedded JSON document.
pub const JSON_DOCUMENT_KEYS: &[&str] = &["profile", "jsonprofile"];

/// Shape for `key`, or `None` for the generic grammar.
pub fn shape_for(key: &str) -> Option<KeyShape> {
    if key == FAILOVER_TIMESTAMP_KEY {
        Some(KeyShape::FailoverTimestamp)
    } else if BRACE_LIST_KEYS.contains(&key) {
        Some(KeyShape::BraceList)
    } else if JSON_DOCUMENT_KEYS.contains(&key) {
        Some(KeyShape::JsonDocument)
    } else {
        None
    }
}
