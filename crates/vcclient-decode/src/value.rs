use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Serialize, Serializer};

/// Universal result of decoding a reply.
///
/// Mappings keep insertion order and never repeat a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedValue {
    Scalar(String),
    Sequence(Vec<DecodedValue>),
    Mapping(Vec<(String, DecodedValue)>),
}

impl DecodedValue {
    /// Scalar from anything string-like.
    pub fn scalar(text: impl Into<String>) -> Self {
        DecodedValue::Scalar(text.into())
    }

    /// The empty scalar, used for commands with no meaningful reply.
    pub fn unit() -> Self {
        DecodedValue::Scalar(String::new())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DecodedValue::Scalar(text) => Some(text),
            _ => None,
        }
    }

    /// Interpret a scalar as a boolean (`1`/`0`, `true`/`false`).
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_str()?.trim() {
            "1" | "true" => Some(true),
            "0" | "false" => Some(false),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[DecodedValue]> {
        match self {
            DecodedValue::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, DecodedValue)]> {
        match self {
            DecodedValue::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a key in a mapping.
    pub fn get(&self, key: &str) -> Option<&DecodedValue> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Follow a path of mapping keys.
    pub fn pointer<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Option<&DecodedValue> {
        path.into_iter().try_fold(self, |node, key| node.get(key))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            DecodedValue::Scalar(text) => text.is_empty(),
            DecodedValue::Sequence(items) => items.is_empty(),
            DecodedValue::Mapping(entries) => entries.is_empty(),
        }
    }
}

impl From<serde_json::Value> for DecodedValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => DecodedValue::unit(),
            Value::Bool(b) => DecodedValue::Scalar(b.to_string()),
            Value::Number(n) => DecodedValue::Scalar(n.to_string()),
            Value::String(s) => DecodedValue::Scalar(s),
            Value::Array(items) => {
                DecodedValue::Sequence(items.into_iter().map(DecodedValue::from).collect())
            }
            Value::Object(map) => DecodedValue::Mapping(
                map.into_iter()
                    .map(|(k, v)| (k, DecodedValue::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for DecodedValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DecodedValue::Scalar(text) => serializer.serialize_str(text),
            DecodedValue::Sequence(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            DecodedValue::Mapping(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}
