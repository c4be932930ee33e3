//! Recursive-descent parser for the nested-brace reply grammar.
//!
//! A payload is a sequence of records `{key value}`. The value is
//!
//! - a scalar when it sits on the key's brace level: `{state idle}`,
//! - a sequence when it is one braced group of plain words: `{buttons {1 2 3}}`,
//! - a nested mapping when it is one or more keyed records:
//!   `{line {{id 1} {calls 0}}}` or `{line {id 1} {calls 0}}`.
//!
//! Keys listed in [`crate::keys`] bypass these rules. Anything else is a
//! [`DecodeError::Parse`] carrying the offending fragment.

use tracing::trace;

use crate::error::{DecodeError, Result};
use crate::keys::{self, KeyShape, FAILOVER_FIELDS, FAILOVER_TIMESTAMP_KEY};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::split::{fragment_at, split_records};
use crate::value::DecodedValue;

/// Nesting limit for the recursive descent. The top-level splitter has none.
pub const MAX_NESTING: usize = 256;

/// Parse a payload of records into an ordered mapping.
pub fn parse(payload: &str) -> Result<DecodedValue> {
    let mut mapping = MappingBuilder::default();
    for record in split_records(payload)? {
        if !record.braced {
            return Err(DecodeError::parse(
                "bare word outside a record",
                record.text,
            ));
        }
        let nodes = build_tree(record.text)?;
        let children = match nodes.as_slice() {
            [Node::Group { children, .. }] => children,
            _ => return Err(DecodeError::parse("expected one record", record.text)),
        };
        let (key, value) = record_entry(children, record.text, record.text)?;
        trace!(key = %key, "parsed record");
        mapping.insert(key, value, record.text)?;
    }
    Ok(mapping.finish())
}

/// Parse a payload whose every record value must be a scalar.
pub fn parse_flat(payload: &str) -> Result<DecodedValue> {
    let value = parse(payload)?;
    if let DecodedValue::Mapping(entries) = &value {
        if let Some((key, _)) = entries
            .iter()
            .find(|(_, v)| !matches!(v, DecodedValue::Scalar(_)))
        {
            return Err(DecodeError::parse(
                format!("value of '{key}' is not a scalar"),
                fragment_at(payload, 0),
            ));
        }
    }
    Ok(value)
}

/// Syntax tree node with its byte span in the record text.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Node {
    Word {
        text: String,
        start: usize,
        end: usize,
    },
    Group {
        children: Vec<Node>,
        start: usize,
        end: usize,
    },
}

impl Node {
    fn start(&self) -> usize {
        match self {
            Node::Word { start, .. } | Node::Group { start, .. } => *start,
        }
    }

    fn end(&self) -> usize {
        match self {
            Node::Word { end, .. } | Node::Group { end, .. } => *end,
        }
    }

    fn word(&self) -> Option<&str> {
        match self {
            Node::Word { text, .. } => Some(text),
            Node::Group { .. } => None,
        }
    }

    /// A group whose first child is a word, i.e. a `{key ...}` record.
    fn is_keyed_group(&self) -> bool {
        matches!(
            self,
            Node::Group { children, .. } if matches!(children.first(), Some(Node::Word { .. }))
        )
    }
}

fn build_tree(text: &str) -> Result<Vec<Node>> {
    let tokens = tokenize(text);
    let mut parser = TreeParser {
        text,
        tokens: &tokens,
        pos: 0,
    };
    parser.sequence(None, 0)
}

struct TreeParser<'a> {
    text: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl TreeParser<'_> {
    /// Parse nodes until the matching close brace (or end of input when
    /// `open` is `None`). Returns the children; the caller records the span.
    fn sequence(&mut self, open: Option<usize>, depth: usize) -> Result<Vec<Node>> {
        if depth > MAX_NESTING {
            return Err(DecodeError::parse(
                format!("nesting deeper than {MAX_NESTING}"),
                fragment_at(self.text, open.unwrap_or(0)),
            ));
        }

        let mut nodes = Vec::new();
        loop {
            let Some(token) = self.tokens.get(self.pos) else {
                return match open {
                    Some(offset) => Err(DecodeError::Unbalanced {
                        offset,
                        fragment: fragment_at(self.text, offset),
                    }),
                    None => Ok(nodes),
                };
            };
            self.pos += 1;

            match &token.kind {
                TokenKind::Word(text) => nodes.push(Node::Word {
                    text: text.clone(),
                    start: token.start,
                    end: token.end,
                }),
                TokenKind::Open => {
                    let children = self.sequence(Some(token.start), depth + 1)?;
                    let end = self.tokens[self.pos - 1].end;
                    nodes.push(Node::Group {
                        children,
                        start: token.start,
                        end,
                    });
                }
                TokenKind::Close => {
                    return match open {
                        Some(_) => Ok(nodes),
                        None => Err(DecodeError::Unbalanced {
                            offset: token.start,
                            fragment: fragment_at(self.text, token.start),
                        }),
                    };
                }
            }
        }
    }
}

/// Turn the children of one record group into `(key, value)`.
///
/// Node spans index into `source`, the whole top-level record; `record` is
/// the text of this record alone and is used for error fragments.
fn record_entry(
    children: &[Node],
    source: &str,
    record: &str,
) -> Result<(String, DecodedValue)> {
    let (key, values) = match children.split_first() {
        Some((Node::Word { text, .. }, rest)) => (text.clone(), rest),
        _ => return Err(DecodeError::parse("record has no key", record)),
    };

    let value = match keys::shape_for(&key) {
        Some(KeyShape::BraceList) => brace_list(values, source, record)?,
        Some(KeyShape::FailoverTimestamp) => failover_entry(values, record)?,
        Some(KeyShape::JsonDocument) => embedded_json(values, source)?,
        None => generic_value(values, source)?,
    };
    Ok((key, value))
}

fn generic_value(values: &[Node], source: &str) -> Result<DecodedValue> {
    if values.is_empty() {
        return Ok(DecodedValue::unit());
    }
    if let Some(words) = all_words(values) {
        return Ok(DecodedValue::Scalar(words.join(" ")));
    }

    if let [Node::Group { children, .. }] = values {
        if children.is_empty() {
            return Ok(DecodedValue::Sequence(Vec::new()));
        }
        if let Some(words) = all_words(children) {
            return Ok(DecodedValue::Sequence(
                words.into_iter().map(DecodedValue::scalar).collect(),
            ));
        }
        if children.iter().all(Node::is_keyed_group) {
            return nested_mapping(children, source);
        }
    } else if values.iter().all(Node::is_keyed_group) {
        return nested_mapping(values, source);
    }

    Err(DecodeError::parse(
        "mixed words and nested records",
        span_text(source, values),
    ))
}

fn nested_mapping(groups: &[Node], source: &str) -> Result<DecodedValue> {
    let mut mapping = MappingBuilder::default();
    for group in groups {
        if let Node::Group { children, .. } = group {
            let record = span_text(source, std::slice::from_ref(group));
            let (key, value) = record_entry(children, source, record)?;
            mapping.insert(key, value, record)?;
        }
    }
    Ok(mapping.finish())
}

fn brace_list(values: &[Node], source: &str, record: &str) -> Result<DecodedValue> {
    let items = match values {
        [] => return Ok(DecodedValue::Sequence(Vec::new())),
        [Node::Group { children, .. }] => children,
        _ => return Err(DecodeError::parse("expected one braced list", record)),
    };

    if let Some(words) = all_words(items) {
        return Ok(DecodedValue::Sequence(
            words.into_iter().map(DecodedValue::scalar).collect(),
        ));
    }

    items
        .iter()
        .map(|item| match item {
            Node::Group { children, .. } => all_words(children)
                .map(|words| DecodedValue::Scalar(words.join(" ")))
                .ok_or_else(|| {
                    DecodeError::parse(
                        "list element is nested",
                        span_text(source, std::slice::from_ref(item)),
                    )
                }),
            Node::Word { text, .. } => Err(DecodeError::parse(
                "list element is not braced",
                text.clone(),
            )),
        })
        .collect::<Result<Vec<_>>>()
        .map(DecodedValue::Sequence)
}

fn failover_entry(values: &[Node], record: &str) -> Result<DecodedValue> {
    let words = match values {
        [Node::Group { children, .. }] => all_words(children),
        _ => all_words(values),
    }
    .ok_or_else(|| DecodeError::parse("failover entry is nested", record))?;

    if words.len() != FAILOVER_FIELDS.len() {
        return Err(DecodeError::Arity {
            expected: FAILOVER_FIELDS.len(),
            found: words.len(),
            record: record.to_string(),
        });
    }

    Ok(DecodedValue::Mapping(
        FAILOVER_FIELDS
            .iter()
            .zip(words)
            .map(|(field, word)| (field.to_string(), DecodedValue::scalar(word)))
            .collect(),
    ))
}

fn embedded_json(values: &[Node], source: &str) -> Result<DecodedValue> {
    if values.is_empty() {
        return Ok(DecodedValue::unit());
    }
    let raw = span_text(source, values);
    let json: serde_json::Value = serde_json::from_str(raw).map_err(|err| {
        DecodeError::parse(format!("invalid embedded JSON: {err}"), raw)
    })?;
    Ok(DecodedValue::from(json))
}

fn all_words(nodes: &[Node]) -> Option<Vec<&str>> {
    nodes.iter().map(Node::word).collect()
}

/// Source text covered by a run of sibling nodes.
fn span_text<'s>(source: &'s str, nodes: &[Node]) -> &'s str {
    match (nodes.first(), nodes.last()) {
        (Some(first), Some(last)) => source.get(first.start()..last.end()).unwrap_or(source),
        _ => source,
    }
}

/// Ordered mapping with unique keys; failover entries accumulate.
#[derive(Default)]
struct MappingBuilder {
    entries: Vec<(String, DecodedValue)>,
}

impl MappingBuilder {
    fn insert(&mut self, key: String, value: DecodedValue, fragment: &str) -> Result<()> {
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, DecodedValue::Sequence(items))) if key == FAILOVER_TIMESTAMP_KEY => {
                items.push(value);
                Ok(())
            }
            Some(_) => Err(DecodeError::DuplicateKey {
                key,
                fragment: fragment_at(fragment, 0),
            }),
            None if key == FAILOVER_TIMESTAMP_KEY => {
                self.entries.push((key, DecodedValue::Sequence(vec![value])));
                Ok(())
            }
            None => {
                self.entries.push((key, value));
                Ok(())
            }
        }
    }

    fn finish(self) -> DecodedValue {
        DecodedValue::Mapping(self.entries)
    }
}
