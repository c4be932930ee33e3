//! Flat lists of fixed-arity records: `{0x1 1 connected} {0x2 1 dialtone}`.
//!
//! A simpler sibling of [`crate::grammar`]. Each record is one brace pair
//! holding exactly N whitespace-separated positional fields and no nesting.

use crate::error::{DecodeError, Result};
use crate::lexer::{tokenize, TokenKind};
use crate::split::split_records;
use crate::value::DecodedValue;

/// Split `payload` into records of exactly `arity` fields each.
pub fn parse_record_list(payload: &str, arity: usize) -> Result<Vec<Vec<String>>> {
    split_records(payload)?
        .into_iter()
        .map(|record| {
            if !record.braced {
                return Err(DecodeError::parse("expected a braced record", record.text));
            }

            let fields = tokenize(record.inner())
                .into_iter()
                .map(|token| match token.kind {
                    TokenKind::Word(word) => Ok(word),
                    TokenKind::Open | TokenKind::Close => {
                        Err(DecodeError::parse("nested braces in flat record", record.text))
                    }
                })
                .collect::<Result<Vec<_>>>()?;

            if fields.len() != arity {
                return Err(DecodeError::Arity {
                    expected: arity,
                    found: fields.len(),
                    record: record.text.to_string(),
                });
            }
            Ok(fields)
        })
        .collect()
}

/// Parse a record list and name each positional field.
///
/// The result is a sequence of mappings, one per record, with keys in
/// `fields` order.
pub fn parse_named_records(payload: &str, fields: &[&str]) -> Result<DecodedValue> {
    let records = parse_record_list(payload, fields.len())?;
    Ok(DecodedValue::Sequence(
        records
            .into_iter()
            .map(|values| {
                DecodedValue::Mapping(
                    fields
                        .iter()
                        .zip(values)
                        .map(|(name, value)| (name.to_string(), DecodedValue::Scalar(value)))
                        .collect(),
                )
            })
            .collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_records_of_three_fields() {
        let records = parse_record_list("{a b c} {d e f}", 3).unwrap();
        assert_eq!(records, vec![vec!["a", "b", "c"], vec!["d", "e", "f"]]);
    }

    #[test]
    fn short_record_is_arity_error() {
        let err = parse_record_list("{a b}", 3).unwrap_err();
        match err {
            DecodeError::Arity {
                expected,
                found,
                record,
            } => {
                assert_eq!((expected, found), (3, 2));
                assert_eq!(record, "{a b}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn one_bad_record_fails_the_list() {
        assert!(parse_record_list("{a b c} {d e f g}", 3).is_err());
    }

    #[test]
    fn nested_braces_rejected() {
        let err = parse_record_list("{a {b} c}", 3).unwrap_err();
        assert!(matches!(err, DecodeError::Parse { .. }));
    }

    #[test]
    fn bare_word_rejected() {
        let err = parse_record_list("{a b c} d", 3).unwrap_err();
        assert!(matches!(err, DecodeError::Parse { ref fragment, .. } if fragment == "d"));
    }

    #[test]
    fn empty_list() {
        assert!(parse_record_list("", 3).unwrap().is_empty());
        assert_eq!(
            parse_named_records("  ", &["x"]).unwrap(),
            DecodedValue::Sequence(vec![])
        );
    }

    #[test]
    fn named_fields_keep_order() {
        let value = parse_named_records(
            "{0x1 1 connected} {0x2 1 dialtone}",
            &["call_ref", "line_ref", "state"],
        )
        .unwrap();
        let records = value.as_sequence().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(
            records[1].as_mapping().unwrap(),
            &[
                ("call_ref".to_string(), DecodedValue::scalar("0x2")),
                ("line_ref".to_string(), DecodedValue::scalar("1")),
                ("state".to_string(), DecodedValue::scalar("dialtone")),
            ][..]
        );
    }
}
