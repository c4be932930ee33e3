//! Top-level record splitter.
//!
//! Walks the payload once with an explicit brace-balance counter. A braced
//! record ends exactly when the balance returns to zero; text outside any
//! brace is split into bare words. Nesting depth is unbounded and balanced
//! literal braces inside values are carried through untouched.

use crate::error::{DecodeError, Result};

const FRAGMENT_CONTEXT: usize = 40;

/// One top-level element of a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawRecord<'a> {
    /// Source text of the element, including its outer braces.
    pub text: &'a str,
    /// Byte offset of `text` within the payload.
    pub start: usize,
    /// Byte offset one past the end of `text`.
    pub end: usize,
    /// False for a bare word outside any braces.
    pub braced: bool,
}

impl<'a> RawRecord<'a> {
    /// Text between the outer braces (the whole text for bare words).
    pub fn inner(&self) -> &'a str {
        if self.braced {
            &self.text[1..self.text.len() - 1]
        } else {
            self.text
        }
    }
}

/// Split `payload` into its top-level elements.
///
/// Only whitespace separates elements, so the separators plus the element
/// texts reproduce the input. Unbalanced input is a
/// [`DecodeError::Unbalanced`], never a panic.
pub fn split_records(payload: &str) -> Result<Vec<RawRecord<'_>>> {
    let bytes = payload.as_bytes();
    let mut records = Vec::new();
    let mut depth = 0usize;
    let mut start = 0usize;
    let mut bare_start: Option<usize> = None;
    let mut i = 0usize;

    while i < bytes.len() {
        let b = bytes[i];
        if b == b'\\' {
            if depth == 0 && bare_start.is_none() {
                bare_start = Some(i);
            }
            // Skip the escaped character (whole UTF-8 sequence).
            i += 1;
            if i < bytes.len() {
                i += utf8_width(bytes[i]);
            }
            continue;
        }

        if depth == 0 {
            match b {
                b'{' => {
                    if let Some(bs) = bare_start.take() {
                        records.push(bare(payload, bs, i));
                    }
                    depth = 1;
                    start = i;
                }
                b'}' => {
                    return Err(unbalanced(payload, i));
                }
                _ if b.is_ascii_whitespace() => {
                    if let Some(bs) = bare_start.take() {
                        records.push(bare(payload, bs, i));
                    }
                }
                _ => {
                    if bare_start.is_none() {
                        bare_start = Some(i);
                    }
                }
            }
        } else {
            match b {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        records.push(RawRecord {
                            text: &payload[start..=i],
                            start,
                            end: i + 1,
                            braced: true,
                        });
                    }
                }
                _ => {}
            }
        }
        i += 1;
    }

    if depth > 0 {
        return Err(unbalanced(payload, start));
    }
    if let Some(bs) = bare_start {
        records.push(bare(payload, bs, bytes.len()));
    }

    Ok(records)
}

fn bare(payload: &str, start: usize, end: usize) -> RawRecord<'_> {
    RawRecord {
        text: &payload[start..end],
        start,
        end,
        braced: false,
    }
}

fn unbalanced(payload: &str, offset: usize) -> DecodeError {
    DecodeError::Unbalanced {
        offset,
        fragment: fragment_at(payload, offset),
    }
}

/// Up to a few dozen characters of `text` starting at `offset`.
pub(crate) fn fragment_at(text: &str, offset: usize) -> String {
    text.get(offset..)
        .unwrap_or_default()
        .chars()
        .take(FRAGMENT_CONTEXT)
        .collect()
}

fn utf8_width(first: u8) -> usize {
    match first {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}
