//! Character scanner for the brace grammar.
//!
//! Produces open-brace, close-brace and word tokens with byte offsets into
//! the scanned text. A backslash escapes the following character, so `\{`
//! is part of a word and does not count towards brace balance.

/// Token kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Open,
    Close,
    Word(String),
}

/// A token and the byte span `[start, end)` it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

/// Scan `text` into tokens. Never fails; balance is checked by the parser.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = text.char_indices().peekable();

    while let Some(&(start, ch)) = chars.peek() {
        match ch {
            '{' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Open,
                    start,
                    end: start + 1,
                });
            }
            '}' => {
                chars.next();
                tokens.push(Token {
                    kind: TokenKind::Close,
                    start,
                    end: start + 1,
                });
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut word = String::new();
                let mut end = start;
                while let Some(&(idx, c)) = chars.peek() {
                    if c == '{' || c == '}' || c.is_whitespace() {
                        break;
                    }
                    chars.next();
                    end = idx + c.len_utf8();
                    if c == '\\' {
                        if let Some((esc_idx, escaped)) = chars.next() {
                            word.push(escaped);
                            end = esc_idx + escaped.len_utf8();
                            continue;
                        }
                    }
                    word.push(c);
                }
                tokens.push(Token {
                    kind: TokenKind::Word(word),
                    start,
                    end,
                });
            }
        }
    }

    tokens
}
