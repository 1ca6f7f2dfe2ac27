//! Tokenizer for the surface query language.
//!
//! The grammar is small enough that a single word-charset covers
//! `FieldPath`, `Name`, and unquoted `Value` tokens; the parser narrows
//! what it accepts from context instead of the lexer emitting distinct
//! token kinds for each.

use crate::error::SelError;

/// What kind of thing a token's text represents, so the parser can tell
/// a bare word apart from a structural character without re-parsing text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenCategory {
    /// An identifier, dotted path, bare value, or quoted string.
    Word,
    /// One of `( ) [ ] , :`.
    Symbol,
    /// One of `!= !~ >= <= > < = ~`.
    Comparator,
}

#[derive(Debug, Clone)]
pub struct Token {
    pub text: String,
    pub quoted: bool,
    pub category: TokenCategory,
    /// Byte offset of the first character of this token in the source.
    pub offset: usize,
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '#' | '@' | '/' | '*')
}

fn quote_run(chars: &[(usize, char)], at: usize, quote: char, len: usize) -> bool {
    (0..len).all(|k| chars.get(at + k).map(|&(_, c)| c == quote).unwrap_or(false))
}

/// Human-readable 1-based (line, column) for a byte offset into `input`.
pub fn describe_position(input: &str, offset: usize) -> (usize, usize) {
    let consumed = &input[..offset.min(input.len())];
    let line = consumed.matches('\n').count() + 1;
    let column = match consumed.rfind('\n') {
        Some(idx) => consumed[idx + 1..].chars().count() + 1,
        None => consumed.chars().count() + 1,
    };
    (line, column)
}

pub fn lex(input: &str) -> Result<Vec<Token>, SelError> {
    let chars: Vec<(usize, char)> = input.char_indices().collect();
    let n = chars.len();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < n {
        let (offset, c) = chars[i];

        if c.is_whitespace() {
            i += 1;
            continue;
        }

        if c == '"' || c == '\'' {
            let triple = quote_run(&chars, i, c, 3);
            let qlen = if triple { 3 } else { 1 };
            let content_start = i + qlen;
            let mut j = content_start;
            let close = loop {
                if j >= n {
                    let (line, col) = describe_position(input, offset);
                    return Err(SelError::client_input(format!(
                        "unterminated string starting at line {line}, column {col}"
                    )));
                }
                if quote_run(&chars, j, c, qlen) {
                    break j;
                }
                j += 1;
            };
            let byte_start = chars.get(content_start).map(|&(b, _)| b).unwrap_or(input.len());
            let byte_end = chars.get(close).map(|&(b, _)| b).unwrap_or(input.len());
            tokens.push(Token {
                text: input[byte_start..byte_end].to_string(),
                quoted: true,
                category: TokenCategory::Word,
                offset,
            });
            i = close + qlen;
            continue;
        }

        if matches!(c, '(' | ')' | '[' | ']' | ',' | ':') {
            tokens.push(Token {
                text: c.to_string(),
                quoted: false,
                category: TokenCategory::Symbol,
                offset,
            });
            i += 1;
            continue;
        }

        if matches!(c, '!' | '>' | '<' | '=' | '~') {
            let next = chars.get(i + 1).map(|&(_, c)| c);
            let two: Option<&'static str> = match (c, next) {
                ('!', Some('=')) => Some("!="),
                ('!', Some('~')) => Some("!~"),
                ('>', Some('=')) => Some(">="),
                ('<', Some('=')) => Some("<="),
                _ => None,
            };
            if let Some(text) = two {
                tokens.push(Token {
                    text: text.to_string(),
                    quoted: false,
                    category: TokenCategory::Comparator,
                    offset,
                });
                i += 2;
                continue;
            }
            if c == '!' {
                let (line, col) = describe_position(input, offset);
                return Err(SelError::client_input(format!(
                    "invalid syntax at line {line}, column {col}: bare '!' is not a comparator"
                )));
            }
            tokens.push(Token {
                text: c.to_string(),
                quoted: false,
                category: TokenCategory::Comparator,
                offset,
            });
            i += 1;
            continue;
        }

        if is_word_char(c) {
            let mut j = i + 1;
            while j < n && is_word_char(chars[j].1) {
                j += 1;
            }
            let byte_end = chars.get(j).map(|&(b, _)| b).unwrap_or(input.len());
            tokens.push(Token {
                text: input[offset..byte_end].to_string(),
                quoted: false,
                category: TokenCategory::Word,
                offset,
            });
            i = j;
            continue;
        }

        let (line, col) = describe_position(input, offset);
        return Err(SelError::client_input(format!(
            "invalid syntax at line {line}, column {col}: unexpected character '{c}'"
        )));
    }

    Ok(tokens)
}
