//! Tokenizer for query statements

use super::QueryError;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Bare identifier or keyword, as written
    Ident(String),
    /// Backtick-escaped identifier; never a keyword
    Escaped(String),
    Str(String),
    Num(f64),
    Symbol(&'static str),
}

const SYMBOLS: &[&str] = &[
    "==", "!=", "<>", "<=", ">=", "=", "<", ">", "(", ")", "{", "}", "[", "]", ",", ".", ":", "*",
    ";",
];

/// Token plus its byte offset in the statement
pub type Spanned = (usize, Token);

pub fn tokenize(statement: &str) -> Result<Vec<Spanned>, QueryError> {
    let mut tokens = Vec::new();
    let bytes = statement.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        let start = i;

        if c.is_ascii_alphabetic() || c == '_' || c == '$' {
            while i < bytes.len() {
                let d = bytes[i] as char;
                if d.is_ascii_alphanumeric() || d == '_' || d == '$' {
                    i += 1;
                } else {
                    break;
                }
            }
            tokens.push((start, Token::Ident(statement[start..i].to_string())));
        } else if c == '#' {
            // `#primary` is a legal bare index name
            i += 1;
            while i < bytes.len() && (bytes[i] as char).is_ascii_alphanumeric() {
                i += 1;
            }
            tokens.push((start, Token::Ident(statement[start..i].to_string())));
        } else if c.is_ascii_digit()
            || (c == '-' && bytes.get(i + 1).map_or(false, |d| d.is_ascii_digit()))
        {
            i += 1;
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.' || bytes[i] == b'e' || bytes[i] == b'E') {
                i += 1;
            }
            let text = &statement[start..i];
            let number = text
                .parse::<f64>()
                .map_err(|_| QueryError::syntax(start, format!("bad number '{}'", text)))?;
            tokens.push((start, Token::Num(number)));
        } else if c == '`' {
            let end = statement[i + 1..]
                .find('`')
                .ok_or_else(|| QueryError::syntax(start, "unterminated identifier"))?;
            tokens.push((start, Token::Escaped(statement[i + 1..i + 1 + end].to_string())));
            i += end + 2;
        } else if c == '"' || c == '\'' {
            let (text, consumed) = string_literal(&statement[i..], c)
                .ok_or_else(|| QueryError::syntax(start, "unterminated string"))?;
            tokens.push((start, Token::Str(text)));
            i += consumed;
        } else {
            let rest = &statement[i..];
            let symbol = SYMBOLS.iter().find(|s| rest.starts_with(**s)).ok_or_else(|| {
                let found = rest.chars().next().unwrap_or(c);
                QueryError::syntax(start, format!("unexpected character '{}'", found))
            })?;
            tokens.push((start, Token::Symbol(*symbol)));
            i += symbol.len();
        }
    }
    Ok(tokens)
}

/// Parse a quoted literal at the start of `input`; returns the text and the
/// number of bytes consumed including quotes
fn string_literal(input: &str, quote: char) -> Option<(String, usize)> {
    let mut text = String::new();
    let mut chars = input.char_indices().skip(1);
    while let Some((idx, c)) = chars.next() {
        if c == '\\' {
            let (_, escaped) = chars.next()?;
            text.push(match escaped {
                'n' => '\n',
                't' => '\t',
                other => other,
            });
        } else if c == quote {
            return Some((text, idx + c.len_utf8()));
        } else {
            text.push(c);
        }
    }
    None
}
