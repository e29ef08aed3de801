//! Request line tokenizer.
//!
//! Splits a request line into arguments. Arguments are separated by runs of
//! spaces or tabs; a single- or double-quoted run keeps its whitespace and
//! may be empty. Inside quotes a backslash escapes the next character.
//!
//! ```
//! use tally_protocol::tokenize::tokenize;
//!
//! assert_eq!(tokenize("SET total 5").unwrap(), ["SET", "total", "5"]);
//! assert_eq!(tokenize("GET 'two words'").unwrap(), ["GET", "two words"]);
//! ```

use std::borrow::Cow;

use crate::{ProtocolError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between arguments.
    Gap,
    /// Inside an unquoted argument.
    Bare,
    /// Inside a quoted run opened by the given quote character.
    Quoted(char),
}

/// Split `line` into arguments.
///
/// # Errors
///
/// - [`ProtocolError::UnterminatedQuote`] if a quote is never closed
/// - [`ProtocolError::EmptyCommand`] if the line holds no arguments
pub fn tokenize(line: &str) -> Result<Vec<String>> {
    let mut tokens = Vec::new();
    let mut token = String::new();
    let mut state = State::Gap;
    let mut chars = line.chars();

    while let Some(ch) = chars.next() {
        state = match (state, ch) {
            (State::Gap, ' ' | '\t') => State::Gap,
            (State::Bare, ' ' | '\t') => {
                tokens.push(std::mem::take(&mut token));
                State::Gap
            }
            (State::Gap | State::Bare, '"' | '\'') => State::Quoted(ch),
            (State::Gap | State::Bare, _) => {
                token.push(ch);
                State::Bare
            }
            (State::Quoted(q), _) if ch == q => {
                // A closed quote always yields an argument, even an empty one
                tokens.push(std::mem::take(&mut token));
                State::Gap
            }
            (State::Quoted(q), '\\') => {
                token.push(unescape(chars.next()));
                State::Quoted(q)
            }
            (State::Quoted(q), _) => {
                token.push(ch);
                State::Quoted(q)
            }
        };
    }

    match state {
        State::Quoted(_) => return Err(ProtocolError::UnterminatedQuote),
        State::Bare => tokens.push(token),
        State::Gap => {}
    }

    if tokens.is_empty() {
        return Err(ProtocolError::EmptyCommand);
    }
    Ok(tokens)
}

/// Render `arg` so that [`tokenize`] reads it back as one argument.
pub fn quote(arg: &str) -> Cow<'_, str> {
    let plain = !arg.is_empty()
        && !arg
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '"' | '\'' | '\\'));
    if plain {
        return Cow::Borrowed(arg);
    }

    let mut out = String::with_capacity(arg.len() + 2);
    out.push('"');
    for c in arg.chars() {
        match c {
            '"' | '\\' => {
                out.push('\\');
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out.push('"');
    Cow::Owned(out)
}

fn unescape(ch: Option<char>) -> char {
    match ch {
        Some('n') => '\n',
        Some('t') => '\t',
        Some('r') => '\r',
        Some(other) => other,
        None => '\\',
    }
}
