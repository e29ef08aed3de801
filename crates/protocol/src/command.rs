//! Command parsing
//!
//! Converts a tokenized request line into a strongly-typed [`Command`].
//! Command names are matched case-insensitively; names and values are
//! taken verbatim.

use std::fmt;

use tally_common::Value;

use crate::error::{ProtocolError, Result};
use crate::tokenize::{quote, tokenize};

/// Commands understood by the server
///
/// # Supported Commands
///
/// - **SET**: Bind a name to an integer value
/// - **GET**: Read the value bound to a name
/// - **UNSET**: Remove a name's binding
/// - **NUMEQUALTO**: Count the names bound to a value
/// - **UNDO** / **REDO**: Walk the change history
/// - **END**: Wipe the store and start a fresh history
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// SET name value
    Set { name: String, value: Value },

    /// GET name
    Get { name: String },

    /// UNSET name
    Unset { name: String },

    /// NUMEQUALTO value
    NumEqualTo { value: Value },

    /// UNDO
    Undo,

    /// REDO
    Redo,

    /// END
    End,
}

impl Command {
    /// Parse a request line (without its terminator).
    ///
    /// # Examples
    ///
    /// ```
    /// use tally_protocol::Command;
    ///
    /// let command = Command::parse("set total 10").unwrap();
    /// assert_eq!(command, Command::Set { name: "total".into(), value: 10 });
    /// ```
    pub fn parse(line: &str) -> Result<Self> {
        Self::from_tokens(tokenize(line)?)
    }

    /// Build a command from already split arguments, the first being the
    /// command name.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::EmptyCommand` - No tokens
    /// - `ProtocolError::UnknownCommand` - Command name is not recognized
    /// - `ProtocolError::WrongArity` - Wrong number of arguments
    /// - `ProtocolError::InvalidInteger` - Value argument is not an `i64`
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        let Some(first) = tokens.first() else {
            return Err(ProtocolError::EmptyCommand);
        };
        let name = first.to_uppercase();

        match name.as_str() {
            "SET" => {
                let [_, name, value] = expect_args::<3>("SET", tokens)?;
                Ok(Command::Set {
                    name,
                    value: parse_value(value)?,
                })
            }
            "GET" => {
                let [_, name] = expect_args::<2>("GET", tokens)?;
                Ok(Command::Get { name })
            }
            "UNSET" => {
                let [_, name] = expect_args::<2>("UNSET", tokens)?;
                Ok(Command::Unset { name })
            }
            "NUMEQUALTO" => {
                let [_, value] = expect_args::<2>("NUMEQUALTO", tokens)?;
                Ok(Command::NumEqualTo {
                    value: parse_value(value)?,
                })
            }
            "UNDO" => expect_args::<1>("UNDO", tokens).map(|_| Command::Undo),
            "REDO" => expect_args::<1>("REDO", tokens).map(|_| Command::Redo),
            "END" => expect_args::<1>("END", tokens).map(|_| Command::End),
            _ => Err(ProtocolError::UnknownCommand { command: name }),
        }
    }

    /// Canonical command name.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Unset { .. } => "UNSET",
            Command::NumEqualTo { .. } => "NUMEQUALTO",
            Command::Undo => "UNDO",
            Command::Redo => "REDO",
            Command::End => "END",
        }
    }

    /// Whether the command changes the store.
    pub fn is_write(&self) -> bool {
        !matches!(self, Command::Get { .. } | Command::NumEqualTo { .. })
    }
}

/// Renders the command as a request line that parses back to itself.
impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Set { name, value } => write!(f, "SET {} {value}", quote(name)),
            Command::Get { name } | Command::Unset { name } => {
                write!(f, "{} {}", self.name(), quote(name))
            }
            Command::NumEqualTo { value } => write!(f, "NUMEQUALTO {value}"),
            Command::Undo | Command::Redo | Command::End => f.write_str(self.name()),
        }
    }
}

fn expect_args<const N: usize>(command: &'static str, tokens: Vec<String>) -> Result<[String; N]> {
    let got = tokens.len();
    tokens.try_into().map_err(|_| ProtocolError::WrongArity {
        command,
        expected: N,
        got,
    })
}

fn parse_value(token: String) -> Result<Value> {
    token
        .parse()
        .map_err(|_| ProtocolError::InvalidInteger { value: token })
}
