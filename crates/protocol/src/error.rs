//! Protocol error types
//!
//! Everything that can go wrong between reading bytes off a connection and
//! producing a [`Command`](crate::Command). All variants except `Io` describe
//! a single bad request line and are answered with an `ERR` reply.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolError {
    /// The line held only whitespace.
    #[error("Empty command")]
    EmptyCommand,

    /// The first argument names no known command.
    #[error("Unknown command: {command}")]
    UnknownCommand {
        /// Upper-cased command name as received
        command: String,
    },

    /// Argument count does not fit the command.
    ///
    /// Both counts include the command name itself.
    #[error("Wrong number of arguments for '{command}': expected {expected}, got {got}")]
    WrongArity {
        command: &'static str,
        expected: usize,
        got: usize,
    },

    /// A value argument is not a 64-bit signed integer.
    #[error("Invalid integer: {value}")]
    InvalidInteger {
        /// The offending argument
        value: String,
    },

    /// A quoted argument was never closed.
    #[error("Unterminated quote")]
    UnterminatedQuote,

    /// The line exceeds the configured maximum.
    ///
    /// The rest of the line is discarded up to its terminator.
    #[error("Line too long: {len} bytes (max: {max})")]
    LineTooLong { len: usize, max: usize },

    /// Reading from or writing to the socket failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The line is not valid UTF-8.
    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_error_messages() {
        let cases = [
            (ProtocolError::EmptyCommand, "Empty command"),
            (
                ProtocolError::UnknownCommand {
                    command: "INCR".to_string(),
                },
                "Unknown command: INCR",
            ),
            (
                ProtocolError::WrongArity {
                    command: "NUMEQUALTO",
                    expected: 2,
                    got: 1,
                },
                "Wrong number of arguments for 'NUMEQUALTO': expected 2, got 1",
            ),
            (
                ProtocolError::InvalidInteger {
                    value: "ten".to_string(),
                },
                "Invalid integer: ten",
            ),
            (ProtocolError::UnterminatedQuote, "Unterminated quote"),
            (
                ProtocolError::LineTooLong { len: 9000, max: 8192 },
                "Line too long: 9000 bytes (max: 8192)",
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.to_string(), expected);
        }
    }

    #[test]
    fn test_source_errors_convert() {
        let err = ProtocolError::from(std::io::Error::from(std::io::ErrorKind::ConnectionReset));
        assert!(matches!(err, ProtocolError::Io(_)));

        let bad = [b'G', 0xc3];
        let err = ProtocolError::from(std::str::from_utf8(&bad).unwrap_err());
        assert!(matches!(err, ProtocolError::Utf8(_)));
        assert!(err.to_string().starts_with("UTF-8 error"));
    }

    #[test]
    fn test_errors_cross_task_boundaries() {
        fn assert_send_sync<T: Send + Sync + 'static>() {}
        assert_send_sync::<ProtocolError>();
    }
}
