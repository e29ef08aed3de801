//! Reply rendering
//!
//! Every request produces exactly one reply line. The text forms are:
//!
//! | Reply | Line |
//! |---|---|
//! | applied transition | `name = 10` / `name = None` |
//! | looked-up value | `10` / `None` |
//! | count | `2` |
//! | nothing to undo/redo | `NO COMMANDS` |
//! | store wiped | `CLEANED` |
//! | failure | `ERR message` |

use std::fmt;

use tally_common::{Count, Value};
use tally_kv::{Outcome, Transition};

use crate::error::ProtocolError;

/// One reply line, without its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A set, unset, undo or redo that took effect.
    Transition(Transition),
    /// Result of GET.
    Value(Option<Value>),
    /// Result of NUMEQUALTO.
    Count(Count),
    /// UNDO or REDO with nothing to move over.
    NoCommands,
    /// Result of END.
    Cleaned,
    /// A request that could not be served.
    Error(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Transition(t) => write!(f, "{t}"),
            Reply::Value(Some(v)) => write!(f, "{v}"),
            Reply::Value(None) => f.write_str("None"),
            Reply::Count(n) => write!(f, "{n}"),
            Reply::NoCommands => f.write_str("NO COMMANDS"),
            Reply::Cleaned => f.write_str("CLEANED"),
            // Keep the reply on one line whatever the message holds
            Reply::Error(msg) => write!(f, "ERR {}", msg.replace(['\r', '\n'], " ")),
        }
    }
}

impl From<Transition> for Reply {
    fn from(t: Transition) -> Self {
        Reply::Transition(t)
    }
}

impl From<Outcome> for Reply {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Applied(t) => Reply::Transition(t),
            Outcome::NoHistory => Reply::NoCommands,
        }
    }
}

impl From<tally_common::Error> for Reply {
    fn from(err: tally_common::Error) -> Self {
        Reply::Error(err.to_string())
    }
}

impl From<ProtocolError> for Reply {
    fn from(err: ProtocolError) -> Self {
        Reply::Error(err.to_string())
    }
}
