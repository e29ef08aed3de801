//! Transition records produced by the mutator.

use std::fmt;
use tally_common::Value;

/// Immutable record of one name moving from `old` to `new`.
///
/// `None` on either side means the name was (or became) unbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub name: String,
    pub old: Option<Value>,
    pub new: Option<Value>,
}

impl Transition {
    pub fn new(name: impl Into<String>, old: Option<Value>, new: Option<Value>) -> Self {
        Self {
            name: name.into(),
            old,
            new,
        }
    }

    /// A transition whose old and new values are equal.
    ///
    /// No-op transitions still occupy a history slot but never touch the
    /// counter index.
    pub fn is_noop(&self) -> bool {
        self.old == self.new
    }
}

/// Renders as `name = value` or `name = None`, the form clients expect for
/// every applied change.
impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.new {
            Some(value) => write!(f, "{} = {}", self.name, value),
            None => write!(f, "{} = None", self.name),
        }
    }
}

/// Result of an undo or redo request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A transition was re-applied against the store.
    Applied(Transition),
    /// There was nothing to step over in the requested direction.
    NoHistory,
}

impl Outcome {
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            Outcome::Applied(t) => Some(t),
            Outcome::NoHistory => None,
        }
    }
}
