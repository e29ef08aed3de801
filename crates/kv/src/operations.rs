//! Mutating operations accepted by the service.
//!
//! An `Operation` is a recordable request: applying it to a [`Service`]
//! changes at most one name and appends exactly one history node.

use serde::{Deserialize, Serialize};
use tally_common::{Result, Value};
use tally_storage::StorageBackend;

use crate::service::Service;
use crate::transition::Transition;

/// Operations that can be applied to the service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    /// Bind a name to a value
    Set {
        /// The name to bind
        name: String,
        /// The value to bind it to
        value: Value,
    },
    /// Remove a name's binding
    Unset {
        /// The name to unbind
        name: String,
    },
}

impl Operation {
    /// The name this operation touches.
    pub fn name(&self) -> &str {
        match self {
            Operation::Set { name, .. } | Operation::Unset { name } => name,
        }
    }

    /// Apply this operation to a service
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use tally_kv::{Operation, Service};
    /// use tally_storage::MemStorage;
    ///
    /// let mut service = Service::new(Arc::new(MemStorage::new()));
    /// let op = Operation::Set { name: "foo".into(), value: 3 };
    /// let transition = op.apply(&mut service).unwrap();
    /// assert_eq!(transition.to_string(), "foo = 3");
    /// ```
    pub fn apply<S: StorageBackend>(&self, service: &mut Service<S>) -> Result<Transition> {
        match self {
            Operation::Set { name, value } => service.set(name, *value),
            Operation::Unset { name } => service.unset(name),
        }
    }
}
