//! The key-value service facade.
//!
//! `Service` composes the [`Mutator`] and the [`History`] into the operation
//! set clients see: set, unset, get, count-equal-to, undo, redo and reset.
//!
//! A `Service` owns one history timeline and must not be driven from two
//! places at once; callers that share it wrap it in a single mutex.

use std::sync::Arc;

use tally_common::{Count, Result, Value};
use tally_storage::StorageBackend;

use crate::history::History;
use crate::mutator::{Mutator, RetryPolicy};
use crate::tables::ReadOnlyTables;
use crate::transition::{Outcome, Transition};

/// Value-counting key-value store with undo/redo.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use tally_kv::{Outcome, Service};
/// use tally_storage::MemStorage;
///
/// let mut service = Service::new(Arc::new(MemStorage::new()));
/// service.set("a", 10).unwrap();
/// service.set("b", 10).unwrap();
/// assert_eq!(service.count_equal_to(10).unwrap(), 2);
///
/// let outcome = service.undo().unwrap();
/// assert!(matches!(outcome, Outcome::Applied(_)));
/// assert_eq!(service.get("b").unwrap(), None);
/// assert_eq!(service.count_equal_to(10).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct Service<S> {
    mutator: Mutator<S>,
    history: History,
}

impl<S: StorageBackend> Service<S> {
    /// Create a service with the default retry policy.
    pub fn new(storage: Arc<S>) -> Self {
        Self::with_policy(storage, RetryPolicy::default())
    }

    pub fn with_policy(storage: Arc<S>, policy: RetryPolicy) -> Self {
        Self {
            mutator: Mutator::new(storage, policy),
            history: History::new(),
        }
    }

    /// Bind `name` to `value` and record the change.
    ///
    /// Setting a name to the value it already holds is recorded too, but
    /// leaves the counter index untouched.
    pub fn set(&mut self, name: &str, value: Value) -> Result<Transition> {
        self.apply(name, Some(value))
    }

    /// Unbind `name` and record the change.
    ///
    /// Unsetting an absent name is recorded as a no-op transition.
    pub fn unset(&mut self, name: &str) -> Result<Transition> {
        self.apply(name, None)
    }

    fn apply(&mut self, name: &str, value: Option<Value>) -> Result<Transition> {
        let transition = self.mutator.apply_value(name, value)?;
        self.history.record(transition.clone());
        Ok(transition)
    }

    /// Current value of `name`, `None` if unbound.
    pub fn get(&self, name: &str) -> Result<Option<Value>> {
        ReadOnlyTables::new(self.mutator.storage().as_ref()).entry(name)
    }

    /// How many names are currently bound to `value`.
    pub fn count_equal_to(&self, value: Value) -> Result<Count> {
        ReadOnlyTables::new(self.mutator.storage().as_ref()).count(value)
    }

    /// Revert the most recent change still in effect.
    pub fn undo(&mut self) -> Result<Outcome> {
        let mutator = &self.mutator;
        let outcome = self
            .history
            .undo(|name, value| mutator.apply_value(name, value))?;
        if let Outcome::Applied(t) = &outcome {
            tracing::debug!(name = %t.name, restored = ?t.new, "undo");
        }
        Ok(outcome)
    }

    /// Re-apply the most recently undone change.
    pub fn redo(&mut self) -> Result<Outcome> {
        let mutator = &self.mutator;
        let outcome = self
            .history
            .redo(|name, value| mutator.apply_value(name, value))?;
        if let Outcome::Applied(t) = &outcome {
            tracing::debug!(name = %t.name, restored = ?t.new, "redo");
        }
        Ok(outcome)
    }

    /// Delete every row from the backend and start over with a fresh service
    /// sharing the same backend and policy.
    ///
    /// Not recorded in history and cannot be undone.
    pub fn reset(&mut self) -> Result<()> {
        let storage = Arc::clone(self.mutator.storage());
        let keys = storage.scan_keys()?;
        storage.delete_many(&keys)?;

        tracing::info!(rows = keys.len(), "store reset");
        *self = Self::with_policy(storage, self.mutator.policy());
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Recorded transitions, including any redo branch.
    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn storage(&self) -> &Arc<S> {
        self.mutator.storage()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.mutator.policy()
    }
}
