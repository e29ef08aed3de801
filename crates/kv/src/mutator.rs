//! Transactional mutator.
//!
//! The mutator is the only code path that writes to the entry table or the
//! counter index. Each call reads a name's current value, adjusts the two
//! affected counter rows and rewrites the entry inside a single backend
//! transaction, producing the [`Transition`] that describes the change.
//!
//! # Retries
//!
//! Transient backend failures (commit conflicts, unavailability) are retried
//! with exponential backoff according to the [`RetryPolicy`]. Once either the
//! attempt budget or the deadline is spent the caller receives
//! [`Error::StorageUnavailable`]. Invariant violations are never retried.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tally_common::{Error, Result, Value};
use tally_storage::{StorageBackend, Transaction};

use crate::tables::{CountDelta, TxnError, TxnTables};
use crate::transition::Transition;

/// Bounds on how long the mutator keeps retrying one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first. Must be > 0.
    pub max_attempts: u32,
    /// Sleep before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the doubling backoff.
    pub max_backoff: Duration,
    /// Overall deadline measured from the first attempt.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(5),
            max_backoff: Duration::from_millis(100),
            timeout: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    /// A policy that gives up after the first failure.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Backoff to use after sleeping for `backoff`: doubled, capped at
    /// `max_backoff`.
    pub fn next_backoff(&self, backoff: Duration) -> Duration {
        backoff.saturating_mul(2).min(self.max_backoff)
    }
}

/// Applies single-name updates atomically against a storage backend.
#[derive(Debug)]
pub struct Mutator<S> {
    storage: Arc<S>,
    policy: RetryPolicy,
}

impl<S: StorageBackend> Mutator<S> {
    pub fn new(storage: Arc<S>, policy: RetryPolicy) -> Self {
        Self { storage, policy }
    }

    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Bind `name` to `new` (or unbind it when `new` is `None`).
    ///
    /// Returns the transition that was applied. When `name` already holds
    /// `new` nothing is written and the returned transition has
    /// `old == new`.
    ///
    /// # Errors
    ///
    /// - [`Error::StorageUnavailable`] if the transaction could not commit
    ///   within the retry policy
    /// - [`Error::InvariantViolation`] if a count would go negative
    /// - [`Error::Storage`] for non-transient backend failures such as a
    ///   corrupt row
    pub fn apply_value(&self, name: &str, new: Option<Value>) -> Result<Transition> {
        let started = Instant::now();
        let mut backoff = self.policy.initial_backoff;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            let err = match self.try_apply(name, new) {
                Ok(transition) => {
                    tracing::debug!(
                        name,
                        old = ?transition.old,
                        new = ?transition.new,
                        attempt,
                        "applied transition"
                    );
                    return Ok(transition);
                }
                Err(TxnError::Invariant(msg)) => {
                    tracing::error!(name, %msg, "counter invariant violated; transaction aborted");
                    return Err(Error::InvariantViolation(msg));
                }
                Err(TxnError::Storage(err)) if !err.is_transient() => return Err(err.into()),
                Err(TxnError::Storage(err)) => err,
            };

            let deadline_hit = started.elapsed().saturating_add(backoff) > self.policy.timeout;
            if attempt >= self.policy.max_attempts || deadline_hit {
                return Err(Error::StorageUnavailable {
                    attempts: attempt,
                    reason: err.to_string(),
                });
            }

            tracing::warn!(
                name,
                attempt,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "retrying transaction"
            );
            std::thread::sleep(backoff);
            backoff = self.policy.next_backoff(backoff);
        }
    }

    /// One attempt. Any early return drops the transaction, which discards
    /// its staged writes.
    fn try_apply(&self, name: &str, new: Option<Value>) -> std::result::Result<Transition, TxnError> {
        let mut txn = self.storage.begin()?;
        let mut tables = TxnTables::new(&mut txn);

        let old = tables.entry(name)?;
        if old == new {
            txn.abort();
            return Ok(Transition::new(name, new, new));
        }

        if let Some(old_value) = old {
            tables.update_count(old_value, CountDelta::Decrement)?;
        }
        tables.write_entry(name, new)?;
        if let Some(new_value) = new {
            tables.update_count(new_value, CountDelta::Increment)?;
        }

        txn.commit()?;
        Ok(Transition::new(name, old, new))
    }
}
