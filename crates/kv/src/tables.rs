//! Typed access to the entry table and the counter index.
//!
//! `TxnTables` wraps an open transaction and is only ever constructed inside
//! the mutator, so every count update happens in the same atomic scope as the
//! entry write it accompanies. `ReadOnlyTables` serves point lookups straight
//! from the backend.

use tally_common::{value_key, Count, Value};
use tally_storage::rows::{self, CountRow, EntryRow};
use tally_storage::{StorageBackend, StorageError, Table, Transaction};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Failure inside one transaction attempt.
#[derive(Debug)]
pub(crate) enum TxnError {
    Storage(StorageError),
    Invariant(String),
}

impl From<StorageError> for TxnError {
    fn from(err: StorageError) -> Self {
        TxnError::Storage(err)
    }
}

/// Signed adjustment applied to a value's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CountDelta {
    Increment,
    Decrement,
}

// ---------------------------------------------------------------------------
// TxnTables: write path
// ---------------------------------------------------------------------------

pub(crate) struct TxnTables<'a, T: Transaction> {
    txn: &'a mut T,
}

impl<'a, T: Transaction> TxnTables<'a, T> {
    pub(crate) fn new(txn: &'a mut T) -> Self {
        Self { txn }
    }

    /// Current value bound to `name`, recording the read in the transaction.
    pub(crate) fn entry(&mut self, name: &str) -> Result<Option<Value>, TxnError> {
        match self.txn.get(Table::Entries, name.as_bytes())? {
            Some(bytes) => Ok(Some(rows::decode::<EntryRow>(&bytes)?.value)),
            None => Ok(None),
        }
    }

    /// Bind `name` to `value`, or drop the row when `value` is `None`.
    pub(crate) fn write_entry(&mut self, name: &str, value: Option<Value>) -> Result<(), TxnError> {
        match value {
            Some(value) => {
                let bytes = rows::encode(&EntryRow { value })?;
                self.txn.put(Table::Entries, name.as_bytes(), bytes);
            }
            None => self.txn.delete(Table::Entries, name.as_bytes()),
        }
        Ok(())
    }

    /// Read-modify-write of one counter row. Returns the new count.
    ///
    /// A row reaching zero is deleted; reads of an absent row yield 0.
    pub(crate) fn update_count(&mut self, value: Value, delta: CountDelta) -> Result<Count, TxnError> {
        let key = value_key(value);
        let current = match self.txn.get(Table::ValueCounts, &key)? {
            Some(bytes) => rows::decode::<CountRow>(&bytes)?.count,
            None => 0,
        };

        let updated = match delta {
            CountDelta::Increment => current.checked_add(1).ok_or_else(|| {
                TxnError::Invariant(format!("count for value {value} overflowed"))
            })?,
            CountDelta::Decrement => current.checked_sub(1).ok_or_else(|| {
                TxnError::Invariant(format!("count for value {value} would go negative"))
            })?,
        };

        if updated == 0 {
            self.txn.delete(Table::ValueCounts, &key);
        } else {
            let bytes = rows::encode(&CountRow { count: updated })?;
            self.txn.put(Table::ValueCounts, &key, bytes);
        }
        Ok(updated)
    }
}

// ---------------------------------------------------------------------------
// ReadOnlyTables: point lookups
// ---------------------------------------------------------------------------

pub(crate) struct ReadOnlyTables<'a, S> {
    storage: &'a S,
}

impl<'a, S: StorageBackend> ReadOnlyTables<'a, S> {
    pub(crate) fn new(storage: &'a S) -> Self {
        Self { storage }
    }

    pub(crate) fn entry(&self, name: &str) -> tally_common::Result<Option<Value>> {
        match self.storage.get(Table::Entries, name.as_bytes())? {
            Some(bytes) => Ok(Some(rows::decode::<EntryRow>(&bytes)?.value)),
            None => Ok(None),
        }
    }

    pub(crate) fn count(&self, value: Value) -> tally_common::Result<Count> {
        match self.storage.get(Table::ValueCounts, &value_key(value))? {
            Some(bytes) => Ok(rows::decode::<CountRow>(&bytes)?.count),
            None => Ok(0),
        }
    }
}
