//! Storage capability consumed by the key-value service.
//!
//! The service never talks to a concrete engine. It needs exactly four
//! things from one: a transaction scoped to a handful of rows, a point
//! lookup, a key scan and a bulk delete. `StorageBackend` and `Transaction`
//! describe that surface so the service logic can run against any backend
//! that provides it, including the in-memory one in [`crate::mem`].

use std::fmt;
use thiserror::Error;

/// Logical tables the service stores rows in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    /// Name -> current value.
    Entries,
    /// Value -> number of names holding it.
    ValueCounts,
}

impl Table {
    /// Short name used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Entries => "entries",
            Table::ValueCounts => "value_counts",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully qualified row address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    pub table: Table,
    pub key: Vec<u8>,
}

impl RowKey {
    pub fn new(table: Table, key: impl Into<Vec<u8>>) -> Self {
        Self {
            table,
            key: key.into(),
        }
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.key) {
            Ok(s) if self.table == Table::Entries => write!(f, "{}/{}", self.table, s),
            _ => {
                write!(f, "{}/0x", self.table)?;
                for b in &self.key {
                    write!(f, "{b:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Errors reported by a storage backend.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    /// A row read by the transaction was changed by a concurrent commit.
    #[error("write conflict on {0}")]
    Conflict(RowKey),

    /// The backend could not be reached or timed out.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

impl StorageError {
    /// Whether retrying the same transaction may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Conflict(_) | StorageError::Unavailable(_))
    }
}

impl From<StorageError> for tally_common::Error {
    fn from(err: StorageError) -> Self {
        tally_common::Error::Storage(err.to_string())
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// A single read-modify-write unit of work.
///
/// Writes are buffered until [`Transaction::commit`]. Dropping a transaction
/// without committing discards them, so no partial update is ever visible.
pub trait Transaction {
    /// Read a row, observing this transaction's own uncommitted writes.
    fn get(&mut self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Stage an insert or overwrite.
    fn put(&mut self, table: Table, key: &[u8], row: Vec<u8>);

    /// Stage a delete. Deleting an absent row is not an error.
    fn delete(&mut self, table: Table, key: &[u8]);

    /// Atomically apply every staged write.
    fn commit(self) -> StorageResult<()>;

    /// Discard every staged write.
    fn abort(self);
}

/// Transactional key-value backend.
pub trait StorageBackend: Send + Sync {
    type Txn<'a>: Transaction
    where
        Self: 'a;

    /// Start a new transaction.
    fn begin(&self) -> StorageResult<Self::Txn<'_>>;

    /// Point lookup outside any transaction.
    fn get(&self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>>;

    /// Every row key currently stored, across all tables.
    fn scan_keys(&self) -> StorageResult<Vec<RowKey>>;

    /// Remove the given rows. Missing rows are ignored.
    fn delete_many(&self, keys: &[RowKey]) -> StorageResult<()>;
}
