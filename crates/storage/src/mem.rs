//! In-memory transactional storage backend.
//!
//! This module provides `MemStorage`, an in-memory implementation of
//! [`StorageBackend`] suitable for tests and single-process deployments.
//!
//! # Concurrency
//!
//! Transactions are optimistic. Reads go through a shared lock and record the
//! version of every row they observe (absent rows record version 0). Commit
//! takes the exclusive lock, re-checks each recorded version and fails with
//! [`StorageError::Conflict`] if any row moved underneath the transaction.
//! Otherwise every staged write is applied under that same lock, so readers
//! see either none or all of a transaction's effects.
//!
//! Deleted rows leave a versioned tombstone so that a delete followed by a
//! re-insert is still detected as a conflict. A tombstone is dropped once
//! every open transaction began after it was written: such a transaction can
//! only have observed the row as deleted, and any later re-insert bumps the
//! version past what it recorded. A transaction that read the tombstone
//! itself sees a conflict at commit once it is gone.

use std::collections::{btree_map, BTreeMap, BTreeSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::backend::{RowKey, StorageBackend, StorageError, StorageResult, Table, Transaction};

#[derive(Debug, Clone)]
struct VersionedRow {
    version: u64,
    /// `None` marks a tombstone.
    bytes: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<RowKey, VersionedRow>,
    /// Sequence number of the last commit.
    seq: u64,
    /// Begin sequence of each open transaction, with a count per sequence.
    open: BTreeMap<u64, usize>,
    /// Tombstones awaiting reclamation, ordered by the version that wrote them.
    tombstones: BTreeSet<(u64, RowKey)>,
}

impl Inner {
    fn version_of(&self, key: &RowKey) -> u64 {
        self.rows.get(key).map_or(0, |r| r.version)
    }

    fn register(&mut self) -> u64 {
        *self.open.entry(self.seq).or_default() += 1;
        self.seq
    }

    fn release(&mut self, snapshot: u64) {
        if let btree_map::Entry::Occupied(mut open) = self.open.entry(snapshot) {
            *open.get_mut() -= 1;
            if *open.get() == 0 {
                open.remove();
            }
        }
    }

    fn bury(&mut self, key: RowKey, version: u64) {
        self.tombstones.insert((version, key.clone()));
        self.rows.insert(key, VersionedRow { version, bytes: None });
    }

    /// Drop tombstones no open transaction could have seen as live rows.
    fn reclaim(&mut self) -> usize {
        let horizon = self.open.keys().next().copied().unwrap_or(self.seq);
        let mut reclaimed = 0;
        while self.tombstones.first().is_some_and(|(v, _)| *v <= horizon) {
            let Some((version, key)) = self.tombstones.pop_first() else {
                break;
            };
            // A re-insert since the delete supersedes this entry
            if let btree_map::Entry::Occupied(row) = self.rows.entry(key) {
                if row.get().version == version && row.get().bytes.is_none() {
                    row.remove();
                    reclaimed += 1;
                }
            }
        }
        reclaimed
    }
}

/// In-memory storage with optimistic transactions.
///
/// # Examples
///
/// ```
/// use tally_storage::{MemStorage, StorageBackend, Table, Transaction};
///
/// let storage = MemStorage::new();
/// let mut txn = storage.begin().unwrap();
/// txn.put(Table::Entries, b"a", vec![1, 2, 3]);
/// txn.commit().unwrap();
///
/// assert_eq!(storage.get(Table::Entries, b"a").unwrap(), Some(vec![1, 2, 3]));
/// ```
#[derive(Debug, Default)]
pub struct MemStorage {
    inner: RwLock<Inner>,
}

impl MemStorage {
    /// Creates a new, empty `MemStorage`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (non-tombstone) rows in `table`.
    pub fn row_count(&self, table: Table) -> StorageResult<usize> {
        let inner = self.read()?;
        Ok(inner
            .rows
            .iter()
            .filter(|(k, r)| k.table == table && r.bytes.is_some())
            .count())
    }

    fn read(&self) -> StorageResult<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".into()))
    }

    fn write(&self) -> StorageResult<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned".into()))
    }
}

/// Transaction handle returned by [`MemStorage::begin`].
///
/// Dropping the handle without committing behaves like [`Transaction::abort`].
#[derive(Debug)]
pub struct MemTransaction<'a> {
    storage: &'a MemStorage,
    /// Commit sequence at begin.
    snapshot: u64,
    /// Still counted among the open transactions.
    open: bool,
    /// Version observed for each row read from the backend.
    reads: BTreeMap<RowKey, u64>,
    /// Staged writes; `None` stages a delete.
    writes: BTreeMap<RowKey, Option<Vec<u8>>>,
}

impl Transaction for MemTransaction<'_> {
    fn get(&mut self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let row_key = RowKey::new(table, key);
        if let Some(staged) = self.writes.get(&row_key) {
            return Ok(staged.clone());
        }

        let inner = self.storage.read()?;
        let (version, bytes) = match inner.rows.get(&row_key) {
            Some(row) => (row.version, row.bytes.clone()),
            None => (0, None),
        };
        drop(inner);

        // Keep the first observed version; a later re-read must not mask a
        // concurrent change.
        self.reads.entry(row_key).or_insert(version);
        Ok(bytes)
    }

    fn put(&mut self, table: Table, key: &[u8], row: Vec<u8>) {
        self.writes.insert(RowKey::new(table, key), Some(row));
    }

    fn delete(&mut self, table: Table, key: &[u8]) {
        self.writes.insert(RowKey::new(table, key), None);
    }

    fn commit(mut self) -> StorageResult<()> {
        if self.writes.is_empty() {
            return Ok(());
        }

        let storage = self.storage;
        let mut inner = storage.write()?;
        for (key, observed) in &self.reads {
            if inner.version_of(key) != *observed {
                return Err(StorageError::Conflict(key.clone()));
            }
        }

        inner.seq += 1;
        let version = inner.seq;
        let staged = self.writes.len();
        for (key, bytes) in std::mem::take(&mut self.writes) {
            match bytes {
                Some(bytes) => {
                    inner.rows.insert(key, VersionedRow { version, bytes: Some(bytes) });
                }
                None => inner.bury(key, version),
            }
        }

        inner.release(self.snapshot);
        self.open = false;
        let reclaimed = inner.reclaim();

        tracing::trace!(version, staged, reclaimed, "committed transaction");
        Ok(())
    }

    fn abort(self) {
        tracing::trace!(staged = self.writes.len(), "aborted transaction");
    }
}

impl Drop for MemTransaction<'_> {
    fn drop(&mut self) {
        if !self.open {
            return;
        }
        // On a poisoned lock the snapshot stays registered and tombstones stay.
        if let Ok(mut inner) = self.storage.write() {
            inner.release(self.snapshot);
            inner.reclaim();
        }
    }
}

impl StorageBackend for MemStorage {
    type Txn<'a> = MemTransaction<'a>;

    fn begin(&self) -> StorageResult<MemTransaction<'_>> {
        let snapshot = self.write()?.register();
        Ok(MemTransaction {
            storage: self,
            snapshot,
            open: true,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        })
    }

    fn get(&self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        let inner = self.read()?;
        Ok(inner
            .rows
            .get(&RowKey::new(table, key))
            .and_then(|r| r.bytes.clone()))
    }

    fn scan_keys(&self) -> StorageResult<Vec<RowKey>> {
        let inner = self.read()?;
        Ok(inner
            .rows
            .iter()
            .filter(|(_, r)| r.bytes.is_some())
            .map(|(k, _)| k.clone())
            .collect())
    }

    fn delete_many(&self, keys: &[RowKey]) -> StorageResult<()> {
        let mut inner = self.write()?;
        inner.seq += 1;
        let version = inner.seq;
        for key in keys {
            if inner.rows.contains_key(key) {
                inner.bury(key.clone(), version);
            }
        }
        let reclaimed = inner.reclaim();
        tracing::trace!(version, reclaimed, "deleted rows");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_mem_storage_new_is_empty() {
        let storage = MemStorage::new();
        assert!(storage.scan_keys().unwrap().is_empty());
        assert_eq!(storage.get(Table::Entries, b"a").unwrap(), None);
    }

    #[test]
    fn test_commit_makes_writes_visible() {
        let storage = MemStorage::new();
        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![1]);
        txn.put(Table::ValueCounts, b"k", vec![2]);

        // Nothing visible before commit
        assert_eq!(storage.get(Table::Entries, b"a").unwrap(), None);

        txn.commit().unwrap();
        assert_eq!(storage.get(Table::Entries, b"a").unwrap(), Some(vec![1]));
        assert_eq!(storage.get(Table::ValueCounts, b"k").unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_transaction_reads_its_own_writes() {
        let storage = MemStorage::new();
        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![7]);
        assert_eq!(txn.get(Table::Entries, b"a").unwrap(), Some(vec![7]));

        txn.delete(Table::Entries, b"a");
        assert_eq!(txn.get(Table::Entries, b"a").unwrap(), None);
    }

    #[test]
    fn test_abort_discards_writes() {
        let storage = MemStorage::new();
        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![1]);
        txn.abort();

        assert_eq!(storage.get(Table::Entries, b"a").unwrap(), None);
    }

    #[test]
    fn test_drop_without_commit_discards_writes() {
        let storage = MemStorage::new();
        {
            let mut txn = storage.begin().unwrap();
            txn.put(Table::Entries, b"a", vec![1]);
        }
        assert_eq!(storage.get(Table::Entries, b"a").unwrap(), None);
    }

    #[test]
    fn test_concurrent_write_causes_conflict() {
        let storage = MemStorage::new();

        let mut first = storage.begin().unwrap();
        assert_eq!(first.get(Table::Entries, b"a").unwrap(), None);

        let mut second = storage.begin().unwrap();
        second.get(Table::Entries, b"a").unwrap();
        second.put(Table::Entries, b"a", vec![2]);
        second.commit().unwrap();

        first.put(Table::Entries, b"a", vec![1]);
        let err = first.commit().unwrap_err();
        assert_eq!(err, StorageError::Conflict(RowKey::new(Table::Entries, "a")));
        assert!(err.is_transient());

        // The winning write is intact
        assert_eq!(storage.get(Table::Entries, b"a").unwrap(), Some(vec![2]));
    }

    #[test]
    fn test_delete_then_reinsert_still_conflicts() {
        let storage = MemStorage::new();
        let mut setup = storage.begin().unwrap();
        setup.put(Table::Entries, b"a", vec![1]);
        setup.commit().unwrap();

        let mut reader = storage.begin().unwrap();
        reader.get(Table::Entries, b"a").unwrap();

        let mut deleter = storage.begin().unwrap();
        deleter.delete(Table::Entries, b"a");
        deleter.commit().unwrap();
        let mut inserter = storage.begin().unwrap();
        inserter.put(Table::Entries, b"a", vec![1]);
        inserter.commit().unwrap();

        reader.put(Table::Entries, b"a", vec![9]);
        assert!(matches!(reader.commit(), Err(StorageError::Conflict(_))));
    }

    #[test]
    fn test_read_only_commit_never_conflicts() {
        let storage = MemStorage::new();
        let mut reader = storage.begin().unwrap();
        reader.get(Table::Entries, b"a").unwrap();

        let mut writer = storage.begin().unwrap();
        writer.put(Table::Entries, b"a", vec![1]);
        writer.commit().unwrap();

        assert!(reader.commit().is_ok());
    }

    #[test]
    fn test_scan_and_delete_many() {
        let storage = MemStorage::new();
        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![1]);
        txn.put(Table::Entries, b"b", vec![2]);
        txn.put(Table::ValueCounts, b"c", vec![3]);
        txn.commit().unwrap();

        let keys = storage.scan_keys().unwrap();
        assert_eq!(keys.len(), 3);
        assert_eq!(storage.row_count(Table::Entries).unwrap(), 2);

        storage.delete_many(&keys).unwrap();
        assert!(storage.scan_keys().unwrap().is_empty());
        assert_eq!(storage.row_count(Table::ValueCounts).unwrap(), 0);
    }

    #[test]
    fn test_deleted_rows_are_not_scanned() {
        let storage = MemStorage::new();
        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![1]);
        txn.commit().unwrap();

        let mut txn = storage.begin().unwrap();
        txn.delete(Table::Entries, b"a");
        txn.commit().unwrap();

        assert!(storage.scan_keys().unwrap().is_empty());
    }

    fn retained(storage: &MemStorage) -> usize {
        storage.inner.read().unwrap().rows.len()
    }

    #[test]
    fn test_tombstones_are_reclaimed() {
        let storage = MemStorage::new();
        for i in 0..10_000u32 {
            let key = i.to_be_bytes();
            let mut txn = storage.begin().unwrap();
            txn.put(Table::Entries, &key, vec![1]);
            txn.commit().unwrap();

            let mut txn = storage.begin().unwrap();
            txn.delete(Table::Entries, &key);
            txn.commit().unwrap();
        }
        assert!(storage.scan_keys().unwrap().is_empty());
        assert_eq!(retained(&storage), 0);

        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![1]);
        txn.put(Table::ValueCounts, b"b", vec![2]);
        txn.commit().unwrap();

        let keys = storage.scan_keys().unwrap();
        storage.delete_many(&keys).unwrap();
        assert_eq!(retained(&storage), 0);
        assert_eq!(storage.inner.read().unwrap().tombstones.len(), 0);
    }

    #[test]
    fn test_open_transaction_holds_tombstones() {
        let storage = MemStorage::new();
        let mut reader = storage.begin().unwrap();
        assert_eq!(reader.get(Table::Entries, b"a").unwrap(), None);

        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![1]);
        txn.commit().unwrap();
        let mut txn = storage.begin().unwrap();
        txn.delete(Table::Entries, b"a");
        txn.commit().unwrap();

        // The insert and delete happened after the reader's read
        assert_eq!(retained(&storage), 1);
        reader.put(Table::Entries, b"a", vec![9]);
        assert!(matches!(reader.commit(), Err(StorageError::Conflict(_))));

        // Closing the reader lets the tombstone go
        assert_eq!(retained(&storage), 0);
        assert_eq!(storage.get(Table::Entries, b"a").unwrap(), None);
    }

    #[test]
    fn test_dropped_transaction_is_released() {
        let storage = MemStorage::new();
        let held = storage.begin().unwrap();

        let mut txn = storage.begin().unwrap();
        txn.put(Table::Entries, b"a", vec![1]);
        txn.commit().unwrap();
        storage.delete_many(&storage.scan_keys().unwrap()).unwrap();
        assert_eq!(retained(&storage), 1);

        drop(held);
        assert_eq!(retained(&storage), 0);
        assert!(storage.inner.read().unwrap().open.is_empty());
    }

    #[test]
    fn test_mem_storage_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}
        assert_send::<MemStorage>();
        assert_sync::<MemStorage>();
    }

    #[test]
    fn test_mem_storage_can_be_used_across_threads() {
        let storage = Arc::new(MemStorage::new());
        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let storage = Arc::clone(&storage);
                std::thread::spawn(move || {
                    let mut txn = storage.begin().unwrap();
                    txn.put(Table::Entries, &[i], vec![i]);
                    txn.commit().unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(storage.row_count(Table::Entries).unwrap(), 4);
    }
}
