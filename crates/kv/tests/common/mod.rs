//! Common test utilities for service integration tests.
//!
//! Provides a storage wrapper that injects commit failures, and helpers for
//! checking the counter invariant against the raw entry table.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use tally_common::{Count, Value};
use tally_storage::rows::{self, CountRow, EntryRow};
use tally_storage::{
    MemStorage, MemTransaction, RowKey, StorageBackend, StorageError, StorageResult, Table,
    Transaction,
};

/// `MemStorage` whose next `n` commits fail with a transient error.
#[derive(Debug, Default)]
pub struct FlakyStorage {
    inner: MemStorage,
    failures_left: AtomicU32,
    failed_commits: AtomicU32,
    commits: AtomicU32,
}

impl FlakyStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` commits fail.
    pub fn fail_next_commits(&self, n: u32) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn failed_commits(&self) -> u32 {
        self.failed_commits.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> u32 {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn inner(&self) -> &MemStorage {
        &self.inner
    }
}

pub struct FlakyTransaction<'a> {
    inner: MemTransaction<'a>,
    owner: &'a FlakyStorage,
}

impl Transaction for FlakyTransaction<'_> {
    fn get(&mut self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(table, key)
    }

    fn put(&mut self, table: Table, key: &[u8], row: Vec<u8>) {
        self.inner.put(table, key, row)
    }

    fn delete(&mut self, table: Table, key: &[u8]) {
        self.inner.delete(table, key)
    }

    fn commit(self) -> StorageResult<()> {
        let should_fail = self
            .owner
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            self.owner.failed_commits.fetch_add(1, Ordering::SeqCst);
            self.inner.abort();
            return Err(StorageError::Unavailable("injected failure".into()));
        }
        self.owner.commits.fetch_add(1, Ordering::SeqCst);
        self.inner.commit()
    }

    fn abort(self) {
        self.inner.abort()
    }
}

impl StorageBackend for FlakyStorage {
    type Txn<'a> = FlakyTransaction<'a>;

    fn begin(&self) -> StorageResult<FlakyTransaction<'_>> {
        Ok(FlakyTransaction {
            inner: self.inner.begin()?,
            owner: self,
        })
    }

    fn get(&self, table: Table, key: &[u8]) -> StorageResult<Option<Vec<u8>>> {
        self.inner.get(table, key)
    }

    fn scan_keys(&self) -> StorageResult<Vec<RowKey>> {
        self.inner.scan_keys()
    }

    fn delete_many(&self, keys: &[RowKey]) -> StorageResult<()> {
        self.inner.delete_many(keys)
    }
}

/// Every (name, value) pair in the entry table.
pub fn entries<S: StorageBackend>(storage: &S) -> HashMap<String, Value> {
    storage
        .scan_keys()
        .expect("scan should succeed")
        .into_iter()
        .filter(|k| k.table == Table::Entries)
        .map(|k| {
            let bytes = storage
                .get(Table::Entries, &k.key)
                .expect("get should succeed")
                .expect("scanned row should exist");
            let row: EntryRow = rows::decode(&bytes).expect("entry row should decode");
            (String::from_utf8(k.key).expect("names are utf-8"), row.value)
        })
        .collect()
}

/// Every (value, count) pair in the counter index.
pub fn counts<S: StorageBackend>(storage: &S) -> HashMap<Value, Count> {
    storage
        .scan_keys()
        .expect("scan should succeed")
        .into_iter()
        .filter(|k| k.table == Table::ValueCounts)
        .map(|k| {
            let bytes = storage
                .get(Table::ValueCounts, &k.key)
                .expect("get should succeed")
                .expect("scanned row should exist");
            let row: CountRow = rows::decode(&bytes).expect("count row should decode");
            let key: [u8; 8] = k.key.as_slice().try_into().expect("8-byte value key");
            (Value::from_be_bytes(key), row.count)
        })
        .collect()
}

/// Assert the counter index exactly matches a recount of the entry table.
pub fn assert_counts_consistent<S: StorageBackend>(storage: &S) {
    let mut expected: HashMap<Value, Count> = HashMap::new();
    for value in entries(storage).into_values() {
        *expected.entry(value).or_default() += 1;
    }
    assert_eq!(counts(storage), expected, "counter index out of step with entries");
}
