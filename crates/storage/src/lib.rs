//! Storage layer for the tally store.
//!
//! This crate defines the transactional storage capability the key-value
//! service is written against, the row encodings for its two tables, and an
//! in-memory backend implementing that capability.

pub mod backend;
pub mod mem;
pub mod rows;

// Re-export main types for convenience
pub use backend::{RowKey, StorageBackend, StorageError, StorageResult, Table, Transaction};
pub use mem::{MemStorage, MemTransaction};
pub use rows::{CountRow, EntryRow};
