//! Row encodings for the two service tables.
//!
//! Rows are serialized using bincode. Decoding failures are reported as
//! [`StorageError::Corrupt`] so that a damaged row is never mistaken for an
//! absent one.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tally_common::{Count, Value};

use crate::backend::{StorageError, StorageResult};

/// Row in the entries table: the value currently bound to a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryRow {
    pub value: Value,
}

/// Row in the value-counts table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CountRow {
    pub count: Count,
}

/// Serialize a row to bytes.
pub fn encode<T: Serialize>(row: &T) -> StorageResult<Vec<u8>> {
    bincode::serialize(row).map_err(|e| StorageError::Corrupt(e.to_string()))
}

/// Deserialize a row from bytes.
///
/// # Examples
///
/// ```
/// use tally_storage::rows::{decode, encode, EntryRow};
///
/// let bytes = encode(&EntryRow { value: 10 }).unwrap();
/// let row: EntryRow = decode(&bytes).unwrap();
/// assert_eq!(row.value, 10);
/// ```
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> StorageResult<T> {
    bincode::deserialize(bytes).map_err(|e| StorageError::Corrupt(e.to_string()))
}
