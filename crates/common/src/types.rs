//! Common type aliases used throughout tally.
//!
//! Using type aliases provides semantic clarity at the API boundary and keeps
//! the storage encoding of each scalar in one place.

/// The integer bound to a name.
///
/// # Examples
///
/// ```
/// use tally_common::Value;
///
/// let value: Value = -42;
/// assert!(value < 0);
/// ```
pub type Value = i64;

/// How many names currently hold a given value.
///
/// Counts are unsigned: the counter index refuses to decrement below zero
/// rather than wrapping or clamping.
///
/// # Examples
///
/// ```
/// use tally_common::Count;
///
/// let count: Count = 0;
/// assert_eq!(count.checked_sub(1), None);
/// ```
pub type Count = u64;

/// Encode a value as a storage key.
///
/// Big-endian so that keys of non-negative values sort numerically.
pub fn value_key(value: Value) -> [u8; 8] {
    value.to_be_bytes()
}
