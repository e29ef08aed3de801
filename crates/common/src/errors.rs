//! Error types for the tally value-counting store.
//!
//! This module defines the common error type shared by the storage, kv and
//! server crates. Uses `thiserror` for ergonomic error handling.
//!
//! An absent name and an empty undo/redo direction are not errors; callers
//! return them as `Option` and `Outcome` values.

use thiserror::Error;

/// Common error type for tally operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend could not complete a transaction within the retry budget.
    #[error("storage unavailable after {attempts} attempt(s): {reason}")]
    StorageUnavailable {
        /// How many times the transaction was attempted.
        attempts: u32,
        /// The last failure reported by the backend.
        reason: String,
    },

    /// An internal consistency check failed.
    ///
    /// Raised when the counter index would go negative. This indicates a bug
    /// and is never retried.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Non-transient storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Convenience type alias for Result with tally Error.
pub type Result<T> = std::result::Result<T, Error>;
