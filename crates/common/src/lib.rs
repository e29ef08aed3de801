//! Common types and utilities shared across tally crates.
//!
//! This crate provides the error type and scalar aliases used throughout
//! the tally value-counting key-value store.

pub mod errors;
pub mod types;

// Re-export commonly used types for convenience
pub use errors::{Error, Result};
pub use types::{value_key, Count, Value};
