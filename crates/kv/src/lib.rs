//! Key-value service for the tally store
//!
//! This crate implements a key-value store whose values are integers, with a
//! secondary index counting how many names hold each value, and a linear
//! undo/redo history of every mutation.
//!
//! # Architecture
//!
//! - **Tables**: typed access to the entry table and the counter index
//! - **Mutator**: the single transactional write path keeping both in step
//! - **History**: arena-backed undo/redo log with redo-branch pruning
//! - **Service**: the facade composing mutator and history
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use tally_kv::{Outcome, Service};
//! use tally_storage::MemStorage;
//!
//! let mut service = Service::new(Arc::new(MemStorage::new()));
//! service.set("a", 10).unwrap();
//! service.set("a", 20).unwrap();
//! assert_eq!(service.count_equal_to(10).unwrap(), 0);
//!
//! service.undo().unwrap();
//! assert_eq!(service.get("a").unwrap(), Some(10));
//!
//! service.set("b", 1).unwrap();
//! assert_eq!(service.redo().unwrap(), Outcome::NoHistory);
//! ```

pub mod history;
pub mod mutator;
pub mod operations;
pub mod service;
mod tables;
pub mod transition;

// Re-export commonly used types for convenience
pub use history::{History, HistoryState};
pub use mutator::{Mutator, RetryPolicy};
pub use operations::Operation;
pub use service::Service;
pub use transition::{Outcome, Transition};
