//! TCP server for the tally store.
//!
//! One process holds one in-memory store and one undo/redo history, shared
//! by every client connection. Requests are served one at a time across all
//! connections.

pub mod config;
pub mod context;
pub mod handler;
pub mod server;

pub use config::{RetryConfig, ServerConfig};
pub use context::AppContext;
pub use handler::dispatch;
pub use server::Server;
