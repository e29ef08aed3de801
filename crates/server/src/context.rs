//! Shared server state.

use std::sync::Arc;

use tally_kv::{RetryPolicy, Service};
use tally_protocol::{Reply, Request};
use tally_storage::MemStorage;
use tokio::sync::Mutex;

use crate::config::ServerConfig;
use crate::handler::dispatch;

/// State shared by every connection.
///
/// The single [`Service`] sits behind one mutex. Every request holds it for
/// its whole duration, so history moves from different clients never
/// interleave.
#[derive(Debug)]
pub struct AppContext {
    config: ServerConfig,
    service: Mutex<Service<MemStorage>>,
}

impl AppContext {
    /// Build a context with a fresh in-memory store.
    pub fn new(config: ServerConfig) -> Self {
        let policy = RetryPolicy::from(&config.retry);
        let service = Service::with_policy(Arc::new(MemStorage::new()), policy);
        Self {
            config,
            service: Mutex::new(service),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Serve one decoded request line.
    ///
    /// Storage calls block (and may sleep between retries), so the command
    /// runs on the blocking pool.
    pub async fn handle(self: &Arc<Self>, request: Request) -> Reply {
        let command = match request {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(error = %e, "rejected request");
                return e.into();
            }
        };

        let name = command.name();
        let write = command.is_write();
        let ctx = Arc::clone(self);
        let result = tokio::task::spawn_blocking(move || {
            let mut service = ctx.service.blocking_lock();
            dispatch(&mut service, command)
        })
        .await;

        match result {
            Ok(Ok(reply)) => {
                tracing::trace!(command = name, write, %reply, "served");
                reply
            }
            Ok(Err(e)) => {
                tracing::warn!(command = name, write, error = %e, "command failed");
                e.into()
            }
            Err(e) => {
                tracing::error!(command = name, error = %e, "command task failed");
                Reply::Error("internal error".to_string())
            }
        }
    }
}
