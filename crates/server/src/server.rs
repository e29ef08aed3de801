//! TCP accept loop and per-connection request handling.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tally_protocol::{CommandCodec, ProtocolError};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;

use crate::config::ServerConfig;
use crate::context::AppContext;

/// A bound listener plus the state its connections share.
pub struct Server {
    listener: TcpListener,
    ctx: Arc<AppContext>,
}

impl Server {
    /// Bind the configured listen address.
    pub async fn bind(config: ServerConfig) -> io::Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr).await?;
        Ok(Self {
            listener,
            ctx: Arc::new(AppContext::new(config)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept connections until `shutdown` resolves.
    ///
    /// Connections already being served are left to finish on their own.
    pub async fn run_until<F>(self, shutdown: F) -> io::Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        tracing::info!(addr = %self.local_addr()?, "listening");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("no longer accepting connections");
                    return Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((socket, peer)) => {
                        let ctx = Arc::clone(&self.ctx);
                        tokio::spawn(async move {
                            tracing::debug!(%peer, "connection opened");
                            match serve_connection(ctx, socket).await {
                                Ok(()) => tracing::debug!(%peer, "connection closed"),
                                Err(e) => tracing::debug!(%peer, error = %e, "connection dropped"),
                            }
                        });
                    }
                    Err(e) => tracing::warn!(error = %e, "accept failed"),
                },
            }
        }
    }
}

/// Answer each request line on `socket` in order until the peer hangs up.
async fn serve_connection(ctx: Arc<AppContext>, socket: TcpStream) -> Result<(), ProtocolError> {
    let codec = CommandCodec::with_max_line_length(ctx.config().max_line_length);
    let mut framed = Framed::new(socket, codec);

    while let Some(request) = framed.next().await {
        let reply = ctx.handle(request?).await;
        framed.send(reply).await?;
    }
    Ok(())
}
