//! Helpers for end-to-end server tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tally_server::{Server, ServerConfig};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LinesCodec};

/// A server running on an ephemeral port.
pub struct TestServer {
    pub addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<std::io::Result<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(ServerConfig::default()).await
    }

    pub async fn start_with(mut config: ServerConfig) -> Self {
        config.listen_addr = "127.0.0.1:0".to_string();
        let server = Server::bind(config).await.expect("bind");
        let addr = server.local_addr().expect("local addr");

        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(server.run_until(async {
            let _ = rx.await;
        }));

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    pub async fn client(&self) -> Client {
        Client::connect(self.addr).await
    }

    /// Stop accepting and wait for the accept loop to exit.
    pub async fn stop(mut self) -> std::io::Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await.expect("server task")
    }
}

/// Line-oriented test client.
pub struct Client {
    framed: Framed<TcpStream, LinesCodec>,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        Self {
            framed: Framed::new(stream, LinesCodec::new()),
        }
    }

    /// Send one request line and wait for its reply.
    pub async fn request(&mut self, line: &str) -> String {
        self.framed.send(line).await.expect("send");
        self.read_reply().await
    }

    pub async fn send(&mut self, line: &str) {
        self.framed.send(line).await.expect("send");
    }

    pub async fn read_reply(&mut self) -> String {
        self.framed
            .next()
            .await
            .expect("connection closed")
            .expect("reply line")
    }
}
