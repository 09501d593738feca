//! Outbound TCP for the HTTP client.
//!
//! [`HyperHttpClient`](crate::HyperHttpClient) only ever dials the lab
//! backend, so the provider exposes a single `connect`.

use async_trait::async_trait;
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};

/// Dials the backend.
///
/// Single-core design - no Send bounds needed.
#[async_trait(?Send)]
pub trait NetworkProvider: Clone {
    /// Stream handed to the HTTP handshake.
    type TcpStream: AsyncRead + AsyncWrite + Unpin + 'static;

    /// Open a connection to `authority` (`host:port`).
    async fn connect(&self, authority: &str) -> io::Result<Self::TcpStream>;
}

/// Dials with `tokio::net::TcpStream`, Nagle disabled.
#[derive(Debug, Clone, Default)]
pub struct TokioNetworkProvider;

impl TokioNetworkProvider {
    /// Create a new Tokio network provider.
    pub fn new() -> Self {
        Self
    }
}

#[async_trait(?Send)]
impl NetworkProvider for TokioNetworkProvider {
    type TcpStream = tokio::net::TcpStream;

    async fn connect(&self, authority: &str) -> io::Result<Self::TcpStream> {
        let stream = tokio::net::TcpStream::connect(authority).await?;
        // Latency is measured per request; small writes must not wait.
        stream.set_nodelay(true)?;
        tracing::trace!(authority, "connected to backend");
        Ok(stream)
    }
}
