//! TCP transport.
//!
//! Plain TCP listener accepting unauthenticated, unencrypted
//! connections. Each accepted socket is split into read and write
//! halves: the connection handler owns the read half, while the write
//! half is shared through the runtime's writer map so acknowledgments
//! and pushes to a client go through one ordered writer.

use std::net::SocketAddr;

use tokio::net::{
    TcpListener, TcpStream,
    tcp::{OwnedReadHalf, OwnedWriteHalf},
};

use crate::error::ServerError;

/// TCP transport owning the listening socket.
pub struct TcpTransport {
    /// Bound listener
    listener: TcpListener,
}

impl TcpTransport {
    /// Create and bind a new TCP transport.
    ///
    /// Failure here is fatal: a server that cannot establish its
    /// listening socket cannot start.
    pub async fn bind(address: &str) -> Result<Self, ServerError> {
        let addr: SocketAddr = address
            .parse()
            .map_err(|e| ServerError::Config(format!("invalid bind address '{address}': {e}")))?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind listener: {e}")))?;

        tracing::info!("TCP transport bound to {}", addr);

        Ok(Self { listener })
    }

    /// Accept a new TCP connection.
    ///
    /// This method blocks until a connection is available. Errors are
    /// per-attempt; the caller logs and keeps accepting.
    pub async fn accept(&self) -> Result<TcpConnection, ServerError> {
        let (stream, remote_addr) = self
            .listener
            .accept()
            .await
            .map_err(|e| ServerError::Transport(format!("accept failed: {e}")))?;

        Ok(TcpConnection { stream, remote_addr })
    }

    /// Local address the transport is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        self.listener
            .local_addr()
            .map_err(|e| ServerError::Transport(format!("failed to get local address: {e}")))
    }
}

/// An accepted TCP connection.
pub struct TcpConnection {
    /// The accepted stream
    stream: TcpStream,
    /// Remote peer address, recorded at accept time
    remote_addr: SocketAddr,
}

impl TcpConnection {
    /// Remote peer address.
    #[must_use]
    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    /// Split into independently owned read and write halves.
    #[must_use]
    pub fn into_split(self) -> (OwnedReadHalf, OwnedWriteHalf) {
        self.stream.into_split()
    }
}
