//! Transport abstraction layer for Skirmish.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the ways a player can reach the server. Every transport speaks in whole
//! lines: the server never sees partial frames, and every outbound line gets
//! its terminator added by the transport.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`,
//!   one text frame per line.

mod error;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use tcp::{TcpConnection, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{DEFAULT_HANDSHAKE_TIMEOUT, WebSocketConnection, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Default upper bound on the length of a single inbound line, in bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 1024;

/// Counter for generating unique connection IDs across all transports.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates the next process-wide connection ID.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// The futures are declared `Send` so a server generic over the transport
/// can still move its accept loop onto the Tokio thread pool.
pub trait Transport: Send + Sync + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;

    /// Gracefully shuts down the transport, stopping new connections.
    fn shutdown(&self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// A single connection that exchanges newline-delimited text.
///
/// Sending and receiving lock independent halves, so one task may sit in
/// [`recv_line`](Self::recv_line) while another writes.
pub trait Connection: Send + Sync + 'static {
    /// Sends one line to the remote peer. The terminator is added here.
    fn send_line(
        &self,
        line: &str,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next line from the remote peer, without its terminator.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    fn recv_line(
        &self,
    ) -> impl Future<Output = Result<Option<String>, TransportError>> + Send;

    /// Closes the outbound half of the connection.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the remote peer's address.
    fn peer_addr(&self) -> SocketAddr;
}
