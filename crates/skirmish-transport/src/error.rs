use std::io;

/// Errors from the transport layer.
///
/// Per-connection errors (`Send`, `Receive`, `Handshake`) end that
/// connection only. `Bind` is fatal at startup; `Accept` is logged and the
/// listener keeps going.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// Accepting the next socket failed.
    #[error("accept failed: {0}")]
    Accept(#[source] io::Error),

    /// The peer connected but did not complete the WebSocket upgrade.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// Writing a line failed.
    #[error("send failed: {0}")]
    Send(#[source] io::Error),

    /// Reading a line failed (reset, invalid UTF-8, broken frame).
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
}

impl TransportError {
    pub(crate) fn bind(addr: &str, source: io::Error) -> Self {
        Self::Bind {
            addr: addr.to_owned(),
            source,
        }
    }
}
