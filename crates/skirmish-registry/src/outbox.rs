//! Outbound line delivery.

use skirmish_transport::ConnectionId;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Lines a connection may have queued before further lines to it are
/// dropped.
pub const OUTBOX_CAPACITY: usize = 256;

/// The sending side of one connection.
///
/// Lines pushed here are drained by that connection's writer task, which
/// does the actual network write. Pushing never blocks and never fails the
/// caller: if the writer is gone, or the peer has stopped reading and the
/// queue is full, the line is dropped and logged. That keeps every send
/// cheap enough to collect while the registry lock is held and flush right
/// after it is released.
#[derive(Debug, Clone)]
pub struct Outbox {
    conn_id: ConnectionId,
    tx: mpsc::Sender<String>,
}

impl Outbox {
    /// Creates an outbox for `conn_id` and the receiver its writer drains,
    /// holding up to [`OUTBOX_CAPACITY`] lines.
    pub fn channel(conn_id: ConnectionId) -> (Self, mpsc::Receiver<String>) {
        Self::with_capacity(conn_id, OUTBOX_CAPACITY)
    }

    /// Like [`channel`](Self::channel) with a custom queue size.
    pub fn with_capacity(conn_id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { conn_id, tx }, rx)
    }

    /// The connection this outbox writes to.
    pub fn conn_id(&self) -> ConnectionId {
        self.conn_id
    }

    /// Queues one line. Returns `false` if the line was dropped.
    pub fn send(&self, line: impl Into<String>) -> bool {
        match self.tx.try_send(line.into()) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.conn_id, "peer not reading, line dropped");
                false
            }
            Err(TrySendError::Closed(_)) => {
                tracing::debug!(conn_id = %self.conn_id, "writer gone, line dropped");
                false
            }
        }
    }
}

/// Sends `line` to every recipient, returning how many accepted it.
///
/// A dead or backed-up recipient is logged by [`Outbox::send`] and skipped;
/// delivery to the rest carries on.
pub fn broadcast(recipients: &[Outbox], line: &str) -> usize {
    recipients.iter().filter(|outbox| outbox.send(line)).count()
}
