//! Per-connection handler: registration, the command loop, and cleanup.
//!
//! Each accepted connection gets its own Tokio task running this handler,
//! plus a writer task that drains the connection's outbox. The flow is:
//!   1. Receive the first line → register a player under that name
//!   2. Announce the arrival to everyone else
//!   3. Loop: receive a line → route it under the registry lock → flush
//!   4. On EOF, error or QUIT: unregister and announce the departure

use std::sync::Arc;

use skirmish_protocol::{Command, parse_nickname, text};
use skirmish_registry::{Outbox, broadcast};
use skirmish_transport::Connection;
use tokio::sync::mpsc::Receiver;

use crate::SkirmishError;
use crate::router::{self, Flow, Outgoing, Session};
use crate::server::ServerState;

/// Drop guard that unregisters a player when the handler exits.
///
/// The normal path calls [`release`](Self::release) and awaits the
/// departure broadcast. If the handler panics or its task is cancelled
/// instead, `Drop` spawns the same cleanup so the name is always freed.
struct RegistrationGuard {
    username: Option<String>,
    state: Arc<ServerState>,
}

impl RegistrationGuard {
    fn new(username: String, state: Arc<ServerState>) -> Self {
        Self {
            username: Some(username),
            state,
        }
    }

    async fn release(mut self) {
        if let Some(username) = self.username.take() {
            leave(&self.state, &username).await;
        }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        if let Some(username) = self.username.take() {
            let state = Arc::clone(&self.state);
            tokio::spawn(async move {
                leave(&state, &username).await;
            });
        }
    }
}

/// Removes a player and tells everyone left.
async fn leave(state: &ServerState, username: &str) {
    let recipients = {
        let mut registry = state.registry.lock().await;
        registry.unregister(username);
        registry.snapshot_connections(None)
    };
    broadcast(&recipients, &text::left_chat(username));
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection<C: Connection>(
    conn: C,
    state: Arc<ServerState>,
) -> Result<(), SkirmishError> {
    let conn = Arc::new(conn);
    let conn_id = conn.id();
    tracing::info!(%conn_id, peer = %conn.peer_addr(), "new connection");

    let (outbox, rx) = Outbox::channel(conn_id);
    let writer = tokio::spawn(write_lines(Arc::clone(&conn), rx));

    // `serve` owns the last outbox clones outside the registry; once it
    // returns and the player is unregistered, the writer drains and stops.
    let result = serve(conn.as_ref(), &state, outbox).await;

    if let Err(e) = writer.await {
        tracing::warn!(%conn_id, error = %e, "writer task failed");
    }
    if let Err(e) = conn.close().await {
        tracing::debug!(%conn_id, error = %e, "close failed");
    }
    tracing::info!(%conn_id, "connection closed");
    result
}

/// Registration and the command loop.
async fn serve<C: Connection>(
    conn: &C,
    state: &Arc<ServerState>,
    outbox: Outbox,
) -> Result<(), SkirmishError> {
    let conn_id = conn.id();

    // --- Step 1: Registration ---
    let Some(first) = conn.recv_line().await? else {
        tracing::debug!(%conn_id, "closed before registering");
        return Ok(());
    };
    let desired = parse_nickname(&first).unwrap_or_else(|| format!("Player {conn_id}"));

    let (registration, others) = {
        let mut registry = state.registry.lock().await;
        let registration = registry.register(&desired, outbox.clone());
        let others = registry.snapshot_connections(Some(conn_id));
        (registration, others)
    };
    let guard = RegistrationGuard::new(registration.username.clone(), Arc::clone(state));

    if registration.collided() {
        outbox.send(text::nickname_taken(&registration.requested, &registration.username));
    }
    broadcast(
        &others,
        &text::entered_world(&registration.username, &registration.location),
    );

    let session = Session {
        username: registration.username,
        conn_id,
        outbox,
    };

    // --- Step 2: Command loop ---
    loop {
        let line = match conn.recv_line().await {
            Ok(Some(line)) => line,
            Ok(None) => {
                tracing::info!(%conn_id, username = %session.username, "client disconnected");
                break;
            }
            Err(e) => {
                tracing::debug!(%conn_id, username = %session.username, error = %e, "recv error");
                break;
            }
        };

        let command = Command::parse(&line);
        tracing::debug!(%conn_id, username = %session.username, ?command, "command received");

        let mut out = Outgoing::default();
        let flow = {
            let mut registry = state.registry.lock().await;
            router::route(&mut registry, &session, command, &mut out)
        };
        out.flush();

        if flow == Flow::Quit {
            tracing::info!(%conn_id, username = %session.username, "client quit");
            break;
        }
    }

    // --- Step 3: Cleanup ---
    guard.release().await;
    Ok(())
}

/// Drains an outbox onto the wire until every sender is gone.
///
/// A failed write ends the task; later lines for this connection are
/// dropped at the outbox and logged there.
async fn write_lines<C: Connection>(conn: Arc<C>, mut rx: Receiver<String>) {
    while let Some(line) = rx.recv().await {
        if let Err(e) = conn.send_line(&line).await {
            tracing::warn!(conn_id = %conn.id(), error = %e, "write failed");
            break;
        }
    }
}
