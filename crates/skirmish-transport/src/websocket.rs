//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Each text frame carries exactly one line. Binary frames are accepted when
//! they hold valid UTF-8 so simple clients can use either.
//!
//! The upgrade handshake runs in its own task per socket, so a peer that
//! connects and never speaks cannot hold up [`Transport::accept`] for anyone
//! else.

use std::io;
use std::net::SocketAddr;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;

use crate::{Connection, ConnectionId, Transport, TransportError, DEFAULT_MAX_LINE_LEN};

type WsStream = tokio_tungstenite::WebSocketStream<TcpStream>;

/// How long a new socket gets to finish the WebSocket upgrade.
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Upgraded connections waiting to be returned from `accept`.
const READY_QUEUE: usize = 64;

/// A WebSocket-based [`Transport`] that listens for incoming connections.
pub struct WebSocketTransport {
    listener: TcpListener,
    max_line_len: usize,
    handshake_timeout: Duration,
    ready_tx: mpsc::Sender<WebSocketConnection>,
    ready_rx: mpsc::Receiver<WebSocketConnection>,
}

impl WebSocketTransport {
    /// Binds a new WebSocket transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::bind(addr, e))?;
        tracing::info!(addr, "WebSocket transport listening");
        let (ready_tx, ready_rx) = mpsc::channel(READY_QUEUE);
        Ok(Self {
            listener,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            ready_tx,
            ready_rx,
        })
    }

    /// Sets the longest inbound frame accepted. Longer frames are dropped.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }

    /// Sets how long a socket may take to complete the upgrade before it
    /// is dropped.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    fn spawn_handshake(&self, stream: TcpStream, peer: SocketAddr) {
        let ready = self.ready_tx.clone();
        let max_line_len = self.max_line_len;
        let limit = self.handshake_timeout;

        tokio::spawn(async move {
            let ws = match tokio::time::timeout(limit, tokio_tungstenite::accept_async(stream)).await {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    let err = TransportError::Handshake(format!("{peer}: {e}"));
                    tracing::debug!(error = %err, "dropping socket");
                    return;
                }
                Err(_) => {
                    let err = TransportError::Handshake(format!("{peer}: timed out after {limit:?}"));
                    tracing::debug!(error = %err, "dropping socket");
                    return;
                }
            };

            let id = ConnectionId::next();
            tracing::debug!(%id, %peer, "accepted WebSocket connection");

            let (sink, stream) = ws.split();
            let conn = WebSocketConnection {
                id,
                peer,
                max_line_len,
                sink: Mutex::new(sink),
                stream: Mutex::new(stream),
            };
            if ready.send(conn).await.is_err() {
                tracing::debug!(%id, "transport gone before connection was claimed");
            }
        });
    }
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        loop {
            let (stream, peer) = tokio::select! {
                Some(conn) = self.ready_rx.recv() => return Ok(conn),
                accepted = self.listener.accept() => accepted.map_err(TransportError::Accept)?,
            };
            self.spawn_handshake(stream, peer);
        }
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A single WebSocket connection, split so reads never block writes.
pub struct WebSocketConnection {
    id: ConnectionId,
    peer: SocketAddr,
    max_line_len: usize,
    sink: Mutex<SplitSink<WsStream, Message>>,
    stream: Mutex<SplitStream<WsStream>>,
}

impl Connection for WebSocketConnection {
    async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        self.sink
            .lock()
            .await
            .send(Message::text(line.to_owned()))
            .await
            .map_err(|e| TransportError::Send(io::Error::new(io::ErrorKind::BrokenPipe, e)))
    }

    async fn recv_line(&self) -> Result<Option<String>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            let text = match stream.next().await {
                Some(Ok(Message::Text(text))) => text.as_str().to_owned(),
                Some(Ok(Message::Binary(data))) => String::from_utf8(data.to_vec()).map_err(|e| {
                    TransportError::Receive(io::Error::new(io::ErrorKind::InvalidData, e))
                })?,
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // ping/pong/raw frame
                Some(Err(e)) => {
                    return Err(TransportError::Receive(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        e,
                    )));
                }
            };

            if text.len() > self.max_line_len {
                tracing::debug!(id = %self.id, max = self.max_line_len, "dropping over-long frame");
                continue;
            }
            return Ok(Some(text.trim_end_matches(['\r', '\n']).to_owned()));
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        SinkExt::close(&mut *self.sink.lock().await)
            .await
            .map_err(|e| TransportError::Send(io::Error::new(io::ErrorKind::BrokenPipe, e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}
