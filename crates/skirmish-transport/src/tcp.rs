//! Plain TCP transport with newline framing, built on `tokio-util` codecs.

use std::io;
use std::net::SocketAddr;

use bytes::BytesMut;
use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::codec::{Decoder, Encoder, FramedRead, FramedWrite, LinesCodec, LinesCodecError};

use crate::{Connection, ConnectionId, Transport, TransportError, DEFAULT_MAX_LINE_LEN};

/// A [`Transport`] that accepts raw TCP sockets speaking `\n`-terminated
/// UTF-8 lines (a trailing `\r` is tolerated and stripped).
pub struct TcpTransport {
    listener: TcpListener,
    max_line_len: usize,
}

impl TcpTransport {
    /// Binds a new TCP transport to the given address.
    pub async fn bind(addr: &str) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| TransportError::bind(addr, e))?;
        tracing::info!(addr, "TCP transport listening");
        Ok(Self {
            listener,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        })
    }

    /// Sets the longest inbound line accepted. Longer lines are dropped.
    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len.max(1);
        self
    }
}

impl Transport for TcpTransport {
    type Connection = TcpConnection;

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, peer) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::Accept)?;

        let id = ConnectionId::next();
        tracing::debug!(%id, %peer, "accepted TCP connection");

        let (read_half, write_half) = stream.into_split();
        Ok(TcpConnection {
            id,
            peer,
            reader: Mutex::new(FramedRead::new(
                read_half,
                LineCodec::new(self.max_line_len),
            )),
            writer: Mutex::new(FramedWrite::new(
                write_half,
                LineCodec::new(self.max_line_len),
            )),
        })
    }

    fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// A single TCP connection. Reads and writes lock separate halves.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    reader: Mutex<FramedRead<OwnedReadHalf, LineCodec>>,
    writer: Mutex<FramedWrite<OwnedWriteHalf, LineCodec>>,
}

impl Connection for TcpConnection {
    async fn send_line(&self, line: &str) -> Result<(), TransportError> {
        self.writer
            .lock()
            .await
            .send(line.to_owned())
            .await
            .map_err(|e| TransportError::Send(into_io(e)))
    }

    async fn recv_line(&self) -> Result<Option<String>, TransportError> {
        match self.reader.lock().await.next().await {
            Some(Ok(line)) => Ok(Some(line)),
            Some(Err(e)) => Err(TransportError::Receive(into_io(e))),
            None => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        let mut writer = self.writer.lock().await;
        SinkExt::close(&mut *writer)
            .await
            .map_err(|e| TransportError::Send(into_io(e)))
    }

    fn id(&self) -> ConnectionId {
        self.id
    }

    fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

/// `LinesCodec` that drops over-long lines instead of failing the stream.
///
/// A framed stream terminates after its decoder returns an error, so the
/// length error is swallowed here and the codec resumes at the next `\n`.
struct LineCodec {
    inner: LinesCodec,
    max_line_len: usize,
}

impl LineCodec {
    fn new(max_line_len: usize) -> Self {
        Self {
            inner: LinesCodec::new_with_max_length(max_line_len),
            max_line_len,
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = LinesCodecError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            match self.inner.decode(buf) {
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    tracing::debug!(max = self.max_line_len, "dropping over-long line");
                }
                other => return other,
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<String>, Self::Error> {
        loop {
            match self.inner.decode_eof(buf) {
                Err(LinesCodecError::MaxLineLengthExceeded) => {
                    tracing::debug!(max = self.max_line_len, "dropping over-long line");
                }
                other => return other,
            }
        }
    }
}

impl Encoder<String> for LineCodec {
    type Error = LinesCodecError;

    fn encode(&mut self, line: String, buf: &mut BytesMut) -> Result<(), Self::Error> {
        self.inner.encode(line, buf)
    }
}

fn into_io(e: LinesCodecError) -> io::Error {
    match e {
        LinesCodecError::Io(e) => e,
        LinesCodecError::MaxLineLengthExceeded => {
            io::Error::new(io::ErrorKind::InvalidData, "line too long")
        }
    }
}
