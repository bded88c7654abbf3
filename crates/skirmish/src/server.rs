//! `SkirmishServer` builder and server loop.
//!
//! This is the entry point for running a server. It ties together all the
//! layers: transport → router → registry → world.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use skirmish_registry::Registry;
use skirmish_transport::{TcpTransport, Transport};
#[cfg(feature = "websocket")]
use skirmish_transport::WebSocketTransport;
use skirmish_world::Locations;
use tokio::sync::Mutex;

use crate::handler::handle_connection;
use crate::{ServerConfig, SkirmishError};

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The single
/// registry mutex serializes registration, lookups and every combat action.
pub(crate) struct ServerState {
    pub(crate) registry: Mutex<Registry>,
}

/// Builder for configuring and starting a server.
///
/// # Example
///
/// ```rust,no_run
/// use skirmish::prelude::*;
///
/// # async fn start() -> Result<(), Box<dyn std::error::Error>> {
/// let server = SkirmishServerBuilder::new()
///     .bind("0.0.0.0:65432")
///     .locations(Locations::new(["Tavern", "Forest", "Cave"])?)
///     .build()
///     .await?;
/// server.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct SkirmishServerBuilder {
    config: ServerConfig,
}

impl SkirmishServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_owned();
        self
    }

    /// Sets the known locations. The first is the spawn point.
    pub fn locations(mut self, locations: Locations) -> Self {
        self.config.locations = locations;
        self
    }

    /// Sets the longest inbound line accepted, in bytes.
    pub fn max_line_len(mut self, max_line_len: usize) -> Self {
        self.config.max_line_len = max_line_len;
        self
    }

    /// Replaces every setting with those from `config`.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Binds a TCP listener and builds the server.
    pub async fn build(self) -> Result<SkirmishServer<TcpTransport>, SkirmishError> {
        self.config.validate()?;
        let transport = TcpTransport::bind(&self.config.bind)
            .await?
            .with_max_line_len(self.config.max_line_len);
        Ok(self.with_transport(transport))
    }

    /// Binds a WebSocket listener and builds the server.
    #[cfg(feature = "websocket")]
    pub async fn build_websocket(self) -> Result<SkirmishServer<WebSocketTransport>, SkirmishError> {
        self.config.validate()?;
        let transport = WebSocketTransport::bind(&self.config.bind)
            .await?
            .with_max_line_len(self.config.max_line_len);
        Ok(self.with_transport(transport))
    }

    /// Builds the server on an already-bound transport.
    pub fn with_transport<T: Transport>(self, transport: T) -> SkirmishServer<T> {
        tracing::debug!(locations = ?self.config.locations.names(), "world ready");
        let state = Arc::new(ServerState {
            registry: Mutex::new(Registry::new(self.config.locations)),
        });
        SkirmishServer { transport, state }
    }
}

impl Default for SkirmishServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bound server, ready to accept players.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SkirmishServer<T: Transport = TcpTransport> {
    transport: T,
    state: Arc<ServerState>,
}

impl SkirmishServer {
    /// Creates a new builder.
    pub fn builder() -> SkirmishServerBuilder {
        SkirmishServerBuilder::new()
    }
}

impl<T: Transport> SkirmishServer<T> {
    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the accept loop until the process is terminated.
    pub async fn run(self) -> Result<(), SkirmishError> {
        self.run_until(std::future::pending()).await
    }

    /// Runs the accept loop until `shutdown` completes, then stops the
    /// transport. Connections already accepted keep running.
    pub async fn run_until(mut self, shutdown: impl Future<Output = ()>) -> Result<(), SkirmishError> {
        let addr = self.transport.local_addr().ok();
        tracing::info!(?addr, "Skirmish server running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = self.transport.accept() => match accepted {
                    Ok(conn) => {
                        let state = Arc::clone(&self.state);
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(conn, state).await {
                                tracing::debug!(error = %e, "connection ended with error");
                            }
                        });
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "accept failed");
                    }
                },
            }
        }

        tracing::info!("shutting down");
        self.transport.shutdown().await?;
        Ok(())
    }
}
