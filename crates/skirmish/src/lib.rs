//! # Skirmish
//!
//! A text-protocol multiplayer server. Players connect, pick a name, wander
//! between a handful of locations, talk, and fight each other in turn-based
//! one-on-one duels.
//!
//! This crate ties the layers together:
//!
//! ```text
//! transport → router (per connection) → registry ⇄ world (combat, players)
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use skirmish::prelude::*;
//!
//! # async fn start() -> Result<(), SkirmishError> {
//! let server = SkirmishServer::builder()
//!     .bind("0.0.0.0:65432")
//!     .build()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod router;
mod server;

pub mod logging;

pub use config::{ConfigError, ServerConfig};
pub use error::SkirmishError;
pub use server::{SkirmishServer, SkirmishServerBuilder};

/// Everything needed to configure and run a server.
pub mod prelude {
    pub use crate::{ConfigError, ServerConfig, SkirmishError, SkirmishServer, SkirmishServerBuilder};
    pub use skirmish_transport::{Connection, TcpTransport, Transport};
    #[cfg(feature = "websocket")]
    pub use skirmish_transport::WebSocketTransport;
    pub use skirmish_world::Locations;
}
