//! The shared player registry for Skirmish.
//!
//! This crate owns identity: who is connected, under which name, and how to
//! reach them. It sits between the transport (which produces connections)
//! and the world (which only knows about players):
//!
//! ```text
//! Server / router (above)  ← locks the registry, runs commands, fans out lines
//!     ↕
//! Registry (this crate)    ← username → (Player, Outbox)
//!     ↕
//! World (below)            ← Player, Locations, combat transitions
//! ```
//!
//! The [`Registry`] itself is a plain single-owner structure. The server
//! puts it behind one mutex, which serializes every registry operation and
//! every combat action against each other.

mod error;
mod outbox;
mod registry;

pub use error::RegistryError;
pub use outbox::{OUTBOX_CAPACITY, Outbox, broadcast};
pub use registry::{Registration, Registry};
