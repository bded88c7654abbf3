//! Unified error type for Skirmish.

use skirmish_transport::TransportError;

use crate::ConfigError;

/// Errors that stop a server from starting or running.
///
/// Refusals from the registry and the world never get this far: the router
/// turns them into reply lines for the player who caused them.
#[derive(Debug, thiserror::Error)]
pub enum SkirmishError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The configuration could not be read or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
