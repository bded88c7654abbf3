//! Error types for the registry layer.

use skirmish_world::WorldError;

/// Errors from registry operations that name specific players.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// No player is registered under this name.
    #[error("player {0} is not registered")]
    NotFound(String),

    /// A pair operation was given the same name twice.
    #[error("player {0} cannot be paired with themselves")]
    SamePlayer(String),

    /// The player was found but the world refused the change.
    #[error(transparent)]
    World(#[from] WorldError),
}
