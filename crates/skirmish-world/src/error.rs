//! Error types for the world layer.

/// Reasons a world operation was refused.
///
/// None of these are faults: each maps to a fixed line the router sends
/// back, and the state is left untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorldError {
    /// HEAL/DEFEND (or a strike) from a player who is not fighting.
    #[error("player is not in battle")]
    NotInBattle,

    /// The player tried to start a fight while already in one.
    #[error("player is already in battle")]
    AlreadyInBattle,

    /// A combat action from the player who does not hold the turn.
    #[error("not your turn, waiting for {0}")]
    NotYourTurn(String),

    /// The recorded opponent is gone or no longer paired back.
    #[error("opponent {0} is no longer in battle")]
    OpponentGone(String),

    /// A player tried to attack themselves.
    #[error("cannot attack yourself")]
    SelfTarget,

    /// The target is in a different location.
    #[error("target {0} is not in range")]
    NotInRange(String),

    /// The target is already fighting someone.
    #[error("target {0} is already in battle")]
    TargetInBattle(String),

    /// The target has no health left.
    #[error("target {0} is dead")]
    TargetDead(String),

    /// GO named an unknown location or the current one.
    #[error("invalid location or already there: {0}")]
    InvalidLocation(String),

    /// The configured location list is unusable.
    #[error("invalid location list: {0}")]
    InvalidLocations(String),
}
