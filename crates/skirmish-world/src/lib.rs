//! World state for Skirmish.
//!
//! Everything here is plain data plus pure state transitions: no I/O, no
//! locks, no channels. The registry owns the players and the router decides
//! who hears about what; this crate only decides what happens.
//!
//! # Key types
//!
//! - [`Player`]: one connected user's stats, location and combat state
//! - [`Locations`]: the fixed, ordered list of places a player can be
//! - [`combat`]: engage / attack / heal / defend on a pair of players
//! - [`WorldError`]: every way a world operation can be refused

mod error;
mod location;
mod player;

pub mod combat;

pub use combat::{AttackOutcome, HealOutcome};
pub use error::WorldError;
pub use location::Locations;
pub use player::{CombatState, Player};
