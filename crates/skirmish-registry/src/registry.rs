//! The registry: every connected player, by username.

use std::collections::HashMap;

use skirmish_transport::ConnectionId;
use skirmish_world::{Locations, Player};

use crate::{Outbox, RegistryError};

/// What a successful [`Registry::register`] produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    /// The name the player asked for.
    pub requested: String,
    /// The name they got. Differs from `requested` only on a collision.
    pub username: String,
    /// Where they spawned.
    pub location: String,
}

impl Registration {
    /// Returns `true` if the requested name was taken and a suffix was added.
    pub fn collided(&self) -> bool {
        self.requested != self.username
    }
}

/// One registered player and the way to reach them.
#[derive(Debug)]
struct Entry {
    player: Player,
    outbox: Outbox,
    /// Registration order, for stable listings.
    seq: u64,
}

/// Maps usernames to players and their connections.
///
/// ## Lifecycle of an entry
///
/// ```text
/// register() ──→ [registered] ──→ unregister()
///                   │    ↑
///                   ▼    │
///     lookup_mut() / with_pair() / relocate()
/// ```
///
/// Not thread-safe by itself: the server keeps exactly one of these behind
/// a mutex, so every method here runs with all other registry work excluded.
/// Nothing in this type awaits.
#[derive(Debug)]
pub struct Registry {
    locations: Locations,
    entries: HashMap<String, Entry>,
    next_seq: u64,
}

impl Registry {
    /// Creates an empty registry over a fixed set of locations.
    pub fn new(locations: Locations) -> Self {
        Self {
            locations,
            entries: HashMap::new(),
            next_seq: 0,
        }
    }

    /// The known locations.
    pub fn locations(&self) -> &Locations {
        &self.locations
    }

    /// Registers a new player under `desired`, or under `desired` plus the
    /// lowest numeric suffix (`1`, `2`, …) that is free.
    ///
    /// The player spawns at the first location with baseline stats.
    pub fn register(&mut self, desired: &str, outbox: Outbox) -> Registration {
        let mut username = desired.to_owned();
        let mut suffix = 1u64;
        while self.entries.contains_key(&username) {
            username = format!("{desired}{suffix}");
            suffix += 1;
        }

        let player = Player::new(username.clone(), &self.locations);
        let location = player.location().to_owned();
        let conn_id = outbox.conn_id();
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries.insert(
            username.clone(),
            Entry {
                player,
                outbox,
                seq,
            },
        );

        tracing::info!(%conn_id, %username, requested = desired, %location, "player registered");
        tracing::info!("[ACTIVE CONNECTIONS] {}", self.entries.len());

        Registration {
            requested: desired.to_owned(),
            username,
            location,
        }
    }

    /// Removes a player. Absent names are ignored.
    ///
    /// Returns the removed player so the caller can see what state they
    /// left in.
    pub fn unregister(&mut self, username: &str) -> Option<Player> {
        let entry = self.entries.remove(username)?;
        tracing::info!(
            conn_id = %entry.outbox.conn_id(),
            %username,
            in_fight = entry.player.in_fight(),
            "player unregistered"
        );
        tracing::info!("[ACTIVE CONNECTIONS] {}", self.entries.len());
        Some(entry.player)
    }

    /// Looks up a player by exact name.
    pub fn lookup(&self, username: &str) -> Option<&Player> {
        self.entries.get(username).map(|e| &e.player)
    }

    /// Looks up a player by exact name, mutably.
    pub fn lookup_mut(&mut self, username: &str) -> Option<&mut Player> {
        self.entries.get_mut(username).map(|e| &mut e.player)
    }

    /// The outbox of a registered player.
    pub fn outbox(&self, username: &str) -> Option<&Outbox> {
        self.entries.get(username).map(|e| &e.outbox)
    }

    /// Usernames at `location`, in registration order.
    pub fn snapshot_in_location(&self, location: &str) -> Vec<String> {
        self.ordered()
            .filter(|e| e.player.location() == location)
            .map(|e| e.player.username().to_owned())
            .collect()
    }

    /// Every connection except `exclude`, in registration order.
    pub fn snapshot_connections(&self, exclude: Option<ConnectionId>) -> Vec<Outbox> {
        self.ordered()
            .filter(|e| Some(e.outbox.conn_id()) != exclude)
            .map(|e| e.outbox.clone())
            .collect()
    }

    /// Connections of players at `location`, except `exclude`.
    pub fn snapshot_connections_in_location(
        &self,
        location: &str,
        exclude: Option<ConnectionId>,
    ) -> Vec<Outbox> {
        self.ordered()
            .filter(|e| e.player.location() == location)
            .filter(|e| Some(e.outbox.conn_id()) != exclude)
            .map(|e| e.outbox.clone())
            .collect()
    }

    /// Moves a player to `target`, returning where they came from.
    ///
    /// # Errors
    /// - [`RegistryError::NotFound`]: no such player
    /// - [`RegistryError::World`]: unknown location, or already there
    pub fn relocate(&mut self, username: &str, target: &str) -> Result<String, RegistryError> {
        let entry = self
            .entries
            .get_mut(username)
            .ok_or_else(|| RegistryError::NotFound(username.to_owned()))?;
        Ok(self.locations.relocate(&mut entry.player, target)?)
    }

    /// Runs `f` with mutable access to two different players at once.
    ///
    /// This is how combat touches both sides of a pair in one step. The
    /// first player is taken out of the map for the duration of the call
    /// and put back afterwards, so both borrows are disjoint.
    ///
    /// # Errors
    /// - [`RegistryError::SamePlayer`]: `first == second`
    /// - [`RegistryError::NotFound`]: either name is not registered
    pub fn with_pair<T>(
        &mut self,
        first: &str,
        second: &str,
        f: impl FnOnce(&mut Player, &mut Player) -> T,
    ) -> Result<T, RegistryError> {
        if first == second {
            return Err(RegistryError::SamePlayer(first.to_owned()));
        }
        if !self.entries.contains_key(second) {
            return Err(RegistryError::NotFound(second.to_owned()));
        }
        let (key, mut taken) = self
            .entries
            .remove_entry(first)
            .ok_or_else(|| RegistryError::NotFound(first.to_owned()))?;

        let result = match self.entries.get_mut(second) {
            Some(other) => Ok(f(&mut taken.player, &mut other.player)),
            None => Err(RegistryError::NotFound(second.to_owned())),
        };

        self.entries.insert(key, taken);
        result
    }

    /// Returns the number of registered players.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn ordered(&self) -> impl Iterator<Item = &Entry> {
        let mut entries: Vec<&Entry> = self.entries.values().collect();
        entries.sort_by_key(|e| e.seq);
        entries.into_iter()
    }
}

// =========================================================================
// Tests
// =========================================================================
