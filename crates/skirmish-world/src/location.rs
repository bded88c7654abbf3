//! The fixed set of locations.

use serde::{Deserialize, Serialize};

use crate::{Player, WorldError};

/// The ordered list of places a player can be.
///
/// The first entry is where every new player spawns. The list is fixed for
/// the life of the server: it is built once from config and only read
/// afterwards, so a player's location is always one of these names.
///
/// Deserializes from a plain list of strings and validates on the way in,
/// so a bad config is rejected at load time:
///
/// ```
/// use skirmish_world::Locations;
///
/// let locations = Locations::new(["Tavern", "Forest"]).unwrap();
/// assert_eq!(locations.spawn(), "Tavern");
/// assert!(locations.contains("Forest"));
/// assert!(!locations.contains("forest"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Locations {
    names: Vec<String>,
}

impl Locations {
    /// Builds a location list.
    ///
    /// # Errors
    /// [`WorldError::InvalidLocations`] if the list is empty, a name is
    /// blank or contains whitespace, or a name appears twice.
    pub fn new<I, S>(names: I) -> Result<Self, WorldError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();

        if names.is_empty() {
            return Err(WorldError::InvalidLocations("at least one location is required".into()));
        }
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(WorldError::InvalidLocations(format!(
                    "location name {name:?} must be a single non-empty word"
                )));
            }
            if names[..i].contains(name) {
                return Err(WorldError::InvalidLocations(format!("duplicate location {name:?}")));
            }
        }

        Ok(Self { names })
    }

    /// The spawn location (first in the list).
    pub fn spawn(&self) -> &str {
        &self.names[0]
    }

    /// Returns `true` if `name` is a known location (exact match).
    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// All locations, in order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Moves a player to `target`, returning the location they left.
    ///
    /// # Errors
    /// [`WorldError::InvalidLocation`] if `target` is unknown or is where
    /// the player already is. The player is not moved.
    pub fn relocate(&self, player: &mut Player, target: &str) -> Result<String, WorldError> {
        if !self.contains(target) || player.location() == target {
            return Err(WorldError::InvalidLocation(target.to_owned()));
        }
        let from = std::mem::replace(&mut player.location, target.to_owned());
        tracing::debug!(username = player.username(), %from, to = target, "player moved");
        Ok(from)
    }
}

impl Default for Locations {
    fn default() -> Self {
        Self {
            names: vec!["Tavern".to_owned(), "Forest".to_owned()],
        }
    }
}

impl TryFrom<Vec<String>> for Locations {
    type Error = WorldError;

    fn try_from(names: Vec<String>) -> Result<Self, Self::Error> {
        Self::new(names)
    }
}

impl From<Locations> for Vec<String> {
    fn from(locations: Locations) -> Self {
        locations.names
    }
}
