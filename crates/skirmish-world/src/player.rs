//! Player state: stats, experience, location and combat flags.

use crate::Locations;

// ---------------------------------------------------------------------------
// Level-1 baseline and progression constants
// ---------------------------------------------------------------------------

/// Maximum (and starting) health at level 1.
pub const BASE_MAX_HEALTH: u32 = 30;
/// Attack power at level 1.
pub const BASE_ATTACK: u32 = 15;
/// Defense power at level 1.
pub const BASE_DEFENSE: u32 = 5;
/// Experience needed to go from level 1 to level 2.
pub const BASE_EXPERIENCE_TO_LEVEL: f64 = 100.0;
/// Multiplier applied to the experience threshold on every level-up.
pub const EXPERIENCE_GROWTH: f64 = 1.1;
/// Share of max health restored by HEAL, in percent.
pub const HEAL_PERCENT: u32 = 20;

const LEVEL_UP_HEALTH: u32 = 5;
const LEVEL_UP_ATTACK: u32 = 2;
const LEVEL_UP_DEFENSE: u32 = 1;

// ---------------------------------------------------------------------------
// CombatState
// ---------------------------------------------------------------------------

/// Whether a player is fighting, and if so whom.
///
/// ```text
///            engage                         defender dies
///   Idle ───────────→ Engaged { .. } ───────────────────────→ Idle
/// ```
///
/// The opponent is stored by username, never by reference. It is resolved
/// through the registry each time it is needed, so a player who disconnects
/// mid-fight simply stops resolving.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CombatState {
    /// Not fighting. An idle player is always free to act.
    Idle,

    /// Paired with `opponent`. Exactly one side of a pair has `has_turn`.
    Engaged { opponent: String, has_turn: bool },
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// One registered user.
///
/// Created at the spawn location with level-1 stats when a connection
/// registers and dropped when it disconnects. Fields are only changed
/// through the methods here and the [`combat`](crate::combat) functions, which
/// keep `0 <= health <= max_health` and the combat pairing consistent.
#[derive(Debug, Clone)]
pub struct Player {
    pub(crate) username: String,
    pub(crate) location: String,
    pub(crate) level: u32,
    pub(crate) max_health: u32,
    pub(crate) health: u32,
    pub(crate) attack: u32,
    pub(crate) defense: u32,
    pub(crate) total_experience: f64,
    pub(crate) remaining_experience: f64,
    pub(crate) experience_required: f64,
    pub(crate) defending: bool,
    pub(crate) combat: CombatState,
}

impl Player {
    /// Creates a level-1 player at the spawn location.
    pub fn new(username: impl Into<String>, locations: &Locations) -> Self {
        Self {
            username: username.into(),
            location: locations.spawn().to_owned(),
            level: 1,
            max_health: BASE_MAX_HEALTH,
            health: BASE_MAX_HEALTH,
            attack: BASE_ATTACK,
            defense: BASE_DEFENSE,
            total_experience: 0.0,
            remaining_experience: BASE_EXPERIENCE_TO_LEVEL,
            experience_required: BASE_EXPERIENCE_TO_LEVEL,
            defending: false,
            combat: CombatState::Idle,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn health(&self) -> u32 {
        self.health
    }

    pub fn max_health(&self) -> u32 {
        self.max_health
    }

    pub fn attack_power(&self) -> u32 {
        self.attack
    }

    pub fn defense_power(&self) -> u32 {
        self.defense
    }

    pub fn total_experience(&self) -> f64 {
        self.total_experience
    }

    /// Experience still needed for the next level.
    pub fn remaining_experience(&self) -> f64 {
        self.remaining_experience
    }

    /// Size of the current level's experience threshold.
    pub fn experience_required(&self) -> f64 {
        self.experience_required
    }

    /// `true` until the next incoming attack is resolved.
    pub fn is_defending(&self) -> bool {
        self.defending
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn combat(&self) -> &CombatState {
        &self.combat
    }

    pub fn in_fight(&self) -> bool {
        matches!(self.combat, CombatState::Engaged { .. })
    }

    /// Whether this player may act next. Idle players always may.
    pub fn has_turn(&self) -> bool {
        match self.combat {
            CombatState::Idle => true,
            CombatState::Engaged { has_turn, .. } => has_turn,
        }
    }

    /// Username of the current opponent, if fighting.
    pub fn opponent(&self) -> Option<&str> {
        match &self.combat {
            CombatState::Idle => None,
            CombatState::Engaged { opponent, .. } => Some(opponent),
        }
    }

    /// Returns `true` if `other` is this player's opponent and names this
    /// player back.
    pub fn is_paired_with(&self, other: &Player) -> bool {
        self.opponent() == Some(other.username()) && other.opponent() == Some(self.username())
    }

    /// Drops out of a fight whose opponent has vanished.
    ///
    /// Returns the old opponent's name, or `None` if the player was idle.
    /// Health is restored as it would be at the end of any fight.
    pub fn abandon_fight(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.combat, CombatState::Idle) {
            CombatState::Idle => None,
            CombatState::Engaged { opponent, .. } => {
                self.defending = false;
                self.full_heal();
                Some(opponent)
            }
        }
    }

    /// Resolves one incoming hit and returns the damage dealt.
    ///
    /// `damage = max(0, attack - defense)`, halved (rounding down) when
    /// defending. The stance is spent either way. Health bottoms out at 0.
    pub(crate) fn take_hit(&mut self, attack_power: u32) -> u32 {
        let mut damage = attack_power.saturating_sub(self.defense);
        if self.defending {
            damage /= 2;
        }
        self.defending = false;
        self.health = self.health.saturating_sub(damage);
        damage
    }

    /// Restores `HEAL_PERCENT` of max health (rounded down), capped at max.
    ///
    /// Returns the nominal amount, even if the cap swallowed some of it.
    pub(crate) fn heal(&mut self) -> u32 {
        let amount = self.max_health * HEAL_PERCENT / 100;
        self.health = (self.health + amount).min(self.max_health);
        amount
    }

    pub(crate) fn full_heal(&mut self) {
        self.health = self.max_health;
    }

    /// Awards experience for beating a player of `loser_level`.
    ///
    /// ```text
    /// gained = (L / W) * 10 * (1 + L * 0.1)
    /// ```
    ///
    /// where `L` is the loser's level and `W` this player's level before the
    /// award. Crossing the threshold levels up; a large award can carry over
    /// several levels, each one growing the threshold by
    /// [`EXPERIENCE_GROWTH`]. Returns the amount gained.
    pub(crate) fn award_experience(&mut self, loser_level: u32) -> f64 {
        let loser = f64::from(loser_level);
        let gained = (loser / f64::from(self.level)) * 10.0 * (1.0 + loser * 0.1);

        self.total_experience += gained;
        self.remaining_experience -= gained;

        while self.remaining_experience <= 0.0 {
            let excess = self.remaining_experience.abs();
            self.level_up();
            self.experience_required *= EXPERIENCE_GROWTH;
            self.remaining_experience = self.experience_required - excess;
        }

        gained
    }

    fn level_up(&mut self) {
        self.level += 1;
        self.max_health += LEVEL_UP_HEALTH;
        self.health = self.max_health;
        self.attack += LEVEL_UP_ATTACK;
        self.defense += LEVEL_UP_DEFENSE;
        tracing::info!(username = %self.username, level = self.level, "player levelled up");
    }
}
