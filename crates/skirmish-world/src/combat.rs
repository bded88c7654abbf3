//! The turn-based combat engine.
//!
//! Every function takes the acting player and the other side of the pair by
//! `&mut` and applies one complete transition. Callers hold whatever lock
//! covers both players for the whole call, so a turn check and the action
//! it guards can never interleave with the opponent's move.
//!
//! ```text
//!                 engage (opening strike)
//!   Idle ──────────────────────────────────→ InCombat
//!     ↑                                        │  strike / heal / defend
//!     │                                        │  (turn passes each time)
//!     └──────────── defender reaches 0 ────────┘
//! ```

use crate::{CombatState, Player, WorldError};

/// Result of a resolved attack.
#[derive(Debug, Clone, PartialEq)]
pub enum AttackOutcome {
    /// The defender survived; the turn passed to them.
    Hit { damage: u32, defender_health: u32 },

    /// The defender died. Both players are idle and back at full health.
    Defeated {
        damage: u32,
        experience_gained: f64,
        winner_level: u32,
    },
}

/// Result of a HEAL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealOutcome {
    /// Nominal amount restored (20% of max health, rounded down).
    pub amount: u32,
    /// Health after healing.
    pub health: u32,
}

/// Starts a fight: `attacker` challenges `defender` and strikes first.
///
/// Checks run in this order, each refusing without touching either player:
/// attacker already fighting, self-target, different location, defender
/// already fighting, defender dead.
///
/// # Errors
/// [`WorldError::AlreadyInBattle`], [`WorldError::SelfTarget`],
/// [`WorldError::NotInRange`], [`WorldError::TargetInBattle`],
/// [`WorldError::TargetDead`].
pub fn engage(attacker: &mut Player, defender: &mut Player) -> Result<AttackOutcome, WorldError> {
    if attacker.in_fight() {
        return Err(WorldError::AlreadyInBattle);
    }
    if attacker.username == defender.username {
        return Err(WorldError::SelfTarget);
    }
    if attacker.location != defender.location {
        return Err(WorldError::NotInRange(defender.username.clone()));
    }
    if defender.in_fight() {
        return Err(WorldError::TargetInBattle(defender.username.clone()));
    }
    if !defender.is_alive() {
        return Err(WorldError::TargetDead(defender.username.clone()));
    }

    attacker.combat = CombatState::Engaged {
        opponent: defender.username.clone(),
        has_turn: true,
    };
    defender.combat = CombatState::Engaged {
        opponent: attacker.username.clone(),
        has_turn: false,
    };
    tracing::info!(
        attacker = %attacker.username,
        defender = %defender.username,
        location = %attacker.location,
        "fight started"
    );

    Ok(resolve_attack(attacker, defender))
}

/// ATTACK from a player already in a fight.
///
/// # Errors
/// See [`ensure_turn`].
pub fn strike(attacker: &mut Player, defender: &mut Player) -> Result<AttackOutcome, WorldError> {
    ensure_turn(attacker, defender)?;
    Ok(resolve_attack(attacker, defender))
}

/// HEAL: restore 20% of max health (capped) and pass the turn.
///
/// # Errors
/// See [`ensure_turn`].
pub fn heal(actor: &mut Player, opponent: &mut Player) -> Result<HealOutcome, WorldError> {
    ensure_turn(actor, opponent)?;
    let amount = actor.heal();
    pass_turn(actor, opponent);
    Ok(HealOutcome {
        amount,
        health: actor.health,
    })
}

/// DEFEND: halve the next incoming attack and pass the turn.
///
/// The stance lasts until the next attack against this player resolves,
/// however many turns that takes.
///
/// # Errors
/// See [`ensure_turn`].
pub fn defend(actor: &mut Player, opponent: &mut Player) -> Result<(), WorldError> {
    ensure_turn(actor, opponent)?;
    actor.defending = true;
    pass_turn(actor, opponent);
    Ok(())
}

/// Checks that `actor` may spend a turn against `opponent` right now.
///
/// # Errors
/// - [`WorldError::NotInBattle`]: actor is idle or has no health
/// - [`WorldError::OpponentGone`]: `opponent` is not paired back with actor
/// - [`WorldError::NotYourTurn`]: the opponent holds the turn
pub fn ensure_turn(actor: &Player, opponent: &Player) -> Result<(), WorldError> {
    let Some(expected) = actor.opponent() else {
        return Err(WorldError::NotInBattle);
    };
    if !actor.is_alive() {
        return Err(WorldError::NotInBattle);
    }
    if !actor.is_paired_with(opponent) {
        return Err(WorldError::OpponentGone(expected.to_owned()));
    }
    if !actor.has_turn() {
        return Err(WorldError::NotYourTurn(opponent.username.clone()));
    }
    Ok(())
}

fn resolve_attack(attacker: &mut Player, defender: &mut Player) -> AttackOutcome {
    let damage = defender.take_hit(attacker.attack);

    if defender.is_alive() {
        pass_turn(attacker, defender);
        return AttackOutcome::Hit {
            damage,
            defender_health: defender.health,
        };
    }

    let experience_gained = attacker.award_experience(defender.level);
    // Respawn both. Neither stance carries into the next fight.
    for player in [&mut *attacker, &mut *defender] {
        player.combat = CombatState::Idle;
        player.defending = false;
        player.full_heal();
    }
    tracing::info!(
        winner = %attacker.username,
        loser = %defender.username,
        experience_gained,
        level = attacker.level,
        "fight ended"
    );

    AttackOutcome::Defeated {
        damage,
        experience_gained,
        winner_level: attacker.level,
    }
}

fn pass_turn(actor: &mut Player, opponent: &mut Player) {
    set_turn(actor, false);
    set_turn(opponent, true);
}

fn set_turn(player: &mut Player, turn: bool) {
    if let CombatState::Engaged { has_turn, .. } = &mut player.combat {
        *has_turn = turn;
    }
}
