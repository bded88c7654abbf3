//! Command routing: one parsed line in, state changes and outbound lines out.
//!
//! Everything here runs while the handler holds the registry lock, so it is
//! synchronous and never touches the network. Replies and broadcasts are
//! collected into an [`Outgoing`] batch that the handler flushes after the
//! lock is released.

use skirmish_protocol::{Command, text};
use skirmish_registry::{Outbox, Registry, RegistryError, broadcast};
use skirmish_transport::ConnectionId;
use skirmish_world::{AttackOutcome, HealOutcome, WorldError, combat};

/// The registered identity behind one connection.
#[derive(Debug, Clone)]
pub(crate) struct Session {
    pub(crate) username: String,
    pub(crate) conn_id: ConnectionId,
    pub(crate) outbox: Outbox,
}

/// What the connection loop should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Quit,
}

/// Lines waiting to be sent, in order.
#[derive(Debug, Default)]
pub(crate) struct Outgoing {
    batches: Vec<(Vec<Outbox>, String)>,
}

impl Outgoing {
    pub(crate) fn send(&mut self, to: &Outbox, line: impl Into<String>) {
        self.batches.push((vec![to.clone()], line.into()));
    }

    pub(crate) fn send_all(&mut self, to: Vec<Outbox>, line: impl Into<String>) {
        if !to.is_empty() {
            self.batches.push((to, line.into()));
        }
    }

    /// Hands every line to its recipients' writers.
    pub(crate) fn flush(self) {
        for (recipients, line) in self.batches {
            broadcast(&recipients, &line);
        }
    }
}

/// Applies one command from `session`'s player.
pub(crate) fn route(
    registry: &mut Registry,
    session: &Session,
    command: Command,
    out: &mut Outgoing,
) -> Flow {
    if command == Command::Quit {
        return Flow::Quit;
    }
    let Some(player) = registry.lookup(&session.username) else {
        tracing::warn!(username = %session.username, "command from unregistered player");
        return Flow::Quit;
    };

    if player.in_fight() {
        route_in_combat(registry, session, command, out);
    } else {
        route_idle(registry, session, command, out);
    }
    Flow::Continue
}

// ---------------------------------------------------------------------------
// In combat
// ---------------------------------------------------------------------------

fn route_in_combat(registry: &mut Registry, session: &Session, command: Command, out: &mut Outgoing) {
    match command {
        Command::Help => out.send(&session.outbox, text::BATTLE_HELP),
        action if action.is_combat_action() => combat_action(registry, session, &action, out),
        other => {
            tracing::debug!(username = %session.username, command = ?other, "ignored during combat");
        }
    }
}

/// A combat action that went through.
enum Resolved {
    Attack(AttackOutcome),
    Heal(HealOutcome),
    Defend,
}

fn combat_action(registry: &mut Registry, session: &Session, action: &Command, out: &mut Outgoing) {
    let me = session.username.as_str();
    let Some(player) = registry.lookup(me) else {
        return;
    };
    let Some(opponent) = player.opponent().map(str::to_owned) else {
        return;
    };
    if !player.has_turn() {
        out.send(&session.outbox, text::waiting_for(&opponent));
        return;
    }

    let result = registry.with_pair(me, &opponent, |actor, other| match action {
        Command::Heal => combat::heal(actor, other).map(Resolved::Heal),
        Command::Defend => combat::defend(actor, other).map(|()| Resolved::Defend),
        _ => combat::strike(actor, other).map(Resolved::Attack),
    });

    let resolved = match result {
        Ok(Ok(resolved)) => resolved,
        Ok(Err(WorldError::NotYourTurn(holder))) => {
            out.send(&session.outbox, text::waiting_for(&holder));
            return;
        }
        Ok(Err(WorldError::OpponentGone(_))) | Err(RegistryError::NotFound(_)) => {
            abandon(registry, session, &opponent, out);
            return;
        }
        Ok(Err(e)) => {
            tracing::debug!(username = me, error = %e, "combat action refused");
            return;
        }
        Err(e) => {
            tracing::warn!(username = me, error = %e, "combat pair lookup failed");
            return;
        }
    };

    match resolved {
        Resolved::Attack(outcome) => report_attack(registry, session, &opponent, outcome, out),
        Resolved::Heal(HealOutcome { amount, health }) => {
            if let Some(theirs) = registry.outbox(&opponent) {
                out.send(theirs, text::opponent_healed(me, amount, health));
            }
            out.send(&session.outbox, text::you_healed(amount));
        }
        Resolved::Defend => {
            if let Some(theirs) = registry.outbox(&opponent) {
                out.send(theirs, text::opponent_defends(me));
            }
            out.send(&session.outbox, text::YOU_DEFEND);
        }
    }
}

/// Tears down a fight whose opponent disconnected or was replaced.
fn abandon(registry: &mut Registry, session: &Session, opponent: &str, out: &mut Outgoing) {
    if let Some(player) = registry.lookup_mut(&session.username) {
        player.abandon_fight();
    }
    tracing::info!(username = %session.username, %opponent, "fight abandoned, opponent gone");
    out.send(&session.outbox, text::opponent_gone(opponent));
}

fn report_attack(
    registry: &Registry,
    session: &Session,
    defender: &str,
    outcome: AttackOutcome,
    out: &mut Outgoing,
) {
    let theirs = registry.outbox(defender);
    match outcome {
        AttackOutcome::Hit {
            damage,
            defender_health,
        } => {
            if let Some(theirs) = theirs {
                out.send(theirs, text::attacked_you(&session.username, damage, defender_health));
            }
            out.send(&session.outbox, text::you_attacked(defender, damage));
        }
        AttackOutcome::Defeated {
            experience_gained,
            winner_level,
            ..
        } => {
            if let Some(theirs) = theirs {
                out.send(theirs, text::YOU_DIED);
            }
            out.send(
                &session.outbox,
                text::victory(defender, experience_gained, winner_level),
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Idle
// ---------------------------------------------------------------------------

fn route_idle(registry: &mut Registry, session: &Session, command: Command, out: &mut Outgoing) {
    let reply = &session.outbox;
    match command {
        Command::Attack { target: None } => out.send(reply, text::ATTACK_USAGE),
        Command::Attack { target: Some(target) } => initiate(registry, session, &target, out),
        Command::Heal => out.send(reply, text::HEAL_OUTSIDE_BATTLE),
        Command::Defend => out.send(reply, text::DEFEND_OUTSIDE_BATTLE),
        Command::Look => look(registry, session, out),
        Command::Go { location: None } => out.send(reply, text::GO_USAGE),
        Command::Go { location: Some(target) } => go(registry, session, &target, out),
        Command::Say { message: None } => out.send(reply, text::SAY_USAGE),
        Command::Say { message: Some(message) } => say(registry, session, &message, out),
        Command::Stats => stats(registry, session, out),
        Command::Help => out.send(reply, text::idle_help(registry.locations().names())),
        Command::Quit => {}
        Command::Unknown(verb) => {
            tracing::debug!(username = %session.username, %verb, "unknown command ignored");
        }
    }
}

/// `ATTACK <name>` from an idle player.
fn initiate(registry: &mut Registry, session: &Session, target: &str, out: &mut Outgoing) {
    let me = session.username.as_str();
    if registry.lookup(target).is_none() {
        out.send(&session.outbox, text::TARGET_NOT_FOUND);
        return;
    }
    if target == me {
        out.send(&session.outbox, text::CANNOT_ATTACK_SELF);
        return;
    }

    match registry.with_pair(me, target, combat::engage) {
        Ok(Ok(outcome)) => report_attack(registry, session, target, outcome, out),
        Ok(Err(e)) => match refusal(&e) {
            Some(line) => out.send(&session.outbox, line),
            None => tracing::debug!(username = me, error = %e, "attack refused"),
        },
        Err(e) => tracing::warn!(username = me, error = %e, "attack target lookup failed"),
    }
}

/// The line a player sees when a fight cannot start.
fn refusal(error: &WorldError) -> Option<&'static str> {
    match error {
        WorldError::SelfTarget => Some(text::CANNOT_ATTACK_SELF),
        WorldError::NotInRange(_) => Some(text::TARGET_NOT_IN_RANGE),
        WorldError::TargetInBattle(_) => Some(text::TARGET_IN_BATTLE),
        WorldError::TargetDead(_) => Some(text::TARGET_DEAD),
        _ => None,
    }
}

fn look(registry: &Registry, session: &Session, out: &mut Outgoing) {
    let Some(player) = registry.lookup(&session.username) else {
        return;
    };
    let location = player.location();
    let here = registry.snapshot_in_location(location);
    out.send(&session.outbox, text::players_in(location, &here));
}

fn go(registry: &mut Registry, session: &Session, target: &str, out: &mut Outgoing) {
    match registry.relocate(&session.username, target) {
        Ok(from) => {
            let others = registry.snapshot_connections(Some(session.conn_id));
            out.send_all(others, text::moved(&session.username, &from, target));
            out.send(&session.outbox, text::you_entered(target));
        }
        Err(RegistryError::World(_)) => out.send(&session.outbox, text::INVALID_LOCATION),
        Err(e) => tracing::warn!(username = %session.username, error = %e, "move failed"),
    }
}

fn say(registry: &Registry, session: &Session, message: &str, out: &mut Outgoing) {
    let Some(player) = registry.lookup(&session.username) else {
        return;
    };
    let location = player.location();
    let listeners = registry.snapshot_connections_in_location(location, Some(session.conn_id));
    out.send_all(listeners, text::say(location, &session.username, message));
}

fn stats(registry: &Registry, session: &Session, out: &mut Outgoing) {
    let Some(p) = registry.lookup(&session.username) else {
        return;
    };
    out.send(
        &session.outbox,
        text::stats(
            p.level(),
            p.health(),
            p.max_health(),
            p.attack_power(),
            p.defense_power(),
            p.total_experience(),
            p.remaining_experience(),
        ),
    );
}
