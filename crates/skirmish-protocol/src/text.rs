//! Every line the server sends.
//!
//! Clients (and people) match on these exact strings. Fixed lines are
//! constants; lines with names or numbers in them are small builder
//! functions. Nothing here adds a line terminator; the transport does that.

// ---------------------------------------------------------------------------
// Fixed lines
// ---------------------------------------------------------------------------

/// Reply to `ATTACK` with no target while idle.
pub const ATTACK_USAGE: &str = "[SERVER] Usage: ATTACK <username>";

/// Reply to `GO` with no location.
pub const GO_USAGE: &str = "[SERVER] Usage: GO <location>";

/// Reply to `SAY` with nothing to say.
pub const SAY_USAGE: &str = "[SERVER] Usage: SAY <message>";

/// Reply to `GO` naming an unknown location or the current one.
pub const INVALID_LOCATION: &str = "[SERVER] Invalid location or already there.";

pub const TARGET_NOT_FOUND: &str = "Target player not found";
pub const TARGET_NOT_IN_RANGE: &str = "Target is not in range";
pub const TARGET_IN_BATTLE: &str = "Target is already in battle.";
pub const TARGET_DEAD: &str = "Target is dead.";
pub const CANNOT_ATTACK_SELF: &str = "You cannot attack yourself.";

pub const HEAL_OUTSIDE_BATTLE: &str = "You can only heal in battle.";
pub const DEFEND_OUTSIDE_BATTLE: &str = "You can only defend in battle.";

/// Sent to the loser of a fight.
pub const YOU_DIED: &str = "You have died";

/// Sent to a player who just raised their guard.
pub const YOU_DEFEND: &str = "You have entered a defensive stance";

/// Help shown while in a fight.
pub const BATTLE_HELP: &str = "\
*** Combat Commands ***
ATTACK: Inflict damage on your target.
HEAL: Restore some of your health (consumes a turn).
DEFEND: Enter a defensive stance to reduce incoming damage next turn (consumes a turn).";

/// Help shown outside a fight, followed by the location list.
///
/// Use [`idle_help`] to get the full block.
const IDLE_HELP_COMMANDS: &str = "\
*** Available Commands ***
ATTACK <username>: Start a fight with another player in your location.
LOOK: See all players currently in your location.
GO <location>: Move to a new location (e.g., GO Forest).
SAY <message>: Talk to everyone in your location.
STATS: Show your level, health and experience.
HELP: Show this list of commands.
QUIT: Disconnect from the server.
*** Available Locations ***";

// ---------------------------------------------------------------------------
// World / presence
// ---------------------------------------------------------------------------

/// Full idle help block: the command list, then one known location per line.
pub fn idle_help<S: AsRef<str>>(locations: &[S]) -> String {
    let mut out = String::from(IDLE_HELP_COMMANDS);
    for location in locations {
        out.push('\n');
        out.push_str(location.as_ref());
    }
    out
}

/// Told privately to a player whose requested name was already in use.
pub fn nickname_taken(requested: &str, assigned: &str) -> String {
    format!("[SERVER] Nickname '{requested}' is taken. You are now known as '{assigned}'.")
}

/// Broadcast when a player registers.
pub fn entered_world(username: &str, location: &str) -> String {
    format!("[SERVER] {username} has entered {location}.")
}

/// Broadcast when a player disconnects.
pub fn left_chat(username: &str) -> String {
    format!("[SERVER] {username} has left the chat.")
}

/// Broadcast when a player moves between locations.
pub fn moved(username: &str, from: &str, to: &str) -> String {
    format!("[SERVER] {username} has left {from} and entered {to}.")
}

/// Told to the player who moved.
pub fn you_entered(location: &str) -> String {
    format!("[SERVER] You have entered {location}")
}

/// Reply to `LOOK`.
pub fn players_in<S: AsRef<str>>(location: &str, usernames: &[S]) -> String {
    let names: Vec<&str> = usernames.iter().map(AsRef::as_ref).collect();
    format!("Players in {location}: {}", names.join(", "))
}

/// Chat line delivered to the rest of a location.
pub fn say(location: &str, username: &str, message: &str) -> String {
    format!("[{location}] {username}: {message}")
}

/// Reply to `STATS`.
pub fn stats(
    level: u32,
    health: u32,
    max_health: u32,
    attack: u32,
    defense: u32,
    total_experience: f64,
    remaining_experience: f64,
) -> String {
    format!(
        "Level {level} | Health {health}/{max_health} | Attack {attack} | Defense {defense} | \
         Experience {} ({} to next level)",
        experience(total_experience),
        experience(remaining_experience),
    )
}

// ---------------------------------------------------------------------------
// Combat
// ---------------------------------------------------------------------------

/// Told to a combatant who acts out of turn.
pub fn waiting_for(opponent: &str) -> String {
    format!("Waiting for {opponent}")
}

/// Told to the defender after a hit they survived.
pub fn attacked_you(attacker: &str, damage: u32, remaining_health: u32) -> String {
    format!("{attacker} has attacked you for {damage} dmg. Remaining health: {remaining_health}")
}

/// Told to the attacker after a hit the defender survived.
pub fn you_attacked(target: &str, damage: u32) -> String {
    format!("You have attacked {target} for {damage} dmg")
}

/// Told to the winner of a fight.
pub fn victory(loser: &str, gained: f64, level: u32) -> String {
    format!(
        "{loser} has died. You have gained {} experience. You are now level {level}",
        experience(gained)
    )
}

/// Told to the opponent of a player who healed.
pub fn opponent_healed(username: &str, amount: u32, health: u32) -> String {
    format!("{username} has healed for {amount} health. Their remaining health is now: {health}")
}

/// Told to the player who healed.
pub fn you_healed(amount: u32) -> String {
    format!("You have healed for {amount} health")
}

/// Told to the opponent of a player who defended.
pub fn opponent_defends(username: &str) -> String {
    format!("{username} has entered a defensive stance.")
}

/// Told to a combatant whose opponent is no longer around to fight.
pub fn opponent_gone(opponent: &str) -> String {
    format!("{opponent} is no longer in battle.")
}

/// Renders an experience amount with at most two decimals and no trailing
/// zeros, so `11.000000000000002` reads as `11` and `14.3` stays `14.3`.
fn experience(value: f64) -> String {
    let fixed = format!("{value:.2}");
    let trimmed = fixed.trim_end_matches('0').trim_end_matches('.');
    if trimmed == "-0" {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}
