//! Client commands.
//!
//! Every line after registration starts with a verb (the first
//! whitespace-delimited token, matched case-insensitively). Whatever follows
//! the verb, trimmed, is the argument. Taking the whole remainder rather
//! than the next token lets names with spaces (such as the `Player conn-7`
//! fallback) be targeted.

/// A parsed client line.
///
/// Arguments are `Option`s because a missing argument is a usage error the
/// router reports, not a parse failure. Parsing itself never fails: anything
/// unrecognised becomes [`Command::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `ATTACK [username]`: start a fight when idle, strike when in one.
    Attack { target: Option<String> },

    /// `HEAL`: restore some health (combat only).
    Heal,

    /// `DEFEND`: halve the next incoming hit (combat only).
    Defend,

    /// `LOOK`: list players in the current location.
    Look,

    /// `GO <location>`: move to another location.
    Go { location: Option<String> },

    /// `SAY <message>`: talk to everyone in the current location.
    Say { message: Option<String> },

    /// `STATS`: show level, health and experience.
    Stats,

    /// `HELP`: show the commands valid in the current state.
    Help,

    /// `QUIT`: close the connection.
    Quit,

    /// Any other verb, including an empty line. Carries the verb as typed.
    Unknown(String),
}

impl Command {
    /// Parses one inbound line.
    ///
    /// ```
    /// use skirmish_protocol::Command;
    ///
    /// assert_eq!(
    ///     Command::parse("attack Bob"),
    ///     Command::Attack { target: Some("Bob".into()) },
    /// );
    /// assert_eq!(Command::parse("GO"), Command::Go { location: None });
    /// ```
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_owned());

        match verb.to_ascii_uppercase().as_str() {
            "ATTACK" => Self::Attack { target: arg },
            "HEAL" => Self::Heal,
            "DEFEND" => Self::Defend,
            "LOOK" => Self::Look,
            "GO" => Self::Go { location: arg },
            "SAY" => Self::Say { message: arg },
            "STATS" => Self::Stats,
            "HELP" => Self::Help,
            "QUIT" => Self::Quit,
            _ => Self::Unknown(verb.to_owned()),
        }
    }

    /// Returns `true` for the three actions that spend a combat turn.
    pub fn is_combat_action(&self) -> bool {
        matches!(self, Self::Attack { .. } | Self::Heal | Self::Defend)
    }
}

/// Cleans up a registration line into a nickname.
///
/// Surrounding whitespace and control characters are removed. Returns `None`
/// when nothing usable is left, in which case the caller picks a fallback.
pub fn parse_nickname(line: &str) -> Option<String> {
    let name: String = line.chars().filter(|c| !c.is_control()).collect();
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attack_with_target() {
        assert_eq!(
            Command::parse("ATTACK Bob"),
            Command::Attack {
                target: Some("Bob".into())
            }
        );
    }

    #[test]
    fn test_parse_attack_without_target_keeps_none() {
        assert_eq!(Command::parse("ATTACK"), Command::Attack { target: None });
        assert_eq!(Command::parse("ATTACK    "), Command::Attack { target: None });
    }

    #[test]
    fn test_parse_argument_is_rest_of_line() {
        assert_eq!(
            Command::parse("ATTACK Player conn-7"),
            Command::Attack {
                target: Some("Player conn-7".into())
            }
        );
        assert_eq!(
            Command::parse("SAY  hello there  "),
            Command::Say {
                message: Some("hello there".into())
            }
        );
    }

    #[test]
    fn test_parse_verb_is_case_insensitive() {
        assert_eq!(Command::parse("look"), Command::Look);
        assert_eq!(Command::parse("Heal"), Command::Heal);
        assert_eq!(
            Command::parse("go Forest"),
            Command::Go {
                location: Some("Forest".into())
            }
        );
    }

    #[test]
    fn test_parse_argument_case_is_preserved() {
        assert_eq!(
            Command::parse("GO forest"),
            Command::Go {
                location: Some("forest".into())
            }
        );
    }

    #[test]
    fn test_parse_bare_verbs() {
        assert_eq!(Command::parse("DEFEND"), Command::Defend);
        assert_eq!(Command::parse("STATS"), Command::Stats);
        assert_eq!(Command::parse("HELP"), Command::Help);
        assert_eq!(Command::parse("QUIT"), Command::Quit);
    }

    #[test]
    fn test_parse_verb_must_be_whole_token() {
        assert_eq!(
            Command::parse("ATTACKBob"),
            Command::Unknown("ATTACKBob".into())
        );
    }

    #[test]
    fn test_parse_unknown_and_empty() {
        assert_eq!(Command::parse("DANCE now"), Command::Unknown("DANCE".into()));
        assert_eq!(Command::parse(""), Command::Unknown(String::new()));
        assert_eq!(Command::parse("   "), Command::Unknown(String::new()));
    }

    #[test]
    fn test_is_combat_action() {
        assert!(Command::parse("ATTACK").is_combat_action());
        assert!(Command::Heal.is_combat_action());
        assert!(Command::Defend.is_combat_action());
        assert!(!Command::Look.is_combat_action());
        assert!(!Command::Help.is_combat_action());
    }

    #[test]
    fn test_parse_nickname_trims_and_strips_controls() {
        assert_eq!(parse_nickname("  Bob \r"), Some("Bob".into()));
        assert_eq!(parse_nickname("B\u{7}ob"), Some("Bob".into()));
        assert_eq!(parse_nickname("Sir Bob"), Some("Sir Bob".into()));
    }

    #[test]
    fn test_parse_nickname_empty_returns_none() {
        assert_eq!(parse_nickname(""), None);
        assert_eq!(parse_nickname("  \t "), None);
    }
}
