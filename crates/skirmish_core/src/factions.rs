//! Faction definitions and identifiers.

use serde::{Deserialize, Serialize};

/// One of the two sides in a battle.
///
/// The player side attacks in attack mode and defends in defense mode;
/// the enemy side is always AI-driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Faction {
    /// The player-controlled roster.
    Player,
    /// The fixed opposing roster.
    Enemy,
}

impl Faction {
    /// Get the opposing faction.
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::Player => Self::Enemy,
            Self::Enemy => Self::Player,
        }
    }

    /// Get the display name for this faction.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Player => "Player",
            Self::Enemy => "Enemy",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opponent_is_involutive() {
        assert_eq!(Faction::Player.opponent(), Faction::Enemy);
        assert_eq!(Faction::Enemy.opponent(), Faction::Player);
        assert_eq!(Faction::Player.opponent().opponent(), Faction::Player);
    }
}
