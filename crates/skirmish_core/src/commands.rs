//! Player-facing commands and group movement orders.
//!
//! Commands are coarse: the player starts the battle, fires skills,
//! swipes the whole roster toward a region and toggles the auto
//! controller. Individual units are never micromanaged; the auto
//! controller owns per-unit decisions.

use serde::{Deserialize, Serialize};

use crate::catalog::DeckEntry;
use crate::factions::Faction;
use crate::map::{self, vec2};
use crate::math::Vec2Fixed;
use crate::units::Unit;

/// Battle objective from the player's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleMode {
    /// Take the field: capture points start neutral and the player
    /// must take the majority or wipe the enemy.
    Attack,
    /// Hold the field: capture points start under player ownership
    /// and must not all be lost.
    Defense,
}

/// Coarse direction of a roster-wide movement swipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwipeDirection {
    /// Push toward the top of the map.
    Up,
    /// Fall back toward the bottom of the map.
    Down,
    /// Shift to the left flank.
    Left,
    /// Shift to the right flank.
    Right,
    /// Regroup on the center.
    Center,
}

impl SwipeDirection {
    /// Rally anchor the swipe converges the roster on.
    #[must_use]
    pub fn anchor(self) -> Vec2Fixed {
        match self {
            Self::Up => vec2(195, 80),
            Self::Down => vec2(195, 400),
            Self::Left => vec2(80, 240),
            Self::Right => vec2(310, 240),
            Self::Center => map::center(),
        }
    }
}

/// A command queued into the battle, applied at the start of the next
/// tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BattleCommand {
    /// Begin the battle with the given player deck.
    Start {
        /// Player deck, slot order.
        deck: [DeckEntry; 5],
        /// Battle objective.
        mode: BattleMode,
        /// Time limit in seconds. Must be at least 1.
        time_limit_secs: u32,
    },
    /// Fire the skill of the unit in the given skill slot (0 to 3).
    /// Slots map to the first four deck positions; the occupant's
    /// archetype selects which skill is cast.
    Skill {
        /// Skill slot index.
        slot: u8,
    },
    /// Swipe the whole roster toward a region.
    Swipe {
        /// Direction of the swipe.
        direction: SwipeDirection,
    },
    /// Enable or disable the player's auto controller.
    AutoToggle {
        /// New auto state.
        auto: bool,
    },
}

/// Order every living unit of a faction into formation around the
/// swipe anchor.
///
/// Units take formation slots in roster order. Attack targets are
/// kept so engaged units fire while repositioning. Returns the number
/// of units ordered.
pub fn issue_swipe(units: &mut [Unit], faction: Faction, direction: SwipeDirection) -> usize {
    let anchor = direction.anchor();
    let offsets = map::formation_offsets();

    let mut ordered = 0;
    for unit in units
        .iter_mut()
        .filter(|unit| unit.faction == faction && unit.alive)
    {
        let offset = offsets[ordered % offsets.len()];
        unit.move_to(anchor + offset);
        ordered += 1;
    }
    ordered
}
