//! Events emitted by the simulation for the presentation layer.
//!
//! The simulation itself never renders or plays sounds; instead every
//! tick returns a [`TickEvents`] batch describing what happened, and
//! the embedding layer turns those into effects. Events are transient
//! and never fed back into the simulation.

use serde::{Deserialize, Serialize};

use crate::commands::BattleMode;
use crate::factions::Faction;
use crate::math::{Fixed, Vec2Fixed};
use crate::skills::SkillKind;
use crate::units::UnitId;

/// One resolved attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageEvent {
    /// The unit dealing damage.
    pub attacker: UnitId,
    /// The unit receiving damage.
    pub target: UnitId,
    /// Hit points removed, rounded to the nearest whole point.
    pub damage: u32,
}

impl DamageEvent {
    /// Build an event from the fixed-point damage actually dealt,
    /// rounded to the nearest whole point.
    #[must_use]
    pub fn from_dealt(attacker: UnitId, target: UnitId, dealt: Fixed) -> Self {
        Self {
            attacker,
            target,
            damage: dealt.round().to_num::<u32>(),
        }
    }
}

/// A visual projectile left the attacker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectileLaunch {
    /// The firing unit.
    pub attacker: UnitId,
    /// Launch position.
    pub origin: Vec2Fixed,
    /// Destination captured at launch.
    pub target: Vec2Fixed,
}

/// A skill was cast this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkillCast {
    /// Which skill fired.
    pub kind: SkillKind,
    /// Faction that cast it.
    pub caster: Faction,
}

/// A capture point changed hands this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnershipChange {
    /// Index of the point, 0 to 2.
    pub point: u8,
    /// New owner, or `None` when the point fell back to neutral.
    pub owner: Option<Faction>,
}

/// Everything that happened during one simulation tick.
#[derive(Debug, Clone, Default)]
pub struct TickEvents {
    /// Damage resolved this tick.
    pub damage: Vec<DamageEvent>,
    /// Units that died this tick.
    pub deaths: Vec<UnitId>,
    /// Visual projectiles launched this tick.
    pub projectiles: Vec<ProjectileLaunch>,
    /// Skills cast this tick.
    pub skills: Vec<SkillCast>,
    /// Capture points that changed hands this tick.
    pub captures: Vec<OwnershipChange>,
    /// Periodic HUD refresh, emitted once per second.
    pub hud: Option<HudState>,
    /// Final result, emitted exactly once on the tick the battle
    /// ends.
    pub result: Option<BattleResult>,
}

/// Snapshot of the values the in-battle HUD displays.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HudState {
    /// Whole seconds remaining on the battle clock.
    pub time_left_secs: u32,
    /// Living player units.
    pub player_alive: u32,
    /// Living enemy units.
    pub enemy_alive: u32,
    /// Remaining cooldown per skill slot as a fraction of the full
    /// cooldown. `0.0` is ready, `1.0` is just fired.
    pub skill_cooldowns: [f32; 4],
}

/// How the battle ended for the player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BattleOutcome {
    /// The player met the objective.
    Victory,
    /// The player was wiped out or failed the objective.
    Defeat,
}

impl BattleOutcome {
    /// Whether this outcome is a player win.
    #[must_use]
    pub const fn is_victory(self) -> bool {
        matches!(self, Self::Victory)
    }
}

/// Final accounting of a finished battle. Produced exactly once and
/// never mutated afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleResult {
    /// Outcome from the player's perspective.
    pub outcome: BattleOutcome,
    /// Objective the battle was fought under.
    pub mode: BattleMode,
    /// Player units still alive at the end.
    pub survivors: u32,
    /// Whole seconds from battle start to the ending tick.
    pub elapsed_secs: u32,
    /// Resource payout.
    pub resource_reward: u32,
    /// Fame payout.
    pub fame_reward: u32,
}

impl BattleResult {
    /// Build a result, computing the reward payout.
    ///
    /// A victory pays `200 + survivors * 20` resource and
    /// `100 + survivors * 10` fame; a defeat pays a flat 50 and 10
    /// regardless of survivors.
    #[must_use]
    pub fn tally(
        outcome: BattleOutcome,
        mode: BattleMode,
        survivors: u32,
        elapsed_secs: u32,
    ) -> Self {
        let (resource_reward, fame_reward) = match outcome {
            BattleOutcome::Victory => (200 + survivors * 20, 100 + survivors * 10),
            BattleOutcome::Defeat => (50, 10),
        };
        Self {
            outcome,
            mode,
            survivors,
            elapsed_secs,
            resource_reward,
            fame_reward,
        }
    }
}
