//! Battle units: combat state, movement and damage resolution.
//!
//! A [`Unit`] is a flat struct rather than a component bundle; a
//! battle holds at most ten of them, so the simulation iterates the
//! roster directly. All mutating methods are no-ops on dead units so
//! systems never have to pre-filter.

use serde::{Deserialize, Serialize};

use crate::battle::TICK_RATE;
use crate::catalog::{DeckEntry, UnitKind};
use crate::error::Result;
use crate::factions::Faction;
use crate::math::{Fixed, Vec2Fixed};

/// Unique identifier for a unit within one battle.
pub type UnitId = u32;

/// Pixels per tile of attack range.
pub const RANGE_TILE_PX: u32 = 40;

/// Distance in pixels at which a moving unit considers its
/// destination reached.
pub const ARRIVAL_RADIUS_PX: u32 = 4;

/// Ticks between melee swings (1200 ms at 20 Hz).
pub const MELEE_INTERVAL_TICKS: u32 = 24;

/// Ticks between ranged shots (1800 ms at 20 Hz).
pub const RANGED_INTERVAL_TICKS: u32 = 36;

/// Ticks a dead unit lingers in the roster before being pruned.
pub const DEATH_LINGER_TICKS: u32 = 20;

/// One unit on the battlefield.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Battle-unique identifier.
    pub id: UnitId,
    /// Owning faction.
    pub faction: Faction,
    /// Archetype.
    pub kind: UnitKind,
    /// Tier the unit was fielded at.
    pub tier: u8,
    /// Current hit points.
    #[serde(with = "crate::math::fixed_serde")]
    pub hp: Fixed,
    /// Maximum hit points.
    #[serde(with = "crate::math::fixed_serde")]
    pub max_hp: Fixed,
    /// Raw damage per attack.
    pub attack: u32,
    /// Flat mitigation stat. Each 10 points absorb 1 damage.
    pub defense: u32,
    /// Movement speed in pixels per second. Skills may change it.
    #[serde(with = "crate::math::fixed_serde")]
    pub speed: Fixed,
    /// Attack range in tiles.
    pub range: u32,
    /// Current position in pixels.
    pub position: Vec2Fixed,
    /// Destination the unit is walking toward, if any.
    pub move_target: Option<Vec2Fixed>,
    /// Unit currently being attacked, if any.
    pub attack_target: Option<UnitId>,
    /// Ticks until the next attack is allowed.
    pub attack_cooldown: u32,
    /// Whether the unit is alive. Dead units take no further part.
    pub alive: bool,
    /// Ticks elapsed since death, for corpse pruning.
    pub dead_ticks: u32,
}

impl Unit {
    /// Instantiate a deck entry at a position, at full health.
    ///
    /// # Errors
    ///
    /// Returns [`BattleError::InvalidTier`](crate::error::BattleError::InvalidTier)
    /// if the entry's tier is out of range.
    pub fn new(id: UnitId, faction: Faction, entry: DeckEntry, position: Vec2Fixed) -> Result<Self> {
        let stats = entry.stats()?;
        Ok(Self {
            id,
            faction,
            kind: entry.kind,
            tier: entry.tier,
            hp: Fixed::from_num(stats.max_hp),
            max_hp: Fixed::from_num(stats.max_hp),
            attack: stats.attack,
            defense: stats.defense,
            speed: Fixed::from_num(stats.speed),
            range: stats.range,
            position,
            move_target: None,
            attack_target: None,
            attack_cooldown: 0,
            alive: true,
            dead_ticks: 0,
        })
    }

    /// Order the unit to walk toward a destination.
    pub fn move_to(&mut self, target: Vec2Fixed) {
        if self.alive {
            self.move_target = Some(target);
        }
    }

    /// Stop walking, keeping the current position.
    pub fn halt(&mut self) {
        self.move_target = None;
    }

    /// Set or clear the unit being attacked.
    pub fn set_attack_target(&mut self, target: Option<UnitId>) {
        if self.alive {
            self.attack_target = target;
        }
    }

    /// Apply incoming damage after mitigation, returning hit points
    /// actually removed.
    ///
    /// Mitigation subtracts one tenth of defense from the raw amount,
    /// but every hit removes at least one hit point. Reaching zero
    /// kills the unit.
    pub fn take_damage(&mut self, amount: Fixed) -> Fixed {
        if !self.alive {
            return Fixed::ZERO;
        }
        let mitigation = Fixed::from_num(self.defense) / Fixed::from_num(10);
        let mitigated = (amount - mitigation).max(Fixed::ONE);
        let actual = mitigated.min(self.hp);
        self.hp -= actual;
        if self.hp <= Fixed::ZERO {
            self.die();
        }
        actual
    }

    /// Restore hit points up to the maximum, returning the amount
    /// actually restored. Dead units cannot be healed.
    pub fn heal(&mut self, amount: Fixed) -> Fixed {
        if !self.alive {
            return Fixed::ZERO;
        }
        let headroom = self.max_hp - self.hp;
        let actual = amount.min(headroom);
        self.hp += actual;
        actual
    }

    /// Override movement speed. Used by timed skill effects.
    pub fn set_speed(&mut self, speed: Fixed) {
        self.speed = speed;
    }

    /// Kill the unit, clearing its orders. Idempotent.
    pub fn die(&mut self) {
        if !self.alive {
            return;
        }
        self.alive = false;
        self.hp = Fixed::ZERO;
        self.move_target = None;
        self.attack_target = None;
    }

    /// Advance one tick of movement toward the current destination.
    ///
    /// The per-tick step is `speed / TICK_RATE`. Arriving within
    /// [`ARRIVAL_RADIUS_PX`] of the destination clears it.
    pub fn advance_movement(&mut self) {
        if !self.alive {
            return;
        }
        let Some(target) = self.move_target else {
            return;
        };
        let step = self.speed / Fixed::from_num(TICK_RATE);
        let (next, snapped) = self.position.step_toward(target, step);
        self.position = next;
        let radius_sq = Fixed::from_num(ARRIVAL_RADIUS_PX * ARRIVAL_RADIUS_PX);
        if snapped || self.position.distance_squared(target) <= radius_sq {
            self.move_target = None;
        }
    }

    /// Count down the attack cooldown by one tick.
    pub fn tick_cooldown(&mut self) {
        self.attack_cooldown = self.attack_cooldown.saturating_sub(1);
    }

    /// Whether the unit may swing this tick.
    #[must_use]
    pub fn can_attack(&self) -> bool {
        self.alive && self.attack_cooldown == 0
    }

    /// Restart the attack cooldown after a swing.
    pub fn reset_attack_cooldown(&mut self) {
        self.attack_cooldown = self.attack_interval_ticks();
    }

    /// Whether the unit attacks at range (and launches projectiles).
    #[must_use]
    pub fn is_ranged(&self) -> bool {
        self.range > 1
    }

    /// Attack range converted to pixels.
    #[must_use]
    pub fn attack_range_px(&self) -> Fixed {
        Fixed::from_num(self.range * RANGE_TILE_PX)
    }

    /// Ticks between attacks for this unit's weapon class.
    #[must_use]
    pub fn attack_interval_ticks(&self) -> u32 {
        if self.is_ranged() {
            RANGED_INTERVAL_TICKS
        } else {
            MELEE_INTERVAL_TICKS
        }
    }

    /// Whether a point lies within this unit's attack range.
    #[must_use]
    pub fn in_attack_range(&self, point: Vec2Fixed) -> bool {
        let range = self.attack_range_px();
        self.position.distance_squared(point) <= range * range
    }

    /// Current hit points as a fraction of the maximum.
    #[must_use]
    pub fn hp_ratio(&self) -> Fixed {
        if self.max_hp <= Fixed::ZERO {
            Fixed::ZERO
        } else {
            self.hp / self.max_hp
        }
    }
}
