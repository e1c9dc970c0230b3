//! Skill activation, cooldowns and multi-tick skill effects.
//!
//! Each of the four unit archetypes carries one skill; firing a deck
//! slot casts the skill of whatever archetype occupies it. Cooldowns
//! are tracked per skill, not per slot, and are committed in full at
//! activation so a multi-tick effect can never re-trigger itself.

use serde::{Deserialize, Serialize};

use crate::battle::TICK_RATE;
use crate::catalog::UnitKind;
use crate::events::{DamageEvent, SkillCast, TickEvents};
use crate::factions::Faction;
use crate::map;
use crate::math::{Fixed, Vec2Fixed};
use crate::units::{Unit, UnitId};

/// Number of addressable skill slots. Each maps to the deck position
/// of the same index.
pub const SKILL_SLOT_COUNT: usize = 4;

/// Ticks the Charge speed buff lasts.
pub const CHARGE_DURATION_TICKS: u32 = 2 * TICK_RATE;

/// Barrage blast radius around the caster, in pixels.
pub const BARRAGE_RADIUS_PX: u32 = 100;

/// Airstrike blast radius around the map center, in pixels.
pub const AIRSTRIKE_RADIUS_PX: u32 = 150;

/// Number of strikes one Airstrike cast delivers.
pub const AIRSTRIKE_STRIKES: u32 = 5;

/// Ticks between consecutive Airstrike hits (400 ms at 20 Hz).
pub const AIRSTRIKE_INTERVAL_TICKS: u32 = 8;

/// The four castable skills, one per unit archetype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SkillKind {
    /// Doubles the speed of all living friendly Infantry for a short
    /// burst.
    Charge,
    /// Instant blast around the casting Armor unit.
    Barrage,
    /// Five timed strikes on the map center.
    Airstrike,
    /// Heals the most wounded friendly unit.
    Heal,
}

impl SkillKind {
    /// All skills in HUD slot order.
    pub const ALL: [Self; 4] = [Self::Charge, Self::Barrage, Self::Airstrike, Self::Heal];

    /// The skill carried by a unit archetype.
    #[must_use]
    pub const fn from_unit_kind(kind: UnitKind) -> Self {
        match kind {
            UnitKind::Infantry => Self::Charge,
            UnitKind::Armor => Self::Barrage,
            UnitKind::Air => Self::Airstrike,
            UnitKind::Specialist => Self::Heal,
        }
    }

    /// Full cooldown in ticks.
    #[must_use]
    pub const fn cooldown_ticks(self) -> u32 {
        match self {
            Self::Charge => 8 * TICK_RATE,
            Self::Barrage => 12 * TICK_RATE,
            Self::Airstrike => 15 * TICK_RATE,
            Self::Heal => 10 * TICK_RATE,
        }
    }

    /// Human-readable skill name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Charge => "Charge",
            Self::Barrage => "Barrage",
            Self::Airstrike => "Airstrike",
            Self::Heal => "Heal",
        }
    }

    const fn index(self) -> usize {
        match self {
            Self::Charge => 0,
            Self::Barrage => 1,
            Self::Airstrike => 2,
            Self::Heal => 3,
        }
    }
}

/// Pre-buff speed of one unit affected by Charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct SpeedRestore {
    unit: UnitId,
    #[serde(with = "crate::math::fixed_serde")]
    speed: Fixed,
}

/// A running Charge buff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ChargeState {
    remaining: u32,
    restore: Vec<SpeedRestore>,
}

/// A running Airstrike. Damage is snapshotted at cast, so the
/// caster's later death does not cancel remaining strikes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct AirstrikeState {
    caster: UnitId,
    faction: Faction,
    #[serde(with = "crate::math::fixed_serde")]
    damage: Fixed,
    strikes_left: u32,
    next_in: u32,
}

/// Cooldown tracking plus the running multi-tick effects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Skills {
    /// Remaining cooldown ticks, indexed by [`SkillKind`] slot order.
    cooldowns: [u32; 4],
    charge: Option<ChargeState>,
    airstrike: Option<AirstrikeState>,
}

impl Skills {
    /// Create the skill tracker with every skill ready.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a skill's cooldown has fully elapsed.
    #[must_use]
    pub fn is_ready(&self, kind: SkillKind) -> bool {
        self.cooldowns[kind.index()] == 0
    }

    /// Remaining cooldown ticks per skill, in [`SkillKind::ALL`]
    /// order.
    #[must_use]
    pub const fn cooldowns(&self) -> [u32; 4] {
        self.cooldowns
    }

    /// Remaining cooldown per skill as a fraction of the full
    /// cooldown, in [`SkillKind::ALL`] order. `0.0` is ready, `1.0`
    /// is just fired.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn ratios(&self) -> [f32; 4] {
        let mut out = [0.0; 4];
        for kind in SkillKind::ALL {
            let index = kind.index();
            out[index] = self.cooldowns[index] as f32 / kind.cooldown_ticks() as f32;
        }
        out
    }

    /// Cast the skill of the given living unit.
    ///
    /// Returns the skill that fired, or `None` when the caster is
    /// missing or dead or the skill is still cooling down. The
    /// cooldown is committed in full before any effect resolves.
    pub fn activate(
        &mut self,
        caster: UnitId,
        units: &mut [Unit],
        events: &mut TickEvents,
    ) -> Option<SkillKind> {
        let caster_unit = units.iter().find(|unit| unit.id == caster && unit.alive)?;
        let kind = SkillKind::from_unit_kind(caster_unit.kind);
        if !self.is_ready(kind) {
            return None;
        }

        let faction = caster_unit.faction;
        let attack = caster_unit.attack;
        let origin = caster_unit.position;

        self.cooldowns[kind.index()] = kind.cooldown_ticks();
        events.skills.push(SkillCast {
            kind,
            caster: faction,
        });

        match kind {
            SkillKind::Charge => self.cast_charge(faction, units),
            SkillKind::Barrage => Self::cast_barrage(caster, faction, attack, origin, units, events),
            SkillKind::Airstrike => self.cast_airstrike(caster, faction, attack, units, events),
            SkillKind::Heal => Self::cast_heal(faction, units),
        }
        Some(kind)
    }

    /// Advance cooldowns and running effects by one tick.
    pub fn tick(&mut self, units: &mut [Unit], events: &mut TickEvents) {
        for cooldown in &mut self.cooldowns {
            *cooldown = cooldown.saturating_sub(1);
        }

        if let Some(mut charge) = self.charge.take() {
            charge.remaining -= 1;
            if charge.remaining == 0 {
                for entry in &charge.restore {
                    if let Some(unit) = units.iter_mut().find(|unit| unit.id == entry.unit) {
                        unit.set_speed(entry.speed);
                    }
                }
            } else {
                self.charge = Some(charge);
            }
        }

        if let Some(mut strike) = self.airstrike.take() {
            strike.next_in -= 1;
            if strike.next_in == 0 {
                Self::airstrike_hit(&mut strike, units, events);
            }
            if strike.strikes_left > 0 {
                self.airstrike = Some(strike);
            }
        }
    }

    fn cast_charge(&mut self, faction: Faction, units: &mut [Unit]) {
        let mut restore = Vec::new();
        for unit in units.iter_mut().filter(|unit| {
            unit.alive && unit.faction == faction && unit.kind == UnitKind::Infantry
        }) {
            restore.push(SpeedRestore {
                unit: unit.id,
                speed: unit.speed,
            });
            let doubled = unit.speed * Fixed::from_num(2);
            unit.set_speed(doubled);
        }
        self.charge = Some(ChargeState {
            remaining: CHARGE_DURATION_TICKS,
            restore,
        });
    }

    fn cast_barrage(
        caster: UnitId,
        faction: Faction,
        attack: u32,
        origin: Vec2Fixed,
        units: &mut [Unit],
        events: &mut TickEvents,
    ) {
        let damage = Fixed::from_num(attack * 3);
        let radius_sq = Fixed::from_num(BARRAGE_RADIUS_PX * BARRAGE_RADIUS_PX);

        for unit in units
            .iter_mut()
            .filter(|unit| unit.alive && unit.faction != faction)
        {
            if unit.position.distance_squared(origin) > radius_sq {
                continue;
            }
            let dealt = unit.take_damage(damage);
            events.damage.push(DamageEvent::from_dealt(caster, unit.id, dealt));
            if !unit.alive {
                events.deaths.push(unit.id);
            }
        }
    }

    fn cast_airstrike(
        &mut self,
        caster: UnitId,
        faction: Faction,
        attack: u32,
        units: &mut [Unit],
        events: &mut TickEvents,
    ) {
        let damage = Fixed::from_num(attack * 3) / Fixed::from_num(2);
        let mut strike = AirstrikeState {
            caster,
            faction,
            damage,
            strikes_left: AIRSTRIKE_STRIKES,
            next_in: 0,
        };
        // First strike lands on the cast tick.
        Self::airstrike_hit(&mut strike, units, events);
        if strike.strikes_left > 0 {
            self.airstrike = Some(strike);
        }
    }

    fn airstrike_hit(strike: &mut AirstrikeState, units: &mut [Unit], events: &mut TickEvents) {
        let center = map::center();
        let radius_sq = Fixed::from_num(AIRSTRIKE_RADIUS_PX * AIRSTRIKE_RADIUS_PX);

        for unit in units
            .iter_mut()
            .filter(|unit| unit.alive && unit.faction != strike.faction)
        {
            if unit.position.distance_squared(center) > radius_sq {
                continue;
            }
            let dealt = unit.take_damage(strike.damage);
            events
                .damage
                .push(DamageEvent::from_dealt(strike.caster, unit.id, dealt));
            if !unit.alive {
                events.deaths.push(unit.id);
            }
        }

        strike.strikes_left -= 1;
        strike.next_in = AIRSTRIKE_INTERVAL_TICKS;
    }

    fn cast_heal(faction: Faction, units: &mut [Unit]) {
        let target = units
            .iter_mut()
            .filter(|unit| unit.alive && unit.faction == faction)
            .min_by(|a, b| a.hp_ratio().cmp(&b.hp_ratio()));
        if let Some(unit) = target {
            let amount = unit.max_hp / Fixed::from_num(2);
            unit.heal(amount);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::DeckEntry;
    use crate::map::vec2;

    fn unit(id: UnitId, faction: Faction, kind: UnitKind, position: Vec2Fixed) -> Unit {
        Unit::new(id, faction, DeckEntry::new(kind, 1), position).unwrap()
    }

    fn center_brawl() -> Vec<Unit> {
        vec![
            unit(1, Faction::Player, UnitKind::Infantry, vec2(180, 240)),
            unit(2, Faction::Player, UnitKind::Armor, vec2(195, 250)),
            unit(3, Faction::Player, UnitKind::Air, vec2(195, 400)),
            unit(4, Faction::Player, UnitKind::Specialist, vec2(210, 240)),
            unit(5, Faction::Enemy, UnitKind::Infantry, vec2(200, 230)),
            unit(6, Faction::Enemy, UnitKind::Armor, vec2(195, 220)),
        ]
    }

    #[test]
    fn test_activation_requires_living_caster() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        assert!(skills.activate(99, &mut units, &mut events).is_none());

        units[0].die();
        assert!(skills.activate(1, &mut units, &mut events).is_none());
        assert!(events.skills.is_empty());
    }

    #[test]
    fn test_cooldown_blocks_reactivation() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        assert_eq!(
            skills.activate(2, &mut units, &mut events),
            Some(SkillKind::Barrage)
        );
        assert!(skills.activate(2, &mut units, &mut events).is_none());
        assert_eq!(events.skills.len(), 1);

        for _ in 0..SkillKind::Barrage.cooldown_ticks() {
            skills.tick(&mut units, &mut events);
        }
        assert!(skills.is_ready(SkillKind::Barrage));
        assert_eq!(
            skills.activate(2, &mut units, &mut events),
            Some(SkillKind::Barrage)
        );
    }

    #[test]
    fn test_skills_cool_down_independently() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        skills.activate(2, &mut units, &mut events);
        assert!(!skills.is_ready(SkillKind::Barrage));
        assert!(skills.is_ready(SkillKind::Charge));
        assert!(skills.is_ready(SkillKind::Heal));

        let ratios = skills.ratios();
        assert!((ratios[1] - 1.0).abs() < f32::EPSILON);
        assert!(ratios[0].abs() < f32::EPSILON);
    }

    #[test]
    fn test_charge_doubles_then_restores_speed() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();
        let base_speed = units[0].speed;

        skills.activate(1, &mut units, &mut events);
        assert_eq!(units[0].speed, base_speed * Fixed::from_num(2));
        // Only friendly Infantry is buffed.
        assert_eq!(units[1].speed, Fixed::from_num(50));
        assert_eq!(units[4].speed, Fixed::from_num(80));

        for _ in 0..CHARGE_DURATION_TICKS {
            skills.tick(&mut units, &mut events);
        }
        assert_eq!(units[0].speed, base_speed);
    }

    #[test]
    fn test_barrage_hits_enemies_in_radius() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        // Move one enemy out of the blast.
        units[5].position = vec2(195, 40);
        let hp_near = units[4].hp;
        let hp_far = units[5].hp;

        skills.activate(2, &mut units, &mut events);
        assert!(units[4].hp < hp_near);
        assert_eq!(units[5].hp, hp_far);
        assert_eq!(events.damage.len(), 1);
        assert_eq!(events.damage[0].attacker, 2);
        assert_eq!(events.damage[0].target, 5);
    }

    #[test]
    fn test_airstrike_lands_five_spaced_strikes() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        // Both enemies sit inside the center blast radius.
        skills.activate(3, &mut units, &mut events);
        assert_eq!(events.damage.len(), 2, "first strike lands at cast");

        let mut strikes_seen = 1;
        for _ in 0..AIRSTRIKE_INTERVAL_TICKS * (AIRSTRIKE_STRIKES - 1) {
            let before = events.damage.len();
            skills.tick(&mut units, &mut events);
            if events.damage.len() > before {
                strikes_seen += 1;
            }
        }
        assert_eq!(strikes_seen, AIRSTRIKE_STRIKES);

        // No further strikes after the last one.
        let total = events.damage.len();
        for _ in 0..AIRSTRIKE_INTERVAL_TICKS * 2 {
            skills.tick(&mut units, &mut events);
        }
        assert_eq!(events.damage.len(), total);
    }

    #[test]
    fn test_airstrike_survives_caster_death() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        skills.activate(3, &mut units, &mut events);
        units[2].die();

        let before = events.damage.len();
        for _ in 0..AIRSTRIKE_INTERVAL_TICKS {
            skills.tick(&mut units, &mut events);
        }
        assert!(events.damage.len() > before);
    }

    #[test]
    fn test_airstrike_reevaluates_radius_per_strike() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        skills.activate(3, &mut units, &mut events);
        assert_eq!(events.damage.len(), 2);

        // Both enemies leave the blast radius before the second
        // strike.
        units[4].position = vec2(60, 40);
        units[5].position = vec2(330, 40);
        for _ in 0..AIRSTRIKE_INTERVAL_TICKS {
            skills.tick(&mut units, &mut events);
        }
        assert_eq!(events.damage.len(), 2);
    }

    #[test]
    fn test_heal_targets_most_wounded_friendly() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        units[0].take_damage(Fixed::from_num(60));
        units[1].take_damage(Fixed::from_num(20));
        let wounded_hp = units[0].hp;

        skills.activate(4, &mut units, &mut events);
        let expected = (wounded_hp + units[0].max_hp / Fixed::from_num(2)).min(units[0].max_hp);
        assert_eq!(units[0].hp, expected);
    }

    #[test]
    fn test_heal_ignores_enemies_and_dead() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        units[0].die();
        units[4].take_damage(Fixed::from_num(90));
        let enemy_hp = units[4].hp;

        skills.activate(4, &mut units, &mut events);
        assert_eq!(units[4].hp, enemy_hp);
        assert_eq!(units[0].hp, Fixed::ZERO);
    }

    #[test]
    fn test_skills_serialization_roundtrip() {
        let mut skills = Skills::new();
        let mut units = center_brawl();
        let mut events = TickEvents::default();

        skills.activate(1, &mut units, &mut events);
        skills.activate(3, &mut units, &mut events);
        skills.tick(&mut units, &mut events);

        let bytes = bincode::serialize(&skills).unwrap();
        let restored: Skills = bincode::deserialize(&bytes).unwrap();
        assert_eq!(skills, restored);
    }
}
