//! Autonomous per-unit decision making.
//!
//! Both factions run the same controller, parameterized only by the
//! faction it drives. Decisions follow a strict priority order per
//! unit: engage a foe already in range, otherwise advance on the best
//! capture point, otherwise pursue the nearest foe. The foe list is
//! snapshotted once per pass so every controlled unit decides against
//! the same view of the battlefield.

use serde::{Deserialize, Serialize};

use crate::capture::CapturePoint;
use crate::factions::Faction;
use crate::math::Vec2Fixed;
use crate::units::Unit;

/// Priority-driven controller for one faction's units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoAi {
    faction: Faction,
}

impl AutoAi {
    /// Create a controller for the given faction.
    #[must_use]
    pub const fn new(faction: Faction) -> Self {
        Self { faction }
    }

    /// Faction this controller drives.
    #[must_use]
    pub const fn faction(&self) -> Faction {
        self.faction
    }

    /// Issue orders to every living controlled unit for this tick.
    ///
    /// Priorities, first match wins:
    /// 1. a living foe within attack range: stop and target the
    ///    nearest one; the unit's cooldown gate fires the attack.
    /// 2. a capture point not owned by this faction: walk toward the
    ///    best one. Neutral points always outrank foe-owned points;
    ///    distance breaks ties within a class.
    /// 3. otherwise walk toward the nearest living foe.
    pub fn drive(&self, units: &mut [Unit], points: &[CapturePoint]) {
        let foes: Vec<(u32, Vec2Fixed)> = units
            .iter()
            .filter(|unit| unit.alive && unit.faction != self.faction)
            .map(|unit| (unit.id, unit.position))
            .collect();

        for index in 0..units.len() {
            if !units[index].alive || units[index].faction != self.faction {
                continue;
            }
            let position = units[index].position;
            let range = units[index].attack_range_px();
            let range_sq = range * range;

            let engaged = foes
                .iter()
                .filter(|(_, foe)| position.distance_squared(*foe) <= range_sq)
                .min_by_key(|(_, foe)| position.distance_squared(*foe))
                .map(|&(id, _)| id);
            if let Some(foe) = engaged {
                units[index].set_attack_target(Some(foe));
                units[index].halt();
                continue;
            }

            if let Some(goal) = Self::objective(position, self.faction, points) {
                units[index].set_attack_target(None);
                units[index].move_to(goal);
                continue;
            }

            let pursuit = foes
                .iter()
                .min_by_key(|(_, foe)| position.distance_squared(*foe))
                .map(|&(_, foe)| foe);
            if let Some(foe) = pursuit {
                units[index].set_attack_target(None);
                units[index].move_to(foe);
            }
        }
    }

    /// Best capture point for a unit at `position`, or `None` when
    /// every point is already held by this faction.
    fn objective(
        position: Vec2Fixed,
        faction: Faction,
        points: &[CapturePoint],
    ) -> Option<Vec2Fixed> {
        points
            .iter()
            .filter(|point| point.owner != Some(faction))
            .min_by_key(|point| {
                let class = u8::from(point.owner.is_some());
                (class, position.distance_squared(point.position))
            })
            .map(|point| point.position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{DeckEntry, UnitKind};
    use crate::map::vec2;
    use crate::units::UnitId;

    fn unit(id: UnitId, faction: Faction, kind: UnitKind, position: Vec2Fixed) -> Unit {
        Unit::new(id, faction, DeckEntry::new(kind, 1), position).unwrap()
    }

    fn neutral_points() -> [CapturePoint; 3] {
        let positions = crate::map::capture_point_positions();
        [
            CapturePoint::new(0, positions[0]),
            CapturePoint::new(1, positions[1]),
            CapturePoint::new(2, positions[2]),
        ]
    }

    #[test]
    fn test_engages_nearest_foe_in_range() {
        let ai = AutoAi::new(Faction::Player);
        let mut units = vec![
            unit(1, Faction::Player, UnitKind::Air, vec2(195, 240)),
            unit(2, Faction::Enemy, UnitKind::Infantry, vec2(195, 90)),
            unit(3, Faction::Enemy, UnitKind::Infantry, vec2(195, 140)),
        ];
        units[0].move_to(vec2(0, 0));

        ai.drive(&mut units, &neutral_points());

        // Air range is 200 px; both foes qualify, the closer one wins
        // and movement stops.
        assert_eq!(units[0].attack_target, Some(3));
        assert!(units[0].move_target.is_none());
    }

    #[test]
    fn test_out_of_range_foes_are_not_engaged() {
        let ai = AutoAi::new(Faction::Player);
        let mut units = vec![
            unit(1, Faction::Player, UnitKind::Infantry, vec2(195, 440)),
            unit(2, Faction::Enemy, UnitKind::Infantry, vec2(195, 40)),
        ];

        ai.drive(&mut units, &neutral_points());
        assert_eq!(units[0].attack_target, None);
        assert!(units[0].move_target.is_some());
    }

    #[test]
    fn test_advances_on_nearest_neutral_point() {
        let ai = AutoAi::new(Faction::Player);
        let points = neutral_points();
        let mut units = vec![unit(1, Faction::Player, UnitKind::Infantry, vec2(280, 440))];

        ai.drive(&mut units, &points);
        assert_eq!(units[0].move_target, Some(points[2].position));
    }

    #[test]
    fn test_neutral_point_outranks_closer_enemy_point() {
        let ai = AutoAi::new(Faction::Player);
        let positions = crate::map::capture_point_positions();
        let points = [
            CapturePoint::new(0, positions[0]),
            CapturePoint::owned_by(1, positions[1], Faction::Enemy),
            CapturePoint::owned_by(2, positions[2], Faction::Enemy),
        ];
        // The unit stands right next to the enemy-held bottom point;
        // the neutral top point still wins.
        let mut units = vec![unit(1, Faction::Player, UnitKind::Infantry, vec2(290, 430))];

        ai.drive(&mut units, &points);
        assert_eq!(units[0].move_target, Some(positions[0]));
    }

    #[test]
    fn test_own_points_are_not_objectives() {
        let ai = AutoAi::new(Faction::Player);
        let positions = crate::map::capture_point_positions();
        let points = [
            CapturePoint::owned_by(0, positions[0], Faction::Player),
            CapturePoint::owned_by(1, positions[1], Faction::Player),
            CapturePoint::owned_by(2, positions[2], Faction::Enemy),
        ];
        let mut units = vec![unit(1, Faction::Player, UnitKind::Infantry, vec2(100, 110))];

        ai.drive(&mut units, &points);
        assert_eq!(units[0].move_target, Some(positions[2]));
    }

    #[test]
    fn test_pursues_when_every_point_is_held() {
        let ai = AutoAi::new(Faction::Player);
        let positions = crate::map::capture_point_positions();
        let points = [
            CapturePoint::owned_by(0, positions[0], Faction::Player),
            CapturePoint::owned_by(1, positions[1], Faction::Player),
            CapturePoint::owned_by(2, positions[2], Faction::Player),
        ];
        let mut units = vec![
            unit(1, Faction::Player, UnitKind::Infantry, vec2(195, 440)),
            unit(2, Faction::Enemy, UnitKind::Infantry, vec2(65, 40)),
            unit(3, Faction::Enemy, UnitKind::Infantry, vec2(195, 40)),
        ];

        ai.drive(&mut units, &points);
        assert_eq!(units[0].move_target, Some(vec2(195, 40)));
        assert_eq!(units[0].attack_target, None);
    }

    #[test]
    fn test_leaving_range_releases_the_target() {
        let ai = AutoAi::new(Faction::Player);
        let mut units = vec![
            unit(1, Faction::Player, UnitKind::Infantry, vec2(195, 440)),
            unit(2, Faction::Enemy, UnitKind::Infantry, vec2(195, 40)),
        ];
        units[0].set_attack_target(Some(2));

        ai.drive(&mut units, &neutral_points());
        assert_eq!(units[0].attack_target, None);
    }

    #[test]
    fn test_only_drives_own_living_units() {
        let ai = AutoAi::new(Faction::Player);
        let mut units = vec![
            unit(1, Faction::Player, UnitKind::Infantry, vec2(195, 440)),
            unit(2, Faction::Enemy, UnitKind::Infantry, vec2(195, 40)),
        ];
        units[0].die();

        ai.drive(&mut units, &neutral_points());
        assert!(units[0].move_target.is_none());
        assert!(units[1].move_target.is_none());
    }

    #[test]
    fn test_both_factions_use_symmetric_logic() {
        let player_ai = AutoAi::new(Faction::Player);
        let enemy_ai = AutoAi::new(Faction::Enemy);
        let points = neutral_points();

        // Start positions mirrored through the map center.
        let mut units = vec![
            unit(1, Faction::Player, UnitKind::Infantry, vec2(100, 440)),
            unit(2, Faction::Enemy, UnitKind::Infantry, vec2(290, 40)),
        ];
        player_ai.drive(&mut units, &points);
        enemy_ai.drive(&mut units, &points);

        // The capture points are themselves mirrored through the
        // center, so each side picks the mirrored objective.
        assert_eq!(units[0].move_target, Some(points[2].position));
        assert_eq!(units[1].move_target, Some(points[0].position));
    }
}
