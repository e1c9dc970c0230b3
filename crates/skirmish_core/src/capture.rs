//! Capture points and their ownership state machine.
//!
//! Each point tracks an owner, a capture progress value and, while
//! neutral, which faction the partial progress belongs to. A point
//! held by one faction must be fought all the way down to neutral
//! before the other faction can begin turning it, so a flip through
//! enemy ownership always takes two full passes.

use serde::{Deserialize, Serialize};

use crate::battle::TICK_RATE;
use crate::events::OwnershipChange;
use crate::factions::Faction;
use crate::math::{Fixed, Vec2Fixed};

/// Radius in pixels within which a living unit contributes to
/// capture.
pub const CAPTURE_RADIUS_PX: u32 = 50;

/// Capture progress gained or decayed per second of sole presence.
pub const CAPTURE_RATE_PER_S: u32 = 20;

/// Progress at which a neutral point flips to the contender.
pub const MAX_PROGRESS: u32 = 100;

/// One capture point on the battlefield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapturePoint {
    /// Stable index of the point, 0 to 2.
    pub id: u8,
    /// Center position in pixels.
    pub position: Vec2Fixed,
    /// Current owner, or `None` while neutral.
    pub owner: Option<Faction>,
    /// While neutral, the faction the partial progress belongs to.
    /// `None` whenever progress is zero or the point is owned.
    pub contender: Option<Faction>,
    /// Capture progress toward [`MAX_PROGRESS`] while neutral, or
    /// remaining hold strength while owned.
    #[serde(with = "crate::math::fixed_serde")]
    pub progress: Fixed,
}

impl CapturePoint {
    /// Create a neutral point.
    #[must_use]
    pub fn new(id: u8, position: Vec2Fixed) -> Self {
        Self {
            id,
            position,
            owner: None,
            contender: None,
            progress: Fixed::ZERO,
        }
    }

    /// Create a point already held at full strength.
    #[must_use]
    pub fn owned_by(id: u8, position: Vec2Fixed, owner: Faction) -> Self {
        Self {
            id,
            position,
            owner: Some(owner),
            contender: None,
            progress: Fixed::from_num(MAX_PROGRESS),
        }
    }

    /// Whether a position is close enough to contribute to capture.
    #[must_use]
    pub fn in_capture_radius(&self, position: Vec2Fixed) -> bool {
        let radius_sq = Fixed::from_num(CAPTURE_RADIUS_PX * CAPTURE_RADIUS_PX);
        self.position.distance_squared(position) <= radius_sq
    }

    /// Advance the state machine one tick given the number of living
    /// units of each faction inside the capture radius.
    ///
    /// Returns the ownership change if the point flipped this tick.
    /// Progress is frozen while the point is contested or empty.
    pub fn update(&mut self, player_count: u32, enemy_count: u32) -> Option<OwnershipChange> {
        let sole = match (player_count > 0, enemy_count > 0) {
            (true, false) => Faction::Player,
            (false, true) => Faction::Enemy,
            _ => return None,
        };

        let rate = Fixed::from_num(CAPTURE_RATE_PER_S) / Fixed::from_num(TICK_RATE);
        let max = Fixed::from_num(MAX_PROGRESS);

        match self.owner {
            Some(owner) if owner == sole => None,
            Some(_) => {
                self.progress = (self.progress - rate).max(Fixed::ZERO);
                if self.progress > Fixed::ZERO {
                    return None;
                }
                self.owner = None;
                self.contender = None;
                Some(OwnershipChange {
                    point: self.id,
                    owner: None,
                })
            }
            None => {
                if self.contender.is_some_and(|c| c != sole) {
                    // Another faction's partial progress decays before
                    // the present faction can start its own.
                    self.progress = (self.progress - rate).max(Fixed::ZERO);
                    if self.progress <= Fixed::ZERO {
                        self.contender = None;
                    }
                    return None;
                }

                self.contender = Some(sole);
                self.progress = (self.progress + rate).min(max);
                if self.progress < max {
                    return None;
                }
                self.owner = Some(sole);
                self.contender = None;
                Some(OwnershipChange {
                    point: self.id,
                    owner: Some(sole),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::vec2;

    /// Ticks of sole presence needed to move progress by
    /// [`MAX_PROGRESS`].
    const FULL_PASS_TICKS: u32 = MAX_PROGRESS * TICK_RATE / CAPTURE_RATE_PER_S;

    fn neutral() -> CapturePoint {
        CapturePoint::new(0, vec2(100, 100))
    }

    #[test]
    fn test_sole_presence_captures_neutral_point() {
        let mut point = neutral();

        for tick in 0..FULL_PASS_TICKS - 1 {
            assert!(point.update(1, 0).is_none(), "flipped early at {tick}");
        }
        let change = point.update(1, 0).unwrap();
        assert_eq!(change.owner, Some(Faction::Player));
        assert_eq!(point.owner, Some(Faction::Player));
        assert_eq!(point.contender, None);
        assert_eq!(point.progress, Fixed::from_num(MAX_PROGRESS));
    }

    #[test]
    fn test_contested_point_is_frozen() {
        let mut point = neutral();
        point.update(1, 0);
        let progress = point.progress;

        for _ in 0..50 {
            assert!(point.update(2, 3).is_none());
        }
        assert_eq!(point.progress, progress);
    }

    #[test]
    fn test_empty_point_is_frozen() {
        let mut point = neutral();
        point.update(0, 1);
        let progress = point.progress;

        for _ in 0..50 {
            assert!(point.update(0, 0).is_none());
        }
        assert_eq!(point.progress, progress);
        assert_eq!(point.contender, Some(Faction::Enemy));
    }

    #[test]
    fn test_owned_point_decays_to_neutral_before_flipping() {
        let mut point = CapturePoint::owned_by(1, vec2(100, 100), Faction::Enemy);

        for tick in 0..FULL_PASS_TICKS - 1 {
            assert!(point.update(1, 0).is_none(), "neutralized early at {tick}");
            assert_eq!(point.owner, Some(Faction::Enemy));
        }
        let change = point.update(1, 0).unwrap();
        assert_eq!(change.owner, None);
        assert_eq!(point.owner, None);

        // Second full pass turns it.
        for _ in 0..FULL_PASS_TICKS - 1 {
            assert!(point.update(1, 0).is_none());
        }
        let change = point.update(1, 0).unwrap();
        assert_eq!(change.owner, Some(Faction::Player));
    }

    #[test]
    fn test_foreign_partial_progress_decays_first() {
        let mut point = neutral();
        for _ in 0..40 {
            point.update(1, 0);
        }
        assert_eq!(point.contender, Some(Faction::Player));

        // Enemy must erase the player's 40 progress before building
        // its own 100.
        let mut flip_tick = None;
        for tick in 0..200 {
            if let Some(change) = point.update(0, 1) {
                flip_tick = Some((tick, change));
                break;
            }
        }
        let (tick, change) = flip_tick.unwrap();
        assert_eq!(change.owner, Some(Faction::Enemy));
        assert_eq!(tick, 40 + FULL_PASS_TICKS - 1);
    }

    #[test]
    fn test_holder_presence_changes_nothing() {
        let mut point = CapturePoint::owned_by(2, vec2(100, 100), Faction::Player);
        for _ in 0..50 {
            assert!(point.update(3, 0).is_none());
        }
        assert_eq!(point.owner, Some(Faction::Player));
        assert_eq!(point.progress, Fixed::from_num(MAX_PROGRESS));
    }

    #[test]
    fn test_capture_radius() {
        let point = neutral();
        assert!(point.in_capture_radius(vec2(100, 150)));
        assert!(!point.in_capture_radius(vec2(100, 151)));
    }

    #[test]
    fn test_point_serialization_roundtrip() {
        let mut point = neutral();
        for _ in 0..17 {
            point.update(0, 1);
        }
        let bytes = bincode::serialize(&point).unwrap();
        let restored: CapturePoint = bincode::deserialize(&bytes).unwrap();
        assert_eq!(point, restored);
    }
}
