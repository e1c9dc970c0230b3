//! Visual projectile pool.
//!
//! Ranged combat resolves damage at the moment of attack; projectiles
//! exist only as deterministic visual tokens flying from attacker to
//! target. The pool is fixed-capacity and never allocates after
//! construction. When every slot is busy the visual is silently
//! dropped, which never affects combat results.

use serde::{Deserialize, Serialize};

use crate::battle::TICK_RATE;
use crate::map;
use crate::math::{Fixed, Vec2Fixed};
use crate::units::UnitId;

/// Number of projectile slots in the pool.
pub const POOL_CAPACITY: usize = 20;

/// Projectile travel speed in pixels per second.
pub const PROJECTILE_SPEED_PX_PER_S: u32 = 320;

/// Radius in pixels around the destination at which a projectile
/// expires.
pub const HIT_RADIUS_PX: u32 = 12;

/// One slot of the projectile pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Unit that fired this projectile.
    pub source: UnitId,
    /// Current position in pixels.
    pub position: Vec2Fixed,
    /// Position the projectile is traveling toward, captured at
    /// launch.
    pub destination: Vec2Fixed,
    /// Whether the slot is in flight.
    pub active: bool,
}

impl Projectile {
    const INACTIVE: Self = Self {
        source: 0,
        position: Vec2Fixed::ZERO,
        destination: Vec2Fixed::ZERO,
        active: false,
    };
}

/// Fixed-capacity pool of visual projectiles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectilePool {
    slots: [Projectile; POOL_CAPACITY],
}

impl ProjectilePool {
    /// Create a pool with every slot free.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: [Projectile::INACTIVE; POOL_CAPACITY],
        }
    }

    /// Claim the first free slot.
    fn acquire(&mut self) -> Option<&mut Projectile> {
        self.slots.iter_mut().find(|slot| !slot.active)
    }

    /// Launch a projectile from `origin` toward `destination`.
    ///
    /// Returns `false` when the pool is exhausted and the visual was
    /// dropped.
    pub fn fire(&mut self, source: UnitId, origin: Vec2Fixed, destination: Vec2Fixed) -> bool {
        let Some(slot) = self.acquire() else {
            return false;
        };
        *slot = Projectile {
            source,
            position: origin,
            destination,
            active: true,
        };
        true
    }

    /// Free a slot by index. Idempotent; out-of-range indices are
    /// ignored.
    pub fn release(&mut self, index: usize) {
        if let Some(slot) = self.slots.get_mut(index) {
            slot.active = false;
        }
    }

    /// Advance every active projectile one tick.
    ///
    /// A projectile retires itself on arriving within
    /// [`HIT_RADIUS_PX`] of its destination or on leaving the map
    /// rectangle plus margin.
    pub fn step(&mut self) {
        let step = Fixed::from_num(PROJECTILE_SPEED_PX_PER_S) / Fixed::from_num(TICK_RATE);
        let radius_sq = Fixed::from_num(HIT_RADIUS_PX * HIT_RADIUS_PX);

        for slot in &mut self.slots {
            if !slot.active {
                continue;
            }
            let (next, snapped) = slot.position.step_toward(slot.destination, step);
            slot.position = next;

            let arrived =
                snapped || slot.position.distance_squared(slot.destination) <= radius_sq;
            if arrived || !map::in_extended_bounds(slot.position) {
                slot.active = false;
            }
        }
    }

    /// Number of projectiles currently in flight.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.active).count()
    }

    /// Iterate the projectiles currently in flight, slot order.
    pub fn iter_active(&self) -> impl Iterator<Item = &Projectile> {
        self.slots.iter().filter(|slot| slot.active)
    }
}

impl Default for ProjectilePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::vec2;

    #[test]
    fn test_fire_until_exhausted() {
        let mut pool = ProjectilePool::new();
        for i in 0..POOL_CAPACITY {
            assert!(pool.fire(1, vec2(0, 0), vec2(100, 100)), "slot {i}");
        }
        assert!(!pool.fire(1, vec2(0, 0), vec2(100, 100)));
        assert_eq!(pool.active_count(), POOL_CAPACITY);
    }

    #[test]
    fn test_release_frees_slot_for_reuse() {
        let mut pool = ProjectilePool::new();
        for _ in 0..POOL_CAPACITY {
            pool.fire(1, vec2(0, 0), vec2(100, 100));
        }
        pool.release(3);
        pool.release(3);
        assert_eq!(pool.active_count(), POOL_CAPACITY - 1);
        assert!(pool.fire(2, vec2(0, 0), vec2(50, 50)));
    }

    #[test]
    fn test_step_retires_on_arrival() {
        let mut pool = ProjectilePool::new();
        // 320 px/s at 20 Hz is 16 px per tick.
        pool.fire(1, vec2(0, 0), vec2(32, 0));

        pool.step();
        assert_eq!(pool.active_count(), 1);

        pool.step();
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_step_retires_out_of_bounds() {
        let mut pool = ProjectilePool::new();
        pool.fire(1, vec2(map::MAP_WIDTH + map::BOUNDS_MARGIN - 6, 10), vec2(2000, 10));

        pool.step();
        assert_eq!(pool.active_count(), 0);
    }

    #[test]
    fn test_exhaustion_never_blocks_later_fire() {
        let mut pool = ProjectilePool::new();
        for _ in 0..POOL_CAPACITY + 5 {
            pool.fire(1, vec2(0, 0), vec2(30, 0));
        }
        // Two ticks retire everything in flight.
        pool.step();
        pool.step();
        assert_eq!(pool.active_count(), 0);
        assert!(pool.fire(1, vec2(0, 0), vec2(30, 0)));
    }

    #[test]
    fn test_pool_serialization_roundtrip() {
        let mut pool = ProjectilePool::new();
        pool.fire(4, vec2(10, 10), vec2(90, 90));
        pool.step();

        let bytes = bincode::serialize(&pool).unwrap();
        let restored: ProjectilePool = bincode::deserialize(&bytes).unwrap();
        assert_eq!(pool, restored);
    }
}
