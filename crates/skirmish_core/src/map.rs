//! Fixed battlefield geometry.
//!
//! The map is a small portrait rectangle with three capture points on
//! the diagonal, the enemy roster deployed along the top edge and the
//! player roster along the bottom edge. All values are in pixels; the
//! layout is a fixed part of the game rules, not data-driven.

use crate::math::{Fixed, Vec2Fixed};

/// Battlefield width in pixels.
pub const MAP_WIDTH: i32 = 390;

/// Battlefield height in pixels.
pub const MAP_HEIGHT: i32 = 480;

/// Extra margin around the map inside which projectiles stay live.
pub const BOUNDS_MARGIN: i32 = 50;

/// Build a vector from integer pixel coordinates.
#[must_use]
pub fn vec2(x: i32, y: i32) -> Vec2Fixed {
    Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
}

/// Center of the battlefield. Also the airstrike target.
#[must_use]
pub fn center() -> Vec2Fixed {
    vec2(MAP_WIDTH / 2, MAP_HEIGHT / 2)
}

/// Positions of the three capture points, top to bottom.
#[must_use]
pub fn capture_point_positions() -> [Vec2Fixed; 3] {
    [vec2(100, 100), vec2(195, 240), vec2(290, 380)]
}

/// Player deployment row along the bottom edge, slot order.
#[must_use]
pub fn player_spawns() -> [Vec2Fixed; 5] {
    [
        vec2(65, 440),
        vec2(130, 440),
        vec2(195, 440),
        vec2(260, 440),
        vec2(325, 440),
    ]
}

/// Enemy deployment row along the top edge, slot order.
#[must_use]
pub fn enemy_spawns() -> [Vec2Fixed; 5] {
    [
        vec2(65, 40),
        vec2(130, 40),
        vec2(195, 40),
        vec2(260, 40),
        vec2(325, 40),
    ]
}

/// Per-unit offsets spreading a group order into an X formation.
#[must_use]
pub fn formation_offsets() -> [Vec2Fixed; 5] {
    [
        vec2(0, 0),
        vec2(-30, -30),
        vec2(30, -30),
        vec2(-30, 30),
        vec2(30, 30),
    ]
}

/// Whether a point lies inside the map rectangle expanded by
/// [`BOUNDS_MARGIN`]. Projectiles outside this region are retired.
#[must_use]
pub fn in_extended_bounds(point: Vec2Fixed) -> bool {
    let min = Fixed::from_num(-BOUNDS_MARGIN);
    let max_x = Fixed::from_num(MAP_WIDTH + BOUNDS_MARGIN);
    let max_y = Fixed::from_num(MAP_HEIGHT + BOUNDS_MARGIN);

    point.x >= min && point.x <= max_x && point.y >= min && point.y <= max_y
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_points_are_distinct() {
        let points = capture_point_positions();
        assert_ne!(points[0], points[1]);
        assert_ne!(points[1], points[2]);
        assert_ne!(points[0], points[2]);
    }

    #[test]
    fn test_center_is_middle_capture_point() {
        assert_eq!(center(), capture_point_positions()[1]);
    }

    #[test]
    fn test_spawn_rows_face_each_other() {
        for (player, enemy) in player_spawns().iter().zip(enemy_spawns().iter()) {
            assert_eq!(player.x, enemy.x);
            assert!(player.y > enemy.y);
        }
    }

    #[test]
    fn test_extended_bounds() {
        assert!(in_extended_bounds(center()));
        assert!(in_extended_bounds(vec2(-BOUNDS_MARGIN, 0)));
        assert!(!in_extended_bounds(vec2(-BOUNDS_MARGIN - 1, 0)));
        assert!(!in_extended_bounds(vec2(0, MAP_HEIGHT + BOUNDS_MARGIN + 1)));
    }
}
