//! Collision Detection
//!
//! Tank-vs-terrain queries against the tile map. Every check samples points
//! on the tank collider rather than sweeping it, which is exact as long as a
//! tank moves less than one tile per tick.

use crate::core::constants::{EDGE_INSET, SAFE_SPAWN_RADIUS, TANK_RADIUS, WALL_PADDING};
use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;
use crate::game::map::TileMap;

/// Movement axis for [`can_advance`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    /// Horizontal
    X,
    /// Vertical
    Y,
}

/// Check whether a tank may move along one axis.
///
/// `new` and `old` are the coordinates along `axis`; `other` is the fixed
/// coordinate on the perpendicular axis. The two leading corners of the
/// collider (pulled inward by the wall padding) must both be clear. No
/// movement is always allowed.
pub fn can_advance(map: &TileMap, axis: Axis, new: f32, old: f32, other: f32) -> bool {
    let lead = if new < old {
        new - TANK_RADIUS
    } else if new > old {
        new + TANK_RADIUS
    } else {
        return true;
    };

    let side_a = other - TANK_RADIUS + WALL_PADDING;
    let side_b = other + TANK_RADIUS - WALL_PADDING;

    let blocked = match axis {
        Axis::X => map.is_blocked(lead, side_a) || map.is_blocked(lead, side_b),
        Axis::Y => map.is_blocked(side_a, lead) || map.is_blocked(side_b, lead),
    };

    !blocked
}

/// A point is a safe spawn if it and its four diagonal neighbours at the
/// safety radius are all clear.
pub fn is_safe_spawn(map: &TileMap, point: Vec2) -> bool {
    let r = SAFE_SPAWN_RADIUS;
    !(map.is_blocked(point.x, point.y)
        || map.is_blocked(point.x - r, point.y - r)
        || map.is_blocked(point.x + r, point.y - r)
        || map.is_blocked(point.x - r, point.y + r)
        || map.is_blocked(point.x + r, point.y + r))
}

/// Spawn margin rectangle: the world inset by [`EDGE_INSET`] on every side.
pub fn spawn_bounds(map: &TileMap) -> (Vec2, Vec2) {
    (
        Vec2::new(EDGE_INSET, EDGE_INSET),
        Vec2::new(map.width() - EDGE_INSET, map.height() - EDGE_INSET),
    )
}

/// Random search for a safe spawn point inside the spawn margin.
///
/// Draws at least one candidate and at most `attempts`. Returns the point and
/// whether it is safe; when every attempt fails the last candidate is returned
/// unchanged and the caller decides how loudly to complain.
pub fn find_spawn_point(map: &TileMap, rng: &mut DeterministicRng, attempts: u32) -> (Vec2, bool) {
    let (min, max) = spawn_bounds(map);
    let mut candidate = rng.random_point_in(min, max);

    for _ in 1..attempts.max(1) {
        if is_safe_spawn(map, candidate) {
            return (candidate, true);
        }
        candidate = rng.random_point_in(min, max);
    }

    let safe = is_safe_spawn(map, candidate);
    (candidate, safe)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::{MapConfig, Tile};

    fn open_map() -> TileMap {
        TileMap::open(&MapConfig::default())
    }

    #[test]
    fn test_no_movement_always_allowed() {
        let map = open_map();
        // Even inside the border wall
        assert!(can_advance(&map, Axis::X, 5.0, 5.0, 5.0));
        assert!(can_advance(&map, Axis::Y, 5.0, 5.0, 5.0));
    }

    #[test]
    fn test_border_blocks_leading_edge() {
        let map = open_map();

        // Moving left from x=38 to x=34: leading edge 24 is inside column 0
        assert!(!can_advance(&map, Axis::X, 34.0, 38.0, 300.0));
        // Moving right away from the wall is fine
        assert!(can_advance(&map, Axis::X, 42.0, 38.0, 300.0));

        // Same along Y near the top border
        assert!(!can_advance(&map, Axis::Y, 34.0, 38.0, 400.0));
        assert!(can_advance(&map, Axis::Y, 42.0, 38.0, 400.0));
    }

    #[test]
    fn test_padding_allows_sliding_past_corner() {
        let mut map = open_map();
        // Wall at column 4, row 4: [100, 125) x [100, 125)
        map.set_tile(4, 4, Tile::Wall);

        // Moving right at y=131: corners at y=125 and y=137 miss row 4
        assert!(can_advance(&map, Axis::X, 95.0, 92.0, 131.0));
        // At y=128 the upper corner (y=122) clips the wall
        assert!(!can_advance(&map, Axis::X, 95.0, 92.0, 128.0));
    }

    #[test]
    fn test_is_safe_spawn() {
        let mut map = open_map();

        assert!(is_safe_spawn(&map, Vec2::new(400.0, 300.0)));
        // Diagonal probe reaches the border
        assert!(!is_safe_spawn(&map, Vec2::new(30.0, 300.0)));

        map.set_tile(16, 12, Tile::Wall);
        // Centre clear, but (405, 305) lands in the new wall
        assert!(!is_safe_spawn(&map, Vec2::new(395.0, 295.0)));
    }

    #[test]
    fn test_find_spawn_point_on_open_map() {
        let map = open_map();
        let mut rng = DeterministicRng::new(99);

        for _ in 0..100 {
            let (point, safe) = find_spawn_point(&map, &mut rng, 50);
            assert!(safe);
            assert!(is_safe_spawn(&map, point));
            assert!(point.x >= 20.0 && point.x < 780.0);
            assert!(point.y >= 20.0 && point.y < 580.0);
        }
    }

    #[test]
    fn test_find_spawn_point_fallback() {
        let config = MapConfig {
            wall_chance: 1.0,
            ..MapConfig::default()
        };
        let mut rng = DeterministicRng::new(5);
        let map = TileMap::generate(&config, &mut rng);

        let (point, safe) = find_spawn_point(&map, &mut rng, 50);
        assert!(!safe);
        // Fallback still lands inside the spawn margin
        assert!(point.x >= 20.0 && point.x < 780.0);
    }
}
