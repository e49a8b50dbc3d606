//! Tile Map
//!
//! Immutable wall/floor grid generated once at arena start. The border ring is
//! always wall; interior cells become wall with a small independent chance.

use serde::{Deserialize, Serialize};

use crate::core::rng::DeterministicRng;
use crate::core::vec2::Vec2;

/// Map generation parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapConfig {
    /// Number of tile columns
    pub cols: u32,
    /// Number of tile rows
    pub rows: u32,
    /// Edge length of one tile in world units
    pub tile_size: f32,
    /// Probability that an interior cell is a wall
    pub wall_chance: f32,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            cols: 32,
            rows: 24,
            tile_size: 25.0,
            wall_chance: 0.1,
        }
    }
}

/// Contents of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tile {
    /// Passable
    Floor,
    /// Blocks tanks, projectiles and lasers
    Wall,
}

/// The arena's tile grid.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TileMap {
    cols: u32,
    rows: u32,
    tile_size: f32,
    /// Row-major cells
    cells: Vec<Tile>,
}

impl TileMap {
    /// Generate a map, drawing interior walls from `rng`.
    ///
    /// Cells are visited row by row, so the same seed always yields the same
    /// layout for a given configuration.
    pub fn generate(config: &MapConfig, rng: &mut DeterministicRng) -> Self {
        let mut map = Self::open(config);

        for row in 1..config.rows.saturating_sub(1) {
            for col in 1..config.cols.saturating_sub(1) {
                if rng.next_bool(config.wall_chance) {
                    map.set_tile(col, row, Tile::Wall);
                }
            }
        }

        map
    }

    /// A map with only the border ring walled in.
    pub fn open(config: &MapConfig) -> Self {
        let cols = config.cols;
        let rows = config.rows;
        let mut cells = Vec::with_capacity((cols * rows) as usize);

        for row in 0..rows {
            for col in 0..cols {
                let border = row == 0 || col == 0 || row + 1 == rows || col + 1 == cols;
                cells.push(if border { Tile::Wall } else { Tile::Floor });
            }
        }

        Self {
            cols,
            rows,
            tile_size: config.tile_size,
            cells,
        }
    }

    /// Overwrite a single cell. Out-of-range coordinates are ignored.
    pub fn set_tile(&mut self, col: u32, row: u32, tile: Tile) {
        if col < self.cols && row < self.rows {
            let idx = (row * self.cols + col) as usize;
            self.cells[idx] = tile;
        }
    }

    /// Cell at grid coordinates, if in range.
    pub fn tile(&self, col: u32, row: u32) -> Option<Tile> {
        if col < self.cols && row < self.rows {
            self.cells.get((row * self.cols + col) as usize).copied()
        } else {
            None
        }
    }

    /// True if the world point lies outside the grid or inside a wall cell.
    #[inline]
    pub fn is_blocked(&self, x: f32, y: f32) -> bool {
        // Also rejects NaN
        if !(x >= 0.0 && y >= 0.0) {
            return true;
        }

        let col = (x / self.tile_size).floor() as u32;
        let row = (y / self.tile_size).floor() as u32;

        match self.tile(col, row) {
            Some(Tile::Floor) => false,
            Some(Tile::Wall) | None => true,
        }
    }

    /// Convenience wrapper around [`TileMap::is_blocked`].
    #[inline]
    pub fn is_blocked_at(&self, point: Vec2) -> bool {
        self.is_blocked(point.x, point.y)
    }

    /// Number of columns.
    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Number of rows.
    pub fn rows(&self) -> u32 {
        self.rows
    }

    /// Tile edge length.
    pub fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Arena width in world units.
    pub fn width(&self) -> f32 {
        self.cols as f32 * self.tile_size
    }

    /// Arena height in world units.
    pub fn height(&self) -> f32 {
        self.rows as f32 * self.tile_size
    }

    /// Rows of `0` (floor) / `1` (wall), as sent to clients.
    pub fn grid(&self) -> Vec<Vec<u8>> {
        self.cells
            .chunks(self.cols.max(1) as usize)
            .map(|row| {
                row.iter()
                    .map(|tile| match tile {
                        Tile::Floor => 0,
                        Tile::Wall => 1,
                    })
                    .collect()
            })
            .collect()
    }
}
