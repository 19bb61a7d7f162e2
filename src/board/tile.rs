//! Tile records and arena identifiers

use crate::board::glues::Glues;
use crate::spatial::Cell;

/// Index of a tile in the board's tile arena
///
/// Tile ids are stable for the lifetime of a board: snapshots, restores, and
/// polyomino merges never renumber tiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub(crate) u32);

impl TileId {
    /// Arena index of this tile
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    pub(crate) const fn from_index(index: usize) -> Self {
        Self(index as u32)
    }
}

/// Index of a polyomino slot on a board
///
/// Polyomino ids are only valid between mutations: a glue activation that
/// merges two polyominoes retires the absorbed slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolyId(pub(crate) u32);

impl PolyId {
    /// Slot index of this polyomino
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A movable tile with directional glues
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    /// Current x coordinate on the board
    pub x: i32,
    /// Current y coordinate on the board
    pub y: i32,
    /// Directional glue labels
    pub glues: Glues,
    /// Display color, carried through serialization
    pub color: String,
}

impl Tile {
    /// Default display color for tiles created without one
    pub const DEFAULT_COLOR: &'static str = "#FFFF00";

    /// Create a tile at a position with the given glues
    pub fn new(position: Cell, glues: Glues) -> Self {
        Self {
            x: position.0,
            y: position.1,
            glues,
            color: Self::DEFAULT_COLOR.to_string(),
        }
    }

    /// Create a glue-less tile at a position
    pub fn at(position: Cell) -> Self {
        Self::new(position, Glues::blank())
    }

    /// Current position as a cell
    pub const fn position(&self) -> Cell {
        (self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_construction() {
        let tile = Tile::at((3, -1));
        assert_eq!(tile.position(), (3, -1));
        assert!(tile.glues.is_blank());
        assert_eq!(tile.color, Tile::DEFAULT_COLOR);
    }
}
