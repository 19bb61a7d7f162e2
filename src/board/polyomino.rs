//! Rigid tile groups and standalone target shapes
//!
//! A polyomino stores its tiles as relative coordinates keyed off the anchor,
//! which is the lexicographically minimal `(x, y)` of its tiles. The cell
//! `(0, 0)` is therefore always present. Because the anchor is a
//! lexicographic minimum, relative y offsets may be negative.

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;

use crate::board::tile::{Tile, TileId};
use crate::spatial::Cell;

/// A group of tiles that moves as a rigid unit under tilts
#[derive(Debug, Clone)]
pub struct Polyomino {
    position: Cell,
    tiles: FxHashMap<Cell, TileId>,
    /// Pruner cache: whether this polyomino can still reach the target area
    pub can_reach: bool,
}

impl Polyomino {
    /// Create an empty polyomino
    ///
    /// An empty polyomino has no meaningful anchor; the first `insert`
    /// establishes it.
    pub fn new() -> Self {
        Self {
            position: (i32::MAX, i32::MAX),
            tiles: FxHashMap::default(),
            can_reach: true,
        }
    }

    /// Anchor: the lexicographically minimal tile position
    pub const fn position(&self) -> Cell {
        self.position
    }

    /// Number of tiles in the group
    pub fn size(&self) -> usize {
        self.tiles.len()
    }

    /// True iff the group holds no tiles
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Relative coordinates of the tiles
    pub fn relative_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        self.tiles.keys().copied()
    }

    /// Relative coordinates collected into a vector
    pub fn shape(&self) -> Vec<Cell> {
        self.tiles.keys().copied().collect()
    }

    /// Absolute coordinates of the tiles
    pub fn absolute_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let (px, py) = self.position;
        self.tiles.keys().map(move |(dx, dy)| (px + dx, py + dy))
    }

    /// Tile ids with their relative coordinates
    pub fn entries(&self) -> impl Iterator<Item = (Cell, TileId)> + '_ {
        self.tiles.iter().map(|(c, t)| (*c, *t))
    }

    /// Tile ids of the group
    pub fn tile_ids(&self) -> impl Iterator<Item = TileId> + '_ {
        self.tiles.values().copied()
    }

    /// The tile at the anchor cell
    pub fn corner_tile(&self) -> Option<TileId> {
        self.tiles.get(&(0, 0)).copied()
    }

    /// Tile id at a relative coordinate
    pub fn tile_at_relative(&self, cell: Cell) -> Option<TileId> {
        self.tiles.get(&cell).copied()
    }

    fn shift_keys(&mut self, delta: Cell) {
        let shifted: FxHashMap<Cell, TileId> = self
            .tiles
            .drain()
            .map(|((dx, dy), tile)| ((dx + delta.0, dy + delta.1), tile))
            .collect();
        self.tiles = shifted;
    }

    /// Insert a tile at an absolute position, rebalancing the anchor if the
    /// position is lexicographically smaller than the current one
    pub fn insert(&mut self, tile: TileId, absolute: Cell) {
        if self.tiles.is_empty() {
            self.position = absolute;
            self.tiles.insert((0, 0), tile);
            return;
        }
        if absolute < self.position {
            let delta = (
                self.position.0 - absolute.0,
                self.position.1 - absolute.1,
            );
            self.shift_keys(delta);
            self.position = absolute;
        }
        self.tiles.insert(
            (absolute.0 - self.position.0, absolute.1 - self.position.1),
            tile,
        );
    }

    /// Remove the tile at an absolute position, restoring the anchor
    /// invariant when the corner tile was removed
    ///
    /// Returns the removed tile id, or `None` if no tile sits there. Cleanup
    /// of a polyomino that becomes empty is the board's responsibility.
    pub fn remove_tile_at(&mut self, absolute: Cell) -> Option<TileId> {
        let relative = (absolute.0 - self.position.0, absolute.1 - self.position.1);
        let removed = self.tiles.remove(&relative)?;
        if relative == (0, 0) && !self.tiles.is_empty() {
            let min_rel = self
                .tiles
                .keys()
                .copied()
                .min()
                .unwrap_or((0, 0));
            self.shift_keys((-min_rel.0, -min_rel.1));
            self.position = (self.position.0 + min_rel.0, self.position.1 + min_rel.1);
        }
        Some(removed)
    }

    /// Fold another polyomino's tiles into this one
    ///
    /// The caller is responsible for merging in anchor order; `can_reach` of
    /// the result is the logical OR of both flags.
    pub fn absorb(&mut self, other: &Self) {
        for ((dx, dy), tile) in &other.tiles {
            self.insert(*tile, (other.position.0 + dx, other.position.1 + dy));
        }
        self.can_reach |= other.can_reach;
    }

    /// Translate the anchor; tile coordinates are maintained by the board
    pub const fn translate(&mut self, dx: i32, dy: i32) {
        self.position = (self.position.0 + dx, self.position.1 + dy);
    }

    /// True iff this polyomino covers the same relative cells as the shape
    pub fn shape_equals(&self, shape: &TargetShape) -> bool {
        if self.size() != shape.size() {
            return false;
        }
        self.tiles.keys().all(|cell| shape.cells().contains(cell))
    }
}

impl Default for Polyomino {
    fn default() -> Self {
        Self::new()
    }
}

/// The goal shape of an instance, independent of any board
///
/// Keeps the decoded tiles (with glues and colors) for re-serialization and
/// derives the anchor and the relative cell set from them.
#[derive(Debug, Clone)]
pub struct TargetShape {
    tiles: Vec<Tile>,
    position: Cell,
    cells: FxHashSet<Cell>,
}

impl TargetShape {
    /// Build a target shape from its tiles
    pub fn new(tiles: Vec<Tile>) -> Self {
        let position = tiles
            .iter()
            .map(Tile::position)
            .min()
            .unwrap_or((0, 0));
        let cells = tiles
            .iter()
            .map(|t| (t.x - position.0, t.y - position.1))
            .collect();
        Self {
            tiles,
            position,
            cells,
        }
    }

    /// Anchor of the shape (lexicographic minimum of its tiles)
    pub const fn position(&self) -> Cell {
        self.position
    }

    /// Number of cells in the shape
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    /// Relative cells of the shape
    pub const fn cells(&self) -> &FxHashSet<Cell> {
        &self.cells
    }

    /// Absolute cells of the shape
    pub fn absolute_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let (px, py) = self.position;
        self.cells.iter().map(move |(dx, dy)| (px + dx, py + dy))
    }

    /// The decoded tiles of the shape
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[u32]) -> Vec<TileId> {
        values.iter().map(|v| TileId(*v)).collect()
    }

    #[test]
    fn test_anchor_is_lexicographic_minimum() {
        let mut poly = Polyomino::new();
        let tiles = ids(&[0, 1]);
        poly.insert(tiles[0], (2, 7));
        poly.insert(tiles[1], (3, 0));
        // (2, 7) < (3, 0) lexicographically, so it stays the anchor
        assert_eq!(poly.position(), (2, 7));
        assert_eq!(poly.corner_tile(), Some(tiles[0]));
        let mut cells = poly.shape();
        cells.sort_unstable();
        assert_eq!(cells, vec![(0, 0), (1, -7)]);
    }

    #[test]
    fn test_insert_rebalances_anchor() {
        let mut poly = Polyomino::new();
        let tiles = ids(&[0, 1]);
        poly.insert(tiles[0], (5, 5));
        poly.insert(tiles[1], (4, 9));
        assert_eq!(poly.position(), (4, 9));
        assert_eq!(poly.tile_at_relative((0, 0)), Some(tiles[1]));
        assert_eq!(poly.tile_at_relative((1, -4)), Some(tiles[0]));
    }

    #[test]
    fn test_remove_corner_restores_invariant() {
        let mut poly = Polyomino::new();
        let tiles = ids(&[0, 1, 2]);
        poly.insert(tiles[0], (1, 1));
        poly.insert(tiles[1], (2, 1));
        poly.insert(tiles[2], (2, 2));
        assert_eq!(poly.remove_tile_at((1, 1)), Some(tiles[0]));
        assert_eq!(poly.position(), (2, 1));
        assert_eq!(poly.tile_at_relative((0, 0)), Some(tiles[1]));
        assert_eq!(poly.tile_at_relative((0, 1)), Some(tiles[2]));
        assert_eq!(poly.remove_tile_at((7, 7)), None);
    }

    #[test]
    fn test_absorb_merges_tiles_and_can_reach() {
        let mut a = Polyomino::new();
        a.insert(TileId(0), (0, 0));
        a.can_reach = false;
        let mut b = Polyomino::new();
        b.insert(TileId(1), (1, 0));
        b.can_reach = true;
        a.absorb(&b);
        assert_eq!(a.size(), 2);
        assert!(a.can_reach);
        assert_eq!(a.tile_at_relative((1, 0)), Some(TileId(1)));
    }

    #[test]
    fn test_shape_equals_target() {
        let target = TargetShape::new(vec![Tile::at((4, 4)), Tile::at((4, 5))]);
        let mut poly = Polyomino::new();
        poly.insert(TileId(0), (0, 0));
        poly.insert(TileId(1), (0, 1));
        assert!(poly.shape_equals(&target));
        poly.insert(TileId(2), (1, 0));
        assert!(!poly.shape_equals(&target));
    }
}
