//! Branch-cutting predicates over glue-activation change sets
//!
//! A pruner answers whether the branch that produced the given set of merged
//! polyominoes can still lead to a goal state; `true` cuts the branch.
//! Registration order defines evaluation order. Several pruners maintain the
//! `can_reach` cache on polyominoes as they go.

use rustc_hash::FxHashSet;

use crate::board::{Board, PolyId, TargetShape};
use crate::planner::SubGoal;
use crate::spatial::Cell;
use crate::spatial::pathfinding::is_reachable_area;
use crate::spatial::shape::{is_packable, shape_fits};

/// A registered branch-cutting predicate
pub trait Pruner: Send {
    /// True iff the branch provably contains no goal state
    fn is_prunable(&mut self, board: &mut Board, sub: Option<&SubGoal>, changed: &[PolyId]) -> bool;
}

fn reachable_tile_count(board: &Board) -> usize {
    board
        .live_polyominoes()
        .filter(|(_, p)| p.can_reach)
        .map(|(_, p)| p.size())
        .sum()
}

/// Prunes when fewer tiles than the target needs can still reach its area
pub struct NotEnoughTiles {
    target_area: FxHashSet<Cell>,
    target_size: usize,
}

impl NotEnoughTiles {
    /// Set up for an instance
    pub fn new(target: &TargetShape) -> Self {
        Self {
            target_area: target.absolute_cells().collect(),
            target_size: target.size(),
        }
    }

    fn recompute_reachable(&self, board: &mut Board, id: PolyId) {
        let Some(poly) = board.polyomino(id) else {
            return;
        };
        let reachable =
            is_reachable_area(board, &poly.shape(), poly.position(), &self.target_area);
        board.set_can_reach(id, reachable);
    }
}

impl Pruner for NotEnoughTiles {
    fn is_prunable(
        &mut self,
        board: &mut Board,
        _sub: Option<&SubGoal>,
        changed: &[PolyId],
    ) -> bool {
        for &id in changed {
            if board.polyomino(id).is_some_and(|p| p.can_reach) {
                self.recompute_reachable(board, id);
            }
        }
        reachable_tile_count(board) < self.target_size
    }
}

/// Prunes as soon as any merged polyomino can no longer reach the target;
/// used when every tile must end up in the shape
pub struct NotEnoughTilesNoLeftovers {
    inner: NotEnoughTiles,
}

impl NotEnoughTilesNoLeftovers {
    /// Set up for an instance
    pub fn new(target: &TargetShape) -> Self {
        Self {
            inner: NotEnoughTiles::new(target),
        }
    }
}

impl Pruner for NotEnoughTilesNoLeftovers {
    fn is_prunable(
        &mut self,
        board: &mut Board,
        _sub: Option<&SubGoal>,
        changed: &[PolyId],
    ) -> bool {
        for &id in changed {
            self.inner.recompute_reachable(board, id);
            if board.polyomino(id).is_some_and(|p| !p.can_reach) {
                return true;
            }
        }
        false
    }
}

/// Prunes when the largest polyominoes cannot be disjointly packed into the
/// target shape
pub struct PackingNoLeftovers {
    count: usize,
    target_cells: FxHashSet<Cell>,
}

impl PackingNoLeftovers {
    /// Set up for an instance, testing the `count` largest polyominoes
    pub fn new(target: &TargetShape, count: usize) -> Self {
        Self {
            count,
            target_cells: target.cells().clone(),
        }
    }
}

impl Pruner for PackingNoLeftovers {
    fn is_prunable(
        &mut self,
        board: &mut Board,
        _sub: Option<&SubGoal>,
        changed: &[PolyId],
    ) -> bool {
        if changed.is_empty() {
            return false;
        }
        let mut polys: Vec<_> = board.live_polyominoes().collect();
        polys.sort_by(|a, b| b.1.size().cmp(&a.1.size()).then_with(|| a.0.cmp(&b.0)));
        let shapes: Vec<Vec<Cell>> = polys
            .iter()
            .take(self.count)
            .map(|(_, p)| p.shape())
            .collect();
        !is_packable(&self.target_cells, &shapes)
    }
}

/// Prunes when any single merged polyomino no longer fits inside the target
pub struct Packing {
    target_cells: FxHashSet<Cell>,
    target_size: usize,
}

impl Packing {
    /// Set up for an instance
    pub fn new(target: &TargetShape) -> Self {
        Self {
            target_cells: target.cells().clone(),
            target_size: target.size(),
        }
    }
}

impl Pruner for Packing {
    fn is_prunable(
        &mut self,
        board: &mut Board,
        _sub: Option<&SubGoal>,
        changed: &[PolyId],
    ) -> bool {
        for &id in changed {
            if board.polyomino(id).is_some_and(|p| p.can_reach) {
                let fits = board
                    .polyomino(id)
                    .is_some_and(|p| shape_fits(&self.target_cells, &p.shape()));
                board.set_can_reach(id, fits);
            }
        }
        reachable_tile_count(board) < self.target_size
    }
}

/// Sub-planner pruner: cuts every merge that is not exactly the moved tile
/// joining the growing polyomino at its destination
pub struct WrongTilesCombined;

impl Pruner for WrongTilesCombined {
    fn is_prunable(
        &mut self,
        board: &mut Board,
        sub: Option<&SubGoal>,
        changed: &[PolyId],
    ) -> bool {
        let Some(sub) = sub else {
            return false;
        };
        let corner_position = board.tile(sub.corner_tile).position();
        let tile_position = board.tile(sub.tile).position();
        let intended = (
            corner_position.0 + sub.destination.0,
            corner_position.1 + sub.destination.1,
        );

        let mut remaining: Vec<PolyId> = changed.to_vec();
        if board.polyomino(sub.poly).is_none() {
            // the growing polyomino was absorbed by something
            let combined = board.poly_of(sub.corner_tile);
            if combined != board.poly_of(sub.tile) {
                return true;
            }
            if tile_position != intended {
                return true;
            }
            if board.polyomino(combined).map_or(0, |p| p.size()) != sub.poly_size + 1 {
                return true;
            }
            remaining.retain(|id| *id != combined);
        }

        for id in remaining {
            if id != sub.poly {
                return true;
            }
            let Some(poly) = board.polyomino(id) else {
                return true;
            };
            if poly.size() != sub.poly_size + 1 {
                return true;
            }
            let anchor = poly.position();
            if tile_position != (anchor.0 + sub.destination.0, anchor.1 + sub.destination.1) {
                return true;
            }
        }
        false
    }
}

/// Sub-planner pruner: rejects finished placements whose grown polyomino has
/// left the reachable region of its construction-step target
pub struct TargetUnreachable {
    area: FxHashSet<Cell>,
}

impl TargetUnreachable {
    /// Set up with the reachable anchor set of the grown polyomino
    pub const fn new(area: FxHashSet<Cell>) -> Self {
        Self { area }
    }
}

impl Pruner for TargetUnreachable {
    fn is_prunable(
        &mut self,
        board: &mut Board,
        sub: Option<&SubGoal>,
        _changed: &[PolyId],
    ) -> bool {
        let Some(sub) = sub else {
            return false;
        };
        let corner_position = board.tile(sub.corner_tile).position();
        let tile_position = board.tile(sub.tile).position();
        let finished = tile_position
            == (
                corner_position.0 + sub.destination.0,
                corner_position.1 + sub.destination.1,
            );
        if !finished {
            return false;
        }
        let anchor = board
            .polyomino(board.poly_of(sub.corner_tile))
            .map_or(corner_position, |p| p.position());
        !self.area.contains(&anchor)
    }
}

/// Fixed-board pruner: cuts once any tile is glued outside the target cells
pub struct TilesGluedOutsideTargetArea {
    target_cells: FxHashSet<Cell>,
}

impl TilesGluedOutsideTargetArea {
    /// Set up for an instance
    pub fn new(target: &TargetShape) -> Self {
        Self {
            target_cells: target.absolute_cells().collect(),
        }
    }
}

impl Pruner for TilesGluedOutsideTargetArea {
    fn is_prunable(
        &mut self,
        board: &mut Board,
        _sub: Option<&SubGoal>,
        changed: &[PolyId],
    ) -> bool {
        for &id in changed {
            let Some(poly) = board.polyomino(id) else {
                continue;
            };
            if poly
                .absolute_cells()
                .any(|cell| !self.target_cells.contains(&cell))
            {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{GlueRules, Glues, Tile};

    fn bonded_pair_board() -> (Board, Vec<PolyId>) {
        let mut rules = GlueRules::new();
        rules.add_rule("x", "x");
        let mut board = Board::new(4, 4, rules);
        board.add_tile(Tile::new(
            (0, 0),
            Glues::new(None, Some("x".to_string()), None, None),
        ));
        board.add_tile(Tile::new(
            (1, 0),
            Glues::new(None, None, None, Some("x".to_string())),
        ));
        let changed = board.activate_glues();
        (board, changed)
    }

    #[test]
    fn test_not_enough_tiles_prunes_when_target_bigger_than_supply() {
        let (mut board, changed) = bonded_pair_board();
        // the pair's anchor can reach (2, 2), so both tiles still count
        let small_target = TargetShape::new(vec![Tile::at((2, 2)), Tile::at((3, 2))]);
        let mut pruner = NotEnoughTiles::new(&small_target);
        assert!(!pruner.is_prunable(&mut board, None, &changed));

        let big_target = TargetShape::new(vec![
            Tile::at((1, 2)),
            Tile::at((2, 2)),
            Tile::at((3, 2)),
        ]);
        let mut pruner = NotEnoughTiles::new(&big_target);
        assert!(pruner.is_prunable(&mut board, None, &changed));
    }

    #[test]
    fn test_packing_marks_oversized_polyominoes_unreachable() {
        let (mut board, changed) = bonded_pair_board();
        // vertical domino target: the horizontal pair cannot fit
        let target = TargetShape::new(vec![Tile::at((3, 3)), Tile::at((3, 2))]);
        let mut pruner = Packing::new(&target);
        assert!(pruner.is_prunable(&mut board, None, &changed));
        let (_, poly) = board.live_polyominoes().next().unwrap();
        assert!(!poly.can_reach);
    }

    #[test]
    fn test_packing_no_leftovers_accepts_fitting_partition() {
        let (mut board, changed) = bonded_pair_board();
        let target = TargetShape::new(vec![Tile::at((2, 3)), Tile::at((3, 3))]);
        let mut pruner = PackingNoLeftovers::new(&target, 3);
        assert!(!pruner.is_prunable(&mut board, None, &changed));
        assert!(!pruner.is_prunable(&mut board, None, &[]));
    }

    #[test]
    fn test_tiles_glued_outside_target_area() {
        let (mut board, changed) = bonded_pair_board();
        let covering = TargetShape::new(vec![Tile::at((0, 0)), Tile::at((1, 0))]);
        let mut pruner = TilesGluedOutsideTargetArea::new(&covering);
        assert!(!pruner.is_prunable(&mut board, None, &changed));

        let elsewhere = TargetShape::new(vec![Tile::at((2, 2)), Tile::at((3, 2))]);
        let mut pruner = TilesGluedOutsideTargetArea::new(&elsewhere);
        assert!(pruner.is_prunable(&mut board, None, &changed));
    }
}
