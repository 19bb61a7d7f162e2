//! One-tile-at-a-time construction
//!
//! The driver asks the build-order planner for the next target cell and the
//! nearest tile carrying the required glues, then runs a best-first
//! sub-planner that moves exactly that tile to its destination offset of the
//! growing polyomino. A failed sub-search triggers a new build order; running
//! out of build orders within the deadline fails the whole plan.

use rustc_hash::FxHashSet;

use crate::board::{Board, BoardState, PolyId, TargetShape, TileId};
use crate::io::error::{Result, SolverError};
use crate::planner::build_order::BuildOrderPlanner;
use crate::planner::heuristic::{SingleTileHeuristicKind, SingleTilePrecomputed};
use crate::planner::node::NodeExtras;
use crate::planner::pruner::{TargetUnreachable, WrongTilesCombined};
use crate::planner::search::{BestFirstPlanner, SubSpec, TileAtDestination};
use crate::planner::{CancelToken, Instance, PlannerConfig, Solver, SubGoal};
use crate::spatial::pathfinding::{reachable_set, shortest_sequence};
use crate::spatial::{Cell, Direction};

/// Build the best-first sub-planner that moves `tile` to `destination`
/// relative to the anchor of `poly`
///
/// Registers the wrong-merge pruner always and the target-reachability
/// pruner on boards without fixed tiles, exactly as the construction loop
/// expects.
pub fn single_tile_planner(
    board: &Board,
    target: &TargetShape,
    tile: TileId,
    poly: PolyId,
    destination: Cell,
    offset: Cell,
    kind: SingleTileHeuristicKind,
    pre: &SingleTilePrecomputed,
    token: CancelToken,
) -> BestFirstPlanner {
    let search_board = board.clone();
    let poly_anchor = search_board
        .polyomino(poly)
        .map_or((0, 0), |p| p.position());
    let poly_size = search_board.polyomino(poly).map_or(0, |p| p.size());
    let spec = SubSpec {
        destination,
        offset,
        poly_size,
    };
    let extras = NodeExtras {
        poly_anchor,
        tile_position: search_board.tile(tile).position(),
    };

    let corner_tile = search_board.tile_id_at(poly_anchor).unwrap_or(tile);
    let sub_view = SubGoal {
        poly,
        corner_tile,
        tile,
        destination,
        offset,
        poly_size,
    };
    let heuristic = kind.build(&search_board, target, &sub_view, pre);

    let unreachable_area = (!search_board.has_fixed_tiles()).then(|| {
        grown_reachable_area(&search_board, target, poly, destination, offset)
    });

    let mut planner = BestFirstPlanner::with_sub_goal(
        search_board,
        heuristic,
        Box::new(TileAtDestination),
        spec,
        extras,
        token,
    );
    planner.add_pruner(Box::new(WrongTilesCombined));
    if let Some(area) = unreachable_area {
        planner.add_pruner(Box::new(TargetUnreachable::new(area)));
    }
    planner
}

/// Anchor positions the grown polyomino (current shape plus the destination
/// cell) can occupy, seeded at its intended place inside the target shape
fn grown_reachable_area(
    board: &Board,
    target: &TargetShape,
    poly: PolyId,
    destination: Cell,
    offset: Cell,
) -> FxHashSet<Cell> {
    let mut cells: Vec<Cell> = board
        .polyomino(poly)
        .map(|p| p.shape())
        .unwrap_or_default();
    if !cells.contains(&destination) {
        cells.push(destination);
    }
    let corner = cells.iter().copied().min().unwrap_or((0, 0));
    let normalized: Vec<Cell> = cells
        .iter()
        .map(|(x, y)| (x - corner.0, y - corner.1))
        .collect();
    let start = (
        target.position().0 + offset.0,
        target.position().1 + offset.1,
    );
    reachable_set(board, &normalized, start)
}

/// Builds the target one reachable tile at a time
pub struct OneTileAtATimePlanner {
    board: Board,
    target: TargetShape,
    initial_state: BoardState,
    kind: SingleTileHeuristicKind,
    config: PlannerConfig,
    token: CancelToken,
    build_order: Option<BuildOrderPlanner>,
    poly: Option<PolyId>,
    offset: Cell,
    solution: Option<Vec<Direction>>,
    nodes: usize,
}

impl OneTileAtATimePlanner {
    /// Create the planner; blueprint work is deferred to [`Solver::solve`]
    /// so that cancellation covers it
    pub fn new(
        instance: &Instance,
        kind: SingleTileHeuristicKind,
        config: PlannerConfig,
        token: CancelToken,
    ) -> Self {
        let board = instance.board.clone();
        let initial_state = board.get_state();
        Self {
            board,
            target: instance.target_shape.clone(),
            initial_state,
            kind,
            config,
            token,
            build_order: None,
            poly: None,
            offset: (0, 0),
            solution: None,
            nodes: 0,
        }
    }

    /// Consume the next build cell and update the running anchor offset
    fn next_destination(&mut self, cell: Cell) -> Cell {
        let destination = (cell.0 - self.offset.0, cell.1 - self.offset.1);
        if destination < (0, 0) {
            // the new tile becomes the corner of the growing polyomino
            self.offset = cell;
        }
        destination
    }

    /// Take the first scheduled tile as the seed of the construction
    fn start_build_order(&mut self) -> Result<()> {
        let Some(build_order) = self.build_order.as_mut() else {
            return Ok(());
        };
        let Some((cell, tile)) = build_order.get_next_tile(&self.board, None, (0, 0)) else {
            return Err(SolverError::UnsolvableBlueprint {
                elapsed: std::time::Duration::ZERO,
            });
        };
        self.poly = Some(self.board.poly_of(tile));
        self.offset = cell;
        Ok(())
    }

    /// Draw the next build order; retry exhaustion at the deadline surfaces
    /// as a solver timeout
    fn next_build_order(&mut self) -> Result<()> {
        self.solution = Some(Vec::new());
        let Some(build_order) = self.build_order.as_mut() else {
            return Ok(());
        };
        build_order
            .change_build_order(&self.board, &self.token)
            .map_err(|err| match err {
                SolverError::UnsolvableBlueprint { .. } => SolverError::SolverTimeout {
                    nodes_expanded: self.nodes,
                },
                other => other,
            })?;
        self.board.restore_state(&self.initial_state);
        self.poly = None;
        self.start_build_order()
    }

    fn replay(&mut self, moves: &[Direction]) {
        for direction in moves {
            self.board.step(*direction);
            self.board.activate_glues();
        }
    }

    fn largest_polyomino(&self) -> Option<PolyId> {
        self.board
            .live_polyominoes()
            .max_by(|a, b| a.1.size().cmp(&b.1.size()).then_with(|| b.0.cmp(&a.0)))
            .map(|(id, _)| id)
    }
}

impl Solver for OneTileAtATimePlanner {
    fn solve(&mut self) -> Result<Option<Vec<Direction>>> {
        let pre = self
            .kind
            .precompute(&self.board, &self.target, &self.config, &self.token)?;

        self.build_order = Some(BuildOrderPlanner::new(
            &self.board,
            &self.target,
            &self.config,
            &self.token,
        )?);
        self.start_build_order()?;
        self.solution = Some(Vec::new());

        loop {
            let finished = self.build_order.as_ref().is_none_or(BuildOrderPlanner::finished);
            if finished || self.token.is_cancelled() {
                break;
            }

            let step = self.build_order.as_mut().and_then(|bo| {
                bo.get_next_tile(&self.board, self.poly, self.offset)
            });
            let Some((cell, tile)) = step else {
                self.next_build_order()?;
                continue;
            };
            let destination = self.next_destination(cell);
            let Some(poly) = self.poly else {
                self.next_build_order()?;
                continue;
            };

            let mut sub_planner = single_tile_planner(
                &self.board,
                &self.target,
                tile,
                poly,
                destination,
                self.offset,
                self.kind,
                &pre,
                self.token.clone(),
            );
            let sub_solution = sub_planner.solve_with_budget(None);
            self.nodes += sub_planner.number_of_nodes();

            let Some(moves) = sub_solution else {
                self.next_build_order()?;
                continue;
            };
            self.replay(&moves);
            self.poly = self.largest_polyomino();
            if let Some(solution) = self.solution.as_mut() {
                solution.extend(moves);
            }
        }

        if self.token.is_cancelled() {
            self.solution = None;
            return Ok(None);
        }

        // walk the finished polyomino to the target anchor
        let Some(poly) = self.poly.and_then(|id| self.board.polyomino(id)) else {
            self.solution = None;
            return Ok(None);
        };
        let end = shortest_sequence(
            &self.board,
            &poly.shape(),
            poly.position(),
            self.target.position(),
        );
        match end {
            Some(end) => {
                if let Some(solution) = self.solution.as_mut() {
                    solution.extend(end);
                }
            }
            None => self.solution = None,
        }
        Ok(self.solution.clone())
    }

    fn extract_solution(&mut self) -> Option<Vec<Direction>> {
        self.solution.clone()
    }

    fn number_of_nodes(&self) -> usize {
        self.nodes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{GlueRules, Glues, Tile};

    #[test]
    fn test_single_tile_planner_joins_tile_at_destination() {
        let mut board = Board::new(6, 6, GlueRules::reflexive());
        let seed = board
            .add_tile(Tile::new(
                (2, 3),
                Glues::new(Some("a".to_string()), None, None, None),
            ))
            .unwrap();
        let mover = board
            .add_tile(Tile::new(
                (5, 0),
                Glues::new(None, None, Some("a".to_string()), None),
            ))
            .unwrap();
        let target = TargetShape::new(vec![Tile::at((2, 2)), Tile::at((2, 3))]);
        let poly = board.poly_of(seed);

        let mut planner = single_tile_planner(
            &board,
            &target,
            mover,
            poly,
            (0, -1),
            (0, 1),
            SingleTileHeuristicKind::MinimumMoves,
            &SingleTileHeuristicKind::MinimumMoves
                .precompute(&board, &target, &PlannerConfig::default(), &CancelToken::new())
                .unwrap(),
            CancelToken::new(),
        );
        let solution = planner.solve_with_budget(None).expect("sub-goal solvable");

        let mut replay = board.clone();
        for direction in &solution {
            replay.step(*direction);
            replay.activate_glues();
        }
        let seed_pos = replay.tile(seed).position();
        let mover_pos = replay.tile(mover).position();
        assert_eq!(mover_pos, (seed_pos.0, seed_pos.1 - 1));
        assert_eq!(replay.poly_of(seed), replay.poly_of(mover));
    }
}
