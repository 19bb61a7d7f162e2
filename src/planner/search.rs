//! BFS and best-first motion planners over hashed board states
//!
//! Both engines expand nodes by executing one tilt pulse per direction,
//! activating glues, consulting the registered pruners, and asking the stop
//! condition whether the goal has been reached. Expansion order is fully
//! deterministic: the best-first queue breaks equal estimates by insertion
//! sequence.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use ndarray::Array2;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::{Board, TargetShape};
use crate::io::error::{Result, SolverError};
use crate::planner::heuristic::{Heuristic, HeuristicKind, WeightedDistanceSumAnchoring};
use crate::planner::node::{Node, NodeArena, NodeExtras, NodeId, Priority};
use crate::planner::pruner::{
    NotEnoughTiles, NotEnoughTilesNoLeftovers, Packing, PackingNoLeftovers, Pruner,
    TilesGluedOutsideTargetArea,
};
use crate::planner::{CancelToken, Instance, PlannerConfig, Solver, SubGoal};
use crate::spatial::direction::DirectionSet;
use crate::spatial::pathfinding::{reachable_set, shortest_sequence};
use crate::spatial::{Cell, Direction};

/// Goal test and solution completion for a planner
pub trait StopCondition: Send {
    /// True iff the current board satisfies the goal
    fn is_finished(&mut self, board: &Board, sub: Option<&SubGoal>) -> bool;

    /// Complete the extracted control sequence; runs with the board restored
    /// to the solution state
    fn finalize(&mut self, board: &mut Board, base: Vec<Direction>) -> Option<Vec<Direction>> {
        let _ = board;
        Some(base)
    }
}

/// Finished once a polyomino matches the target shape at the target anchor
pub struct DefaultStop {
    target: TargetShape,
}

impl DefaultStop {
    /// Set up for an instance
    pub fn new(target: &TargetShape) -> Self {
        Self {
            target: target.clone(),
        }
    }
}

impl StopCondition for DefaultStop {
    fn is_finished(&mut self, board: &Board, _sub: Option<&SubGoal>) -> bool {
        board.live_polyominoes().any(|(_, p)| {
            p.position() == self.target.position() && p.shape_equals(&self.target)
        })
    }
}

/// Finished once a matching polyomino exists anywhere inside the target's
/// reachable region; the final rigid walk to the anchor is appended at
/// extraction time
pub struct NoLeftoversStop {
    target: TargetShape,
    target_area: FxHashSet<Cell>,
}

impl NoLeftoversStop {
    /// Set up for an instance; the reachable region is computed once
    pub fn new(board: &Board, target: &TargetShape) -> Self {
        let shape: Vec<Cell> = target.cells().iter().copied().collect();
        Self {
            target: target.clone(),
            target_area: reachable_set(board, &shape, target.position()),
        }
    }
}

impl StopCondition for NoLeftoversStop {
    fn is_finished(&mut self, board: &Board, _sub: Option<&SubGoal>) -> bool {
        board.live_polyominoes().any(|(_, p)| {
            p.shape_equals(&self.target) && self.target_area.contains(&p.position())
        })
    }

    fn finalize(&mut self, board: &mut Board, base: Vec<Direction>) -> Option<Vec<Direction>> {
        let (anchor, shape) = board.live_polyominoes().find_map(|(_, p)| {
            (p.shape_equals(&self.target) && self.target_area.contains(&p.position()))
                .then(|| (p.position(), p.shape()))
        })?;
        let end = shortest_sequence(board, &shape, anchor, self.target.position())?;
        let mut sequence = base;
        sequence.extend(end);
        Some(sequence)
    }
}

/// Finished once some movable polyomino touches the (concrete) target shape
/// and is blocked by walls or concrete in every direction
pub struct AnchoringStop {
    target: TargetShape,
}

impl AnchoringStop {
    /// Set up for an instance
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::InvalidAnchoringTarget`] when any target cell
    /// is not concrete.
    pub fn new(board: &Board, target: &TargetShape) -> Result<Self> {
        for (x, y) in target.absolute_cells() {
            let in_bounds =
                x >= 0 && y >= 0 && x < board.cols() as i32 && y < board.rows() as i32;
            if !in_bounds || !board.is_blocked(x, y) {
                return Err(SolverError::InvalidAnchoringTarget { cell: (x, y) });
            }
        }
        Ok(Self {
            target: target.clone(),
        })
    }
}

impl StopCondition for AnchoringStop {
    fn is_finished(&mut self, board: &Board, _sub: Option<&SubGoal>) -> bool {
        let mut adjacent = Vec::new();
        for cell in self.target.absolute_cells() {
            for neighbor in crate::spatial::direction::direct_neighbors(cell) {
                if let Some(id) = board.poly_id_at(neighbor) {
                    if !adjacent.contains(&id) {
                        adjacent.push(id);
                    }
                }
            }
        }
        adjacent.into_iter().any(|id| {
            Direction::ALL
                .into_iter()
                .all(|d| board.polyomino_blocked_by_terrain(id, d))
        })
    }
}

/// Sub-planner goal: the moved tile sits at its destination offset relative
/// to the growing polyomino's corner tile
pub struct TileAtDestination;

impl StopCondition for TileAtDestination {
    fn is_finished(&mut self, board: &Board, sub: Option<&SubGoal>) -> bool {
        let Some(sub) = sub else {
            return false;
        };
        let corner = board.tile(sub.corner_tile).position();
        let tile = board.tile(sub.tile).position();
        tile == (corner.0 + sub.destination.0, corner.1 + sub.destination.1)
    }
}

/// Default stop condition for an instance: when every tile is needed and no
/// seeds are fixed, no leftovers are allowed
pub fn default_stop_condition(instance: &Instance) -> Box<dyn StopCondition> {
    if instance.target_shape.size() == instance.board.number_of_tiles()
        && !instance.board.has_fixed_tiles()
    {
        Box::new(NoLeftoversStop::new(&instance.board, &instance.target_shape))
    } else {
        Box::new(DefaultStop::new(&instance.target_shape))
    }
}

fn control_sequence(nodes: &NodeArena, solution: NodeId) -> Vec<Direction> {
    let mut sequence = Vec::new();
    let mut current = solution;
    while let Some(parent) = nodes.get(current).parent {
        if let Some(direction) = nodes.get(current).last_move {
            sequence.push(direction);
        }
        current = parent;
    }
    sequence.reverse();
    sequence
}

/// Breadth-first motion planner over hashed board states
pub struct BfsPlanner {
    board: Board,
    pruners: Vec<Box<dyn Pruner>>,
    stop: Box<dyn StopCondition>,
    nodes: NodeArena,
    queue: VecDeque<NodeId>,
    visited: FxHashSet<u64>,
    solution: Option<NodeId>,
    token: CancelToken,
}

impl BfsPlanner {
    /// Create a planner for the instance with its default stop condition
    pub fn new(instance: &Instance, token: CancelToken) -> Self {
        let board = instance.board.clone();
        let stop = default_stop_condition(instance);
        let mut nodes = NodeArena::new();
        let root = nodes.alloc(Node {
            parent: None,
            last_move: None,
            state: Some(board.get_state()),
            candidate_moves: DirectionSet::ALL,
            extras: None,
        });
        Self {
            board,
            pruners: Vec::new(),
            stop,
            nodes,
            queue: VecDeque::from([root]),
            visited: FxHashSet::default(),
            solution: None,
            token,
        }
    }

    /// Replace the stop condition
    pub fn set_stop_condition(&mut self, stop: Box<dyn StopCondition>) {
        self.stop = stop;
    }

    /// Register a pruner; registration order is evaluation order
    pub fn add_pruner(&mut self, pruner: Box<dyn Pruner>) {
        self.pruners.push(pruner);
    }

    fn load(&mut self, node: NodeId) {
        if let Some(state) = self.nodes.get(node).state.as_ref() {
            self.board.restore_state(state);
        }
    }

    fn create_node(&mut self, parent: NodeId, direction: Direction) -> NodeId {
        self.nodes.alloc(Node {
            parent: Some(parent),
            last_move: Some(direction),
            state: Some(self.board.get_state()),
            candidate_moves: DirectionSet::ALL,
            extras: None,
        })
    }

    fn try_step(&mut self, parent: NodeId, direction: Direction) {
        if self.board.step(direction).is_empty() {
            return;
        }
        let hash = self.board.state_hash();
        if self.visited.contains(&hash) {
            return;
        }
        let changed = self.board.activate_glues();
        let mut pruned = false;
        for pruner in &mut self.pruners {
            if pruner.is_prunable(&mut self.board, None, &changed) {
                pruned = true;
                break;
            }
        }
        if pruned {
            return;
        }
        let child = self.create_node(parent, direction);
        if self.stop.is_finished(&self.board, None) {
            self.solution = Some(child);
        }
        self.visited.insert(hash);
        self.queue.push_back(child);
    }

    fn expand(&mut self, node: NodeId) {
        let moves = self.nodes.get(node).candidate_moves;
        for direction in moves.iter() {
            self.load(node);
            self.try_step(node, direction);
        }
        if Some(node) != self.solution {
            self.nodes.get_mut(node).state = None;
        }
    }

    /// Run the search, optionally bounded by a created-node budget
    pub fn solve_with_budget(&mut self, max_nodes: Option<usize>) -> Option<Vec<Direction>> {
        if self.stop.is_finished(&self.board, None) {
            self.solution = Some(NodeId::ROOT);
        }
        while self.solution.is_none() && !self.token.is_cancelled() {
            if max_nodes.is_some_and(|budget| self.nodes.len() > budget) {
                break;
            }
            let Some(node) = self.queue.pop_front() else {
                break;
            };
            self.expand(node);
        }
        self.extract_solution()
    }
}

impl Solver for BfsPlanner {
    fn solve(&mut self) -> Result<Option<Vec<Direction>>> {
        Ok(self.solve_with_budget(None))
    }

    fn extract_solution(&mut self) -> Option<Vec<Direction>> {
        let solution = self.solution?;
        let base = control_sequence(&self.nodes, solution);
        if let Some(state) = self.nodes.get(solution).state.as_ref() {
            self.board.restore_state(state);
        }
        self.stop.finalize(&mut self.board, base)
    }

    fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Constant goal data of a single-tile sub-planner search
#[derive(Debug, Clone, Copy)]
pub struct SubSpec {
    /// Destination of the moved tile relative to the polyomino anchor
    pub destination: Cell,
    /// Anchor offset of the polyomino within the final target shape
    pub offset: Cell,
    /// Size of the polyomino before the tile joins
    pub poly_size: usize,
}

/// Weighted A*-style best-first motion planner
///
/// The open queue is ordered by `heuristic(score)`; a `best_node` with the
/// lowest estimate seen so far keeps its snapshot for partial-progress
/// restarts.
pub struct BestFirstPlanner {
    board: Board,
    pruners: Vec<Box<dyn Pruner>>,
    stop: Box<dyn StopCondition>,
    heuristic: Box<dyn Heuristic>,
    nodes: NodeArena,
    queue: BinaryHeap<Reverse<Priority>>,
    sequence: u64,
    score: FxHashMap<u64, f64>,
    solution: Option<NodeId>,
    best_node: NodeId,
    best_value: f64,
    token: CancelToken,
    sub_spec: Option<SubSpec>,
    sub: Option<SubGoal>,
}

impl BestFirstPlanner {
    /// Create a planner over a board clone with explicit stop and heuristic
    pub fn new(
        instance: &Instance,
        heuristic: Box<dyn Heuristic>,
        stop: Box<dyn StopCondition>,
        token: CancelToken,
    ) -> Self {
        Self::build(instance.board.clone(), heuristic, stop, None, None, token)
    }

    /// Create a sub-planner sharing the engine but tracking a moved tile
    pub fn with_sub_goal(
        board: Board,
        heuristic: Box<dyn Heuristic>,
        stop: Box<dyn StopCondition>,
        spec: SubSpec,
        root_extras: NodeExtras,
        token: CancelToken,
    ) -> Self {
        Self::build(
            board,
            heuristic,
            stop,
            Some(spec),
            Some(root_extras),
            token,
        )
    }

    fn build(
        board: Board,
        mut heuristic: Box<dyn Heuristic>,
        stop: Box<dyn StopCondition>,
        sub_spec: Option<SubSpec>,
        root_extras: Option<NodeExtras>,
        token: CancelToken,
    ) -> Self {
        let mut nodes = NodeArena::new();
        let root = nodes.alloc(Node {
            parent: None,
            last_move: None,
            state: Some(board.get_state()),
            candidate_moves: DirectionSet::ALL,
            extras: root_extras,
        });

        let sub = match (sub_spec, root_extras) {
            (Some(spec), Some(extras)) => {
                match (
                    board.tile_id_at(extras.poly_anchor),
                    board.tile_id_at(extras.tile_position),
                ) {
                    (Some(corner_tile), Some(tile)) => Some(SubGoal {
                        poly: board.poly_of(corner_tile),
                        corner_tile,
                        tile,
                        destination: spec.destination,
                        offset: spec.offset,
                        poly_size: spec.poly_size,
                    }),
                    _ => None,
                }
            }
            _ => None,
        };
        let best_value = heuristic.estimate(&board, sub.as_ref(), 0.0);

        let mut planner = Self {
            board,
            pruners: Vec::new(),
            stop,
            heuristic,
            nodes,
            queue: BinaryHeap::new(),
            sequence: 0,
            score: FxHashMap::default(),
            solution: None,
            best_node: root,
            best_value,
            token,
            sub_spec,
            sub,
        };
        planner.score.insert(planner.board.state_hash(), 0.0);
        planner.push(best_value, root);
        planner
    }

    /// Register a pruner; registration order is evaluation order
    pub fn add_pruner(&mut self, pruner: Box<dyn Pruner>) {
        self.pruners.push(pruner);
    }

    /// Replace the stop condition
    pub fn set_stop_condition(&mut self, stop: Box<dyn StopCondition>) {
        self.stop = stop;
    }

    /// The board owned by this planner
    pub const fn board(&self) -> &Board {
        &self.board
    }

    /// Restore the planner's board to the best node seen so far and return
    /// its control sequence
    pub fn best_sequence(&mut self) -> Vec<Direction> {
        if let Some(state) = self.nodes.get(self.best_node).state.as_ref() {
            self.board.restore_state(state);
        }
        control_sequence(&self.nodes, self.best_node)
    }

    /// Lowest heuristic estimate observed so far
    pub const fn best_value(&self) -> f64 {
        self.best_value
    }

    fn push(&mut self, estimate: f64, node: NodeId) {
        let entry = Priority {
            estimate,
            sequence: self.sequence,
            node,
        };
        self.sequence += 1;
        self.queue.push(Reverse(entry));
    }

    fn resolve_sub(&mut self, node: NodeId) {
        self.sub = None;
        let Some(spec) = self.sub_spec else {
            return;
        };
        let Some(extras) = self.nodes.get(node).extras else {
            return;
        };
        let Some(corner_tile) = self.board.tile_id_at(extras.poly_anchor) else {
            return;
        };
        let Some(tile) = self.board.tile_id_at(extras.tile_position) else {
            return;
        };
        self.sub = Some(SubGoal {
            poly: self.board.poly_of(corner_tile),
            corner_tile,
            tile,
            destination: spec.destination,
            offset: spec.offset,
            poly_size: spec.poly_size,
        });
    }

    fn load(&mut self, node: NodeId) {
        if let Some(state) = self.nodes.get(node).state.as_ref() {
            self.board.restore_state(state);
        }
        self.resolve_sub(node);
    }

    fn current_extras(&self) -> Option<NodeExtras> {
        let sub = self.sub.as_ref()?;
        let anchor = self
            .board
            .polyomino(self.board.poly_of(sub.corner_tile))
            .map_or_else(|| self.board.tile(sub.corner_tile).position(), |p| p.position());
        Some(NodeExtras {
            poly_anchor: anchor,
            tile_position: self.board.tile(sub.tile).position(),
        })
    }

    fn create_node(&mut self, parent: NodeId, direction: Direction) -> NodeId {
        let extras = self.current_extras();
        self.nodes.alloc(Node {
            parent: Some(parent),
            last_move: Some(direction),
            state: Some(self.board.get_state()),
            candidate_moves: DirectionSet::ALL,
            extras,
        })
    }

    fn try_step(&mut self, parent: NodeId, direction: Direction, current_score: f64) {
        if self.board.step(direction).is_empty() {
            return;
        }
        let hash = self.board.state_hash();
        let child_score = current_score + 1.0;
        if child_score >= self.score.get(&hash).copied().unwrap_or(f64::INFINITY) {
            return;
        }
        let changed = self.board.activate_glues();
        let mut pruned = false;
        for pruner in &mut self.pruners {
            if pruner.is_prunable(&mut self.board, self.sub.as_ref(), &changed) {
                pruned = true;
                break;
            }
        }
        if pruned {
            self.score.insert(hash, f64::INFINITY);
            return;
        }
        self.score.insert(hash, child_score);

        let finished = self.stop.is_finished(&self.board, self.sub.as_ref());
        let estimate = self
            .heuristic
            .estimate(&self.board, self.sub.as_ref(), child_score);
        if finished {
            let child = self.create_node(parent, direction);
            self.solution = Some(child);
            if estimate.is_finite() {
                self.push(estimate, child);
            }
            return;
        }
        if estimate.is_infinite() {
            return;
        }
        let child = self.create_node(parent, direction);
        self.push(estimate, child);
        if estimate < self.best_value {
            self.best_node = child;
            self.best_value = estimate;
        }
    }

    fn expand(&mut self, node: NodeId) {
        let moves = self.nodes.get(node).candidate_moves;
        let mut current_score = None;
        for direction in moves.iter() {
            self.load(node);
            let score = *current_score.get_or_insert_with(|| {
                self.score
                    .get(&self.board.state_hash())
                    .copied()
                    .unwrap_or(0.0)
            });
            self.try_step(node, direction, score);
        }
        if node != self.best_node && Some(node) != self.solution {
            self.nodes.get_mut(node).state = None;
        }
    }

    /// Run the search, optionally bounded by a created-node budget
    pub fn solve_with_budget(&mut self, max_nodes: Option<usize>) -> Option<Vec<Direction>> {
        self.load(NodeId::ROOT);
        if self.stop.is_finished(&self.board, self.sub.as_ref()) {
            self.solution = Some(NodeId::ROOT);
        }
        while self.solution.is_none() && !self.token.is_cancelled() {
            if max_nodes.is_some_and(|budget| self.nodes.len() > budget) {
                break;
            }
            let Some(Reverse(entry)) = self.queue.pop() else {
                break;
            };
            self.expand(entry.node);
        }
        self.extract_solution()
    }
}

impl Solver for BestFirstPlanner {
    fn solve(&mut self) -> Result<Option<Vec<Direction>>> {
        Ok(self.solve_with_budget(None))
    }

    fn extract_solution(&mut self) -> Option<Vec<Direction>> {
        let solution = self.solution?;
        let base = control_sequence(&self.nodes, solution);
        if let Some(state) = self.nodes.get(solution).state.as_ref() {
            self.board.restore_state(state);
        }
        self.stop.finalize(&mut self.board, base)
    }

    fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }
}

/// Build the default best-first planner for an instance
///
/// Stop condition and pruners follow the instance shape: when every tile is
/// needed and no seeds are fixed, the no-leftovers variants are used; fixed
/// boards additionally reject glue contacts outside the target cells.
pub fn get_motion_planner(
    instance: &Instance,
    kind: HeuristicKind,
    precomputed: Option<&Array2<f64>>,
    config: &PlannerConfig,
    token: CancelToken,
) -> BestFirstPlanner {
    let heuristic = kind.build(&instance.board, &instance.target_shape, precomputed);
    get_motion_planner_with(instance, heuristic, config, token)
}

/// Like [`get_motion_planner`], but with a caller-supplied heuristic
pub fn get_motion_planner_with(
    instance: &Instance,
    heuristic: Box<dyn Heuristic>,
    config: &PlannerConfig,
    token: CancelToken,
) -> BestFirstPlanner {
    let stop = default_stop_condition(instance);
    let mut planner = BestFirstPlanner::new(instance, heuristic, stop, token);
    let target = &instance.target_shape;
    if instance.target_shape.size() == instance.board.number_of_tiles()
        && !instance.board.has_fixed_tiles()
    {
        planner.add_pruner(Box::new(NotEnoughTilesNoLeftovers::new(target)));
        planner.add_pruner(Box::new(PackingNoLeftovers::new(
            target,
            config.packing_pruner_polyominoes,
        )));
    } else {
        planner.add_pruner(Box::new(NotEnoughTiles::new(target)));
        planner.add_pruner(Box::new(Packing::new(target)));
    }
    if instance.board.has_fixed_tiles() {
        planner.add_pruner(Box::new(TilesGluedOutsideTargetArea::new(target)));
    }
    planner
}

/// Build the planner that anchors a movable polyomino against the (concrete)
/// target shape
///
/// # Errors
///
/// Returns [`SolverError::InvalidAnchoringTarget`] when the target shape is
/// not entirely concrete.
pub fn get_anchoring_motion_planner(
    instance: &Instance,
    token: CancelToken,
) -> Result<BestFirstPlanner> {
    let stop = AnchoringStop::new(&instance.board, &instance.target_shape)?;
    let heuristic = Box::new(WeightedDistanceSumAnchoring::new(
        &instance.board,
        &instance.target_shape,
    ));
    Ok(BestFirstPlanner::new(
        instance,
        heuristic,
        Box::new(stop),
        token,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{GlueRules, Tile};

    fn single_tile_instance() -> Instance {
        let mut board = Board::new(3, 3, GlueRules::reflexive());
        board.add_tile(Tile::at((2, 2)));
        Instance {
            board,
            target_shape: TargetShape::new(vec![Tile::at((0, 0))]),
        }
    }

    #[test]
    fn test_bfs_solves_single_tile_to_corner() {
        let instance = single_tile_instance();
        let mut planner = BfsPlanner::new(&instance, CancelToken::new());
        let solution = planner.solve().unwrap().unwrap();
        let mut board = instance.board.clone();
        for direction in &solution {
            board.step(*direction);
            board.activate_glues();
        }
        let (_, tile) = board.tiles().next().unwrap();
        assert_eq!(tile.position(), (0, 0));
        assert!(planner.number_of_nodes() > 0);
    }

    #[test]
    fn test_best_first_solves_and_is_deterministic() {
        let instance = single_tile_instance();
        let config = PlannerConfig::default();
        let solve = || {
            let mut planner = get_motion_planner(
                &instance,
                HeuristicKind::GreatestDistance,
                None,
                &config,
                CancelToken::new(),
            );
            planner.solve().unwrap().unwrap()
        };
        let first = solve();
        let second = solve();
        assert_eq!(first, second);
        // four unit moves are needed on an empty 3x3 from (2, 2) to (0, 0)
        assert_eq!(first.len(), 4);
    }

    #[test]
    fn test_unsolvable_instance_terminates_without_solution() {
        let mut board = Board::new(3, 3, GlueRules::reflexive());
        board.add_concrete(1, 0);
        board.add_concrete(0, 1);
        board.add_tile(Tile::at((0, 0)));
        let instance = Instance {
            board,
            target_shape: TargetShape::new(vec![Tile::at((2, 2))]),
        };
        let mut planner = BfsPlanner::new(&instance, CancelToken::new());
        assert_eq!(planner.solve().unwrap(), None);
        // the stuck tile admits no moves at all
        assert_eq!(planner.number_of_nodes(), 1);
    }

    #[test]
    fn test_cancellation_returns_without_solution() {
        let instance = single_tile_instance();
        let token = CancelToken::new();
        token.cancel();
        let mut planner = BfsPlanner::new(&instance, token);
        assert_eq!(planner.solve().unwrap(), None);
    }
}
