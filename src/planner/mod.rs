//! Motion planners: search engines, heuristics, pruners, and explorers

/// Single-tile sub-planner and the one-tile-at-a-time driver
pub mod assembly;
/// Blueprint assignment and build-order generation
pub mod build_order;
/// Scoring functions over board states
pub mod heuristic;
/// Search-tree nodes and deterministic priorities
pub mod node;
/// Branch-cutting predicates
pub mod pruner;
/// RRT-style configuration-space exploration
pub mod rrt;
/// BFS and best-first search engines with stop conditions
pub mod search;
/// Solution post-processing
pub mod shorten;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::board::{Board, PolyId, TargetShape, TileId};
use crate::io::configuration::{
    BLUEPRINT_DEADLINE_SECS, BUILD_ORDER_TIMEOUT_SECS, DEFAULT_SEED, PACKING_PRUNER_POLYOMINOES,
    PRECOMPUTATION_TIMEOUT_SECS, RRT_BLUEPRINT_PROBE_MS, RRT_CLOSING_BUDGET,
    RRT_CLOSING_DISTANCE, RRT_GOAL_BIAS, RRT_GOAL_BUDGET, RRT_LOCAL_BUDGET,
};
use crate::io::error::Result;
use crate::spatial::{Cell, Direction};

/// A problem instance: an initial board and the shape to assemble
#[derive(Debug, Clone)]
pub struct Instance {
    /// Initial board state
    pub board: Board,
    /// Shape to assemble, positioned where it should be built
    pub target_shape: TargetShape,
}

/// Cooperative cancellation flag shared between a planner and its supervisor
///
/// Cancellation is idempotent; planners poll the flag at every node
/// expansion and at every build-order yield.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a fresh, unset token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// True once cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Every tunable of the planners, passed explicitly instead of living in
/// process-wide state
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Seed for every pseudorandom choice (blueprints, RRT sampling)
    pub seed: u64,
    /// Overall deadline for blueprint and build-order search
    pub blueprint_deadline: Duration,
    /// Budget per blueprint attempt or build-order yield
    pub build_order_timeout: Duration,
    /// Deadline for heuristic pre-computation
    pub precompute_timeout: Duration,
    /// Number of largest polyominoes tested by the no-leftovers packing pruner
    pub packing_pruner_polyominoes: usize,
    /// RRT: probability of a goal-directed expansion
    pub rrt_bias: f64,
    /// RRT: node budget of a goal-directed expansion
    pub rrt_goal_budget: usize,
    /// RRT: node budget of the long gap-closing expansion
    pub rrt_closing_budget: usize,
    /// RRT: node budget of a local expansion toward a sample
    pub rrt_local_budget: usize,
    /// RRT: target distance below which gap closing is attempted
    pub rrt_closing_distance: f64,
    /// RRT: budget per blueprint probe in the target distance
    pub rrt_blueprint_probe: Duration,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED,
            blueprint_deadline: Duration::from_secs(BLUEPRINT_DEADLINE_SECS),
            build_order_timeout: Duration::from_secs(BUILD_ORDER_TIMEOUT_SECS),
            precompute_timeout: Duration::from_secs(PRECOMPUTATION_TIMEOUT_SECS),
            packing_pruner_polyominoes: PACKING_PRUNER_POLYOMINOES,
            rrt_bias: RRT_GOAL_BIAS,
            rrt_goal_budget: RRT_GOAL_BUDGET,
            rrt_closing_budget: RRT_CLOSING_BUDGET,
            rrt_local_budget: RRT_LOCAL_BUDGET,
            rrt_closing_distance: RRT_CLOSING_DISTANCE,
            rrt_blueprint_probe: Duration::from_millis(RRT_BLUEPRINT_PROBE_MS),
        }
    }
}

/// The current sub-planner goal, re-resolved from node extras at every load
///
/// `corner_tile` is the tile sitting at the growing polyomino's anchor; it
/// survives merges, so the polyomino can always be re-identified through it.
#[derive(Debug, Clone, Copy)]
pub struct SubGoal {
    /// The growing polyomino as resolved for the loaded node
    pub poly: PolyId,
    /// Tile at the polyomino's anchor cell
    pub corner_tile: TileId,
    /// The tile being moved
    pub tile: TileId,
    /// Goal offset of the moved tile relative to the polyomino anchor
    pub destination: Cell,
    /// Anchor offset of the polyomino within the final target shape
    pub offset: Cell,
    /// Size of the polyomino before the tile is added
    pub poly_size: usize,
}

/// Common surface of all planners driven by the experiment harness
pub trait Solver: Send {
    /// Run the search to completion, cancellation, or exhaustion
    ///
    /// # Errors
    ///
    /// Returns timeout kinds when a deadline fires and fatal kinds for
    /// structurally impossible instances.
    fn solve(&mut self) -> Result<Option<Vec<Direction>>>;

    /// Best solution found so far, if any; valid after cancellation
    fn extract_solution(&mut self) -> Option<Vec<Direction>>;

    /// Number of search nodes expanded or created so far
    fn number_of_nodes(&self) -> usize;
}
