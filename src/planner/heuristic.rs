//! Scoring functions consumed by the best-first planners
//!
//! Whole-board heuristics estimate how far a board is from containing the
//! target shape; the search orders its queue by `score + h` for admissible
//! heuristics and by the raw estimate for the greedy ones. Single-tile
//! heuristics guide the sub-planner and lean on pre-computed distance maps.

use std::collections::VecDeque;
use std::time::Instant;

use ndarray::Array2;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::{Board, TargetShape, TileId};
use crate::io::configuration::MAX_DISTANCE_TO_TARGET_AREA;
use crate::io::error::{Result, SolverError};
use crate::planner::{CancelToken, PlannerConfig, SubGoal};
use crate::spatial::direction::direct_neighbors;
use crate::spatial::pathfinding::{
    compute_distance_within_set, compute_distances, distance_field, nearest_tile, reachable_set,
};
use crate::spatial::Cell;

/// A scoring function over board states
pub trait Heuristic: Send {
    /// Estimate the priority of the current board given the path cost so far
    ///
    /// Lower is better; `f64::INFINITY` marks a state not worth expanding.
    fn estimate(&mut self, board: &Board, sub: Option<&SubGoal>, score: f64) -> f64;
}

/// Distance map plus the tile count needed by the target, shared by every
/// distance-based whole-board heuristic
struct DistanceContext {
    distances: Array2<f64>,
    tiles_needed: usize,
}

impl DistanceContext {
    fn new(board: &Board, target: &TargetShape, precomputed: Option<&Array2<f64>>) -> Self {
        let distances = precomputed.map_or_else(
            || compute_distances(board, target.absolute_cells()),
            Clone::clone,
        );
        Self {
            distances,
            tiles_needed: target.size(),
        }
    }

    fn distance(&self, cell: Cell) -> f64 {
        let (x, y) = cell;
        if x < 0 || y < 0 {
            return f64::INFINITY;
        }
        self.distances
            .get([x as usize, y as usize])
            .copied()
            .unwrap_or(f64::INFINITY)
    }

    /// The `tiles_needed` tiles closest to the target, with tiles whose
    /// polyomino can no longer reach the target pushed to the end
    fn n_closest(&self, board: &Board) -> Vec<TileId> {
        if self.tiles_needed >= board.number_of_tiles() {
            return board.tiles().map(|(id, _)| id).collect();
        }
        let mut ranked: Vec<(f64, TileId)> = board
            .tiles()
            .map(|(id, tile)| {
                let can_reach = board
                    .polyomino(board.poly_of(id))
                    .is_some_and(|p| p.can_reach);
                let d = if can_reach {
                    self.distance(tile.position())
                } else {
                    f64::INFINITY
                };
                (d, id)
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        ranked
            .into_iter()
            .take(self.tiles_needed)
            .map(|(_, id)| id)
            .collect()
    }
}

/// Whole-board heuristics selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeuristicKind {
    /// Max BFS distance of the k closest tiles; admissible
    GreatestDistance,
    /// Mean BFS distance of the k closest tiles; admissible
    AverageDistance,
    /// Minimum moves to pull k tiles into the target's x/y spans; admissible
    MaxXyDistances,
    /// Sum of squared distances of the k closest tiles; greedy
    WeightedDistanceSum,
    /// Max distance without the path cost; greedy
    GreedyGreatestDistance,
    /// Squared distances of a BFS-grown seed cluster; greedy
    DistanceToNearestTile,
    /// Weighted sum scaled by recently-returned tiles; greedy
    RepetitionPenalty,
}

impl HeuristicKind {
    /// Every selectable kind, in documentation order
    pub const ALL: [Self; 7] = [
        Self::GreatestDistance,
        Self::AverageDistance,
        Self::MaxXyDistances,
        Self::WeightedDistanceSum,
        Self::GreedyGreatestDistance,
        Self::DistanceToNearestTile,
        Self::RepetitionPenalty,
    ];

    /// CLI name of the heuristic
    pub const fn name(self) -> &'static str {
        match self {
            Self::GreatestDistance => "greatest-distance",
            Self::AverageDistance => "average-distance",
            Self::MaxXyDistances => "max-xy-distances",
            Self::WeightedDistanceSum => "weighted-distance-sum",
            Self::GreedyGreatestDistance => "greedy-greatest-distance",
            Self::DistanceToNearestTile => "distance-to-nearest-tile",
            Self::RepetitionPenalty => "repetition-penalty",
        }
    }

    /// Resolve a CLI name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Instantiate the heuristic for an instance
    pub fn build(
        self,
        board: &Board,
        target: &TargetShape,
        precomputed: Option<&Array2<f64>>,
    ) -> Box<dyn Heuristic> {
        let ctx = DistanceContext::new(board, target, precomputed);
        match self {
            Self::GreatestDistance => Box::new(GreatestDistance { ctx }),
            Self::AverageDistance => Box::new(AverageDistance { ctx }),
            Self::MaxXyDistances => {
                let xs: Vec<i32> = target.tiles().iter().map(|t| t.x).collect();
                let ys: Vec<i32> = target.tiles().iter().map(|t| t.y).collect();
                Box::new(MaxXyDistances {
                    ctx,
                    left: xs.iter().copied().min().unwrap_or(0),
                    right: xs.iter().copied().max().unwrap_or(0),
                    down: ys.iter().copied().min().unwrap_or(0),
                    up: ys.iter().copied().max().unwrap_or(0),
                })
            }
            Self::WeightedDistanceSum => Box::new(WeightedDistanceSum { ctx, exponent: 2 }),
            Self::GreedyGreatestDistance => Box::new(GreedyGreatestDistance { ctx }),
            Self::DistanceToNearestTile => Box::new(DistanceToNearestTile {
                destination: target.absolute_cells().collect(),
                ctx,
            }),
            Self::RepetitionPenalty => Box::new(RepetitionPenalty {
                ctx,
                exponent: 2,
                history: VecDeque::new(),
            }),
        }
    }
}

struct GreatestDistance {
    ctx: DistanceContext,
}

impl Heuristic for GreatestDistance {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, score: f64) -> f64 {
        let closest = self.ctx.n_closest(board);
        if closest.len() < self.ctx.tiles_needed {
            return f64::INFINITY;
        }
        closest
            .iter()
            .map(|id| self.ctx.distance(board.tile(*id).position()))
            .fold(0.0, f64::max)
            + score
    }
}

struct AverageDistance {
    ctx: DistanceContext,
}

impl Heuristic for AverageDistance {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, score: f64) -> f64 {
        let closest = self.ctx.n_closest(board);
        if closest.len() < self.ctx.tiles_needed {
            return f64::INFINITY;
        }
        let sum: f64 = closest
            .iter()
            .map(|id| self.ctx.distance(board.tile(*id).position()))
            .sum();
        sum / self.ctx.tiles_needed as f64 + score
    }
}

struct MaxXyDistances {
    ctx: DistanceContext,
    left: i32,
    right: i32,
    down: i32,
    up: i32,
}

impl Heuristic for MaxXyDistances {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, score: f64) -> f64 {
        let closest = self.ctx.n_closest(board);
        if closest.len() < self.ctx.tiles_needed {
            return f64::INFINITY;
        }
        let xs: Vec<i32> = closest.iter().map(|id| board.tile(*id).x).collect();
        let ys: Vec<i32> = closest.iter().map(|id| board.tile(*id).y).collect();
        let (x_min, x_max) = (
            xs.iter().copied().min().unwrap_or(0),
            xs.iter().copied().max().unwrap_or(0),
        );
        let (y_min, y_max) = (
            ys.iter().copied().min().unwrap_or(0),
            ys.iter().copied().max().unwrap_or(0),
        );

        // a single tilt can close the span from one side only
        let x_moves = if x_min < self.left && x_max > self.right {
            (x_max - self.right).abs() + (x_min - self.left).abs()
        } else {
            (x_max - self.right).abs().max((x_min - self.left).abs())
        };
        let y_moves = if y_min < self.down && y_max > self.up {
            (y_max - self.up).abs() + (y_min - self.down).abs()
        } else {
            (y_max - self.up).abs().max((y_min - self.down).abs())
        };
        f64::from(x_moves + y_moves) + score
    }
}

struct WeightedDistanceSum {
    ctx: DistanceContext,
    exponent: i32,
}

impl Heuristic for WeightedDistanceSum {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, _score: f64) -> f64 {
        let closest = self.ctx.n_closest(board);
        if closest.len() < self.ctx.tiles_needed {
            return f64::INFINITY;
        }
        closest
            .iter()
            .map(|id| self.ctx.distance(board.tile(*id).position()).powi(self.exponent))
            .sum()
    }
}

struct GreedyGreatestDistance {
    ctx: DistanceContext,
}

impl Heuristic for GreedyGreatestDistance {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, _score: f64) -> f64 {
        let closest = self.ctx.n_closest(board);
        if closest.len() < self.ctx.tiles_needed {
            return f64::INFINITY;
        }
        closest
            .iter()
            .map(|id| self.ctx.distance(board.tile(*id).position()))
            .fold(0.0, f64::max)
    }
}

struct DistanceToNearestTile {
    ctx: DistanceContext,
    destination: FxHashSet<Cell>,
}

impl Heuristic for DistanceToNearestTile {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, _score: f64) -> f64 {
        let Some((seed_tile, _)) = nearest_tile(board, &self.destination) else {
            return f64::INFINITY;
        };
        let Some(seed_poly) = board.polyomino(board.poly_of(seed_tile)) else {
            return f64::INFINITY;
        };

        // grow a BFS cluster around the seed polyomino until it holds enough
        // tiles, then weight each by its squared cluster distance
        let mut tiles: Vec<TileId> = seed_poly.tile_ids().collect();
        let mut distance: FxHashMap<Cell, u32> = seed_poly
            .absolute_cells()
            .map(|cell| (cell, 0))
            .collect();
        let mut active: VecDeque<Cell> = distance.keys().copied().collect();
        while tiles.len() < self.ctx.tiles_needed {
            let Some(current) = active.pop_front() else {
                return f64::INFINITY;
            };
            let d = distance.get(&current).copied().unwrap_or(0);
            for cell in direct_neighbors(current) {
                if board.is_blocked(cell.0, cell.1) || distance.contains_key(&cell) {
                    continue;
                }
                distance.insert(cell, d + 1);
                active.push_back(cell);
                if let Some(tile) = board.tile_id_at(cell) {
                    tiles.push(tile);
                }
            }
        }
        tiles
            .iter()
            .map(|id| {
                let d = distance
                    .get(&board.tile(*id).position())
                    .copied()
                    .unwrap_or(0);
                f64::from(d * d)
            })
            .sum()
    }
}

struct RepetitionPenalty {
    ctx: DistanceContext,
    exponent: i32,
    /// Tile positions observed at the most recent estimates, oldest first
    history: VecDeque<FxHashMap<TileId, Cell>>,
}

impl RepetitionPenalty {
    const HISTORY_LENGTH: usize = 10;
}

impl Heuristic for RepetitionPenalty {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, _score: f64) -> f64 {
        let closest = self.ctx.n_closest(board);
        if closest.len() < self.ctx.tiles_needed {
            return f64::INFINITY;
        }

        let mut value = 0.0;
        let mut repeated = 0u32;
        for id in &closest {
            let current = board.tile(*id).position();
            let mut moved_away = false;
            for snapshot in &self.history {
                let Some(previous) = snapshot.get(id) else {
                    continue;
                };
                if *previous != current {
                    moved_away = true;
                } else if moved_away {
                    repeated += 1;
                    break;
                }
            }
            value += self.ctx.distance(current).powi(self.exponent);
        }

        if self.history.len() == Self::HISTORY_LENGTH {
            self.history.pop_front();
        }
        self.history
            .push_back(board.tiles().map(|(id, t)| (id, t.position())).collect());

        value * f64::from(repeated)
    }
}

/// Sum of squared distances over every tile; used by the anchoring planner
/// where the anchor shape is the target
pub struct WeightedDistanceSumAnchoring {
    ctx: DistanceContext,
    exponent: i32,
}

impl WeightedDistanceSumAnchoring {
    /// Build the anchoring heuristic for an instance
    pub fn new(board: &Board, target: &TargetShape) -> Self {
        Self {
            ctx: DistanceContext::new(board, target, None),
            exponent: 2,
        }
    }
}

impl Heuristic for WeightedDistanceSumAnchoring {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, _score: f64) -> f64 {
        board
            .tiles()
            .map(|(_, tile)| self.ctx.distance(tile.position()).powi(self.exponent))
            .sum()
    }
}

/// Single-tile heuristics selectable by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SingleTileHeuristicKind {
    /// Lower-bound moves from pre-computed all-pairs distances; admissible
    MinimumMoves,
    /// Minimum moves weighted by distance to the target area
    MinimumMovesAndTargetArea,
    /// Half the map distance plus taxicab, without the path cost; greedy
    GreedyDistance,
    /// BFS distance to the anchor destination around a fixed polyomino
    FixedDestination,
    /// Like `FixedDestination` but without the path cost; greedy
    GreedyFixedDestination,
}

/// Distance maps produced by single-tile pre-computation
pub enum SingleTilePrecomputed {
    /// Nothing to pre-compute
    None,
    /// One distance map per free board cell
    AllCells {
        /// Distance map keyed by source cell
        maps: FxHashMap<Cell, Array2<f64>>,
    },
    /// Maps restricted to the extended target area
    TargetArea {
        /// The extended target area
        area: FxHashSet<Cell>,
        /// Distance map keyed by source cell, expansion confined to the area
        maps: FxHashMap<Cell, Array2<f64>>,
    },
}

impl SingleTileHeuristicKind {
    /// Every selectable kind, in documentation order
    pub const ALL: [Self; 5] = [
        Self::MinimumMoves,
        Self::MinimumMovesAndTargetArea,
        Self::GreedyDistance,
        Self::FixedDestination,
        Self::GreedyFixedDestination,
    ];

    /// CLI name of the heuristic
    pub const fn name(self) -> &'static str {
        match self {
            Self::MinimumMoves => "minimum-moves",
            Self::MinimumMovesAndTargetArea => "minimum-moves-target-area",
            Self::GreedyDistance => "greedy-distance",
            Self::FixedDestination => "fixed-destination",
            Self::GreedyFixedDestination => "greedy-fixed-destination",
        }
    }

    /// Resolve a CLI name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Run the pre-computation this heuristic needs before planning starts
    ///
    /// # Errors
    ///
    /// Returns [`SolverError::PreComputationTimeout`] when the configured
    /// deadline fires or the planner is cancelled.
    pub fn precompute(
        self,
        board: &Board,
        target: &TargetShape,
        config: &PlannerConfig,
        token: &CancelToken,
    ) -> Result<SingleTilePrecomputed> {
        let deadline = Instant::now() + config.precompute_timeout;
        match self {
            Self::MinimumMoves | Self::GreedyDistance => {
                let mut maps = FxHashMap::default();
                for x in 0..board.cols() as i32 {
                    if Instant::now() > deadline || token.is_cancelled() {
                        return Err(SolverError::PreComputationTimeout {
                            operation: "all-cells distance maps",
                        });
                    }
                    for y in 0..board.rows() as i32 {
                        if board.is_blocked(x, y) {
                            continue;
                        }
                        maps.insert((x, y), compute_distances(board, [(x, y)]));
                    }
                }
                Ok(SingleTilePrecomputed::AllCells { maps })
            }
            Self::MinimumMovesAndTargetArea => {
                let area = extended_target_area(board, target);
                let mut maps = FxHashMap::default();
                for cell in &area {
                    if Instant::now() > deadline || token.is_cancelled() {
                        return Err(SolverError::PreComputationTimeout {
                            operation: "target-area distance maps",
                        });
                    }
                    maps.insert(*cell, compute_distance_within_set(board, [*cell], &area));
                }
                Ok(SingleTilePrecomputed::TargetArea { area, maps })
            }
            Self::FixedDestination | Self::GreedyFixedDestination => {
                Ok(SingleTilePrecomputed::None)
            }
        }
    }

    /// Instantiate the heuristic for one sub-planner run
    pub fn build(
        self,
        board: &Board,
        target: &TargetShape,
        sub: &SubGoal,
        pre: &SingleTilePrecomputed,
    ) -> Box<dyn Heuristic> {
        match self {
            Self::MinimumMoves | Self::GreedyDistance => {
                let maps = match pre {
                    SingleTilePrecomputed::AllCells { maps } => maps.clone(),
                    _ => FxHashMap::default(),
                };
                Box::new(MinimumMoves {
                    maps,
                    // the greedy variant works on the raw map distance
                    subtract_one: self == Self::MinimumMoves,
                    greedy: self == Self::GreedyDistance,
                })
            }
            Self::MinimumMovesAndTargetArea => {
                let maps = match pre {
                    SingleTilePrecomputed::TargetArea { maps, .. } => maps.clone(),
                    _ => FxHashMap::default(),
                };
                let plain_area = plain_target_area(board, target);
                let area_shape: Vec<Cell> = plain_area.iter().copied().collect();
                let distances_to_area = compute_distances(board, area_shape);
                // round the weighting factor up to the next power of two
                let weighting_factor = f64::from(
                    (plain_area.len().max(1) as u32).next_power_of_two(),
                );
                Box::new(MinimumMovesAndTargetArea {
                    maps,
                    distances_to_area,
                    weighting_factor,
                })
            }
            Self::FixedDestination | Self::GreedyFixedDestination => {
                let anchor = board
                    .polyomino(sub.poly)
                    .map_or((0, 0), |p| p.position());
                let destination = (
                    anchor.0 + sub.destination.0,
                    anchor.1 + sub.destination.1,
                );
                let blocked = blocked_by_fixed_polyominoes(board, sub.tile);
                let distances = distance_field([destination], |cell| {
                    !board.is_blocked(cell.0, cell.1) && !blocked.contains(&cell)
                });
                Box::new(FixedDestination {
                    distances,
                    greedy: self == Self::GreedyFixedDestination,
                })
            }
        }
    }
}

/// Target cells reachable by the target shape, without the BFS extension
fn plain_target_area(board: &Board, target: &TargetShape) -> FxHashSet<Cell> {
    let shape: Vec<Cell> = target.cells().iter().copied().collect();
    let mut area = FxHashSet::default();
    for anchor in reachable_set(board, &shape, target.position()) {
        for (dx, dy) in target.cells() {
            area.insert((anchor.0 + dx, anchor.1 + dy));
        }
    }
    area
}

/// The plain target area grown by a bounded BFS over free cells
fn extended_target_area(board: &Board, target: &TargetShape) -> FxHashSet<Cell> {
    let mut area = plain_target_area(board, target);
    let mut distance: FxHashMap<Cell, u32> = area.iter().map(|c| (*c, 0)).collect();
    let mut active: VecDeque<Cell> = distance.keys().copied().collect();
    while let Some(current) = active.pop_front() {
        let d = distance.get(&current).copied().unwrap_or(0);
        if d > MAX_DISTANCE_TO_TARGET_AREA {
            continue;
        }
        for cell in direct_neighbors(current) {
            if board.is_blocked(cell.0, cell.1) || distance.contains_key(&cell) {
                continue;
            }
            distance.insert(cell, d + 1);
            active.push_back(cell);
            area.insert(cell);
        }
    }
    area
}

/// Cells blocked by fixed polyominoes or sticky to the moved tile
fn blocked_by_fixed_polyominoes(board: &Board, mover: TileId) -> FxHashSet<Cell> {
    let mut blocked = FxHashSet::default();
    if !board.has_fixed_tiles() {
        return blocked;
    }
    let mover_glues = board.tile(mover).glues.clone();
    let mut fixed_polys: Vec<_> = board
        .fixed_tiles()
        .iter()
        .map(|t| board.poly_of(*t))
        .collect();
    fixed_polys.sort_unstable();
    fixed_polys.dedup();
    for poly_id in fixed_polys {
        let Some(poly) = board.polyomino(poly_id) else {
            continue;
        };
        for tile_id in poly.tile_ids() {
            let tile = board.tile(tile_id);
            blocked.insert(tile.position());
            for direction in crate::spatial::Direction::ALL {
                let cell = crate::spatial::direction::neighbor(tile.position(), direction);
                if board
                    .glue_rules()
                    .sticks(tile.glues.side(direction), mover_glues.side(direction.inverse()))
                {
                    blocked.insert(cell);
                }
            }
        }
    }
    blocked
}

fn sub_anchor(board: &Board, sub: &SubGoal) -> Cell {
    board
        .polyomino(board.poly_of(sub.corner_tile))
        .map_or((0, 0), |p| p.position())
}

fn min_neighbor_distance(board: &Board, map: &Array2<f64>, destination: Cell) -> f64 {
    let mut minimum = f64::INFINITY;
    for (x, y) in direct_neighbors(destination) {
        // the destination itself can sit inside a wall
        if board.is_blocked(x, y) {
            continue;
        }
        if let Some(d) = map.get([x as usize, y as usize]) {
            minimum = minimum.min(*d);
        }
    }
    minimum
}

struct MinimumMoves {
    maps: FxHashMap<Cell, Array2<f64>>,
    subtract_one: bool,
    greedy: bool,
}

impl Heuristic for MinimumMoves {
    fn estimate(&mut self, board: &Board, sub: Option<&SubGoal>, score: f64) -> f64 {
        let Some(sub) = sub else {
            return f64::INFINITY;
        };
        let tile_position = board.tile(sub.tile).position();
        let anchor = sub_anchor(board, sub);
        let dest = (
            anchor.0 + sub.destination.0,
            anchor.1 + sub.destination.1,
        );
        let Some(map) = self.maps.get(&tile_position) else {
            return f64::INFINITY;
        };
        let mut distance = min_neighbor_distance(board, map, dest);
        if self.subtract_one {
            distance -= 1.0;
        }
        let taxicab = f64::from(
            (tile_position.0 - dest.0).unsigned_abs() + (tile_position.1 - dest.1).unsigned_abs(),
        );
        if self.greedy {
            (distance / 2.0).trunc() + taxicab
        } else {
            ((distance - taxicab) / 2.0).trunc() + taxicab + score
        }
    }
}

struct MinimumMovesAndTargetArea {
    maps: FxHashMap<Cell, Array2<f64>>,
    distances_to_area: Array2<f64>,
    weighting_factor: f64,
}

impl MinimumMovesAndTargetArea {
    fn area_distance(&self, cell: Cell) -> f64 {
        let (x, y) = cell;
        if x < 0 || y < 0 {
            return f64::INFINITY;
        }
        self.distances_to_area
            .get([x as usize, y as usize])
            .copied()
            .unwrap_or(f64::INFINITY)
    }
}

impl Heuristic for MinimumMovesAndTargetArea {
    fn estimate(&mut self, board: &Board, sub: Option<&SubGoal>, score: f64) -> f64 {
        let Some(sub) = sub else {
            return f64::INFINITY;
        };
        let tile_position = board.tile(sub.tile).position();
        let anchor = sub_anchor(board, sub);
        let dest = (
            anchor.0 + sub.destination.0,
            anchor.1 + sub.destination.1,
        );

        let poly_distance = self.area_distance(anchor);
        let tile_distance = self.area_distance(tile_position);
        let dist_max = poly_distance.max(tile_distance);
        if dist_max > f64::from(MAX_DISTANCE_TO_TARGET_AREA) {
            // configurations entirely inside the target area expand first
            return dist_max * self.weighting_factor + score;
        }

        let Some(map) = self.maps.get(&tile_position) else {
            return f64::INFINITY;
        };
        let distance = min_neighbor_distance(board, map, dest);
        let taxicab = f64::from(
            (tile_position.0 - dest.0).unsigned_abs() + (tile_position.1 - dest.1).unsigned_abs(),
        );
        ((distance - taxicab) / 2.0).trunc() + taxicab + score
    }
}

struct FixedDestination {
    distances: FxHashMap<Cell, u32>,
    greedy: bool,
}

impl Heuristic for FixedDestination {
    fn estimate(&mut self, board: &Board, sub: Option<&SubGoal>, score: f64) -> f64 {
        let Some(sub) = sub else {
            return f64::INFINITY;
        };
        let tile_position = board.tile(sub.tile).position();
        let base = self
            .distances
            .get(&tile_position)
            .map_or(f64::INFINITY, |d| f64::from(*d));
        if self.greedy { base } else { base + score }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{GlueRules, Tile};

    fn single_cell_instance() -> (Board, TargetShape) {
        let mut board = Board::new(3, 3, GlueRules::reflexive());
        board.add_tile(Tile::at((2, 2)));
        let target = TargetShape::new(vec![Tile::at((0, 0))]);
        (board, target)
    }

    #[test]
    fn test_greatest_distance_is_bfs_distance_plus_score() {
        let (board, target) = single_cell_instance();
        let mut h = HeuristicKind::GreatestDistance.build(&board, &target, None);
        assert!((h.estimate(&board, None, 0.0) - 4.0).abs() < f64::EPSILON);
        assert!((h.estimate(&board, None, 3.0) - 7.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weighted_sum_ignores_score() {
        let (board, target) = single_cell_instance();
        let mut h = HeuristicKind::WeightedDistanceSum.build(&board, &target, None);
        let base = h.estimate(&board, None, 0.0);
        assert!((base - 16.0).abs() < f64::EPSILON);
        assert!((h.estimate(&board, None, 9.0) - base).abs() < f64::EPSILON);
    }

    #[test]
    fn test_max_xy_counts_span_moves() {
        let mut board = Board::new(5, 5, GlueRules::reflexive());
        board.add_tile(Tile::at((4, 0)));
        let target = TargetShape::new(vec![Tile::at((0, 4))]);
        let mut h = HeuristicKind::MaxXyDistances.build(&board, &target, None);
        // 4 west moves and 4 south moves
        assert!((h.estimate(&board, None, 0.0) - 8.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_kind_name_round_trip() {
        for kind in HeuristicKind::ALL {
            assert_eq!(HeuristicKind::from_name(kind.name()), Some(kind));
        }
        assert_eq!(HeuristicKind::from_name("no-such"), None);
        for kind in SingleTileHeuristicKind::ALL {
            assert_eq!(SingleTileHeuristicKind::from_name(kind.name()), Some(kind));
        }
    }

    #[test]
    fn test_precompute_all_cells_skips_walls() {
        let mut board = Board::new(2, 2, GlueRules::reflexive());
        board.add_concrete(0, 0);
        let target = TargetShape::new(vec![Tile::at((1, 1))]);
        let pre = SingleTileHeuristicKind::MinimumMoves
            .precompute(&board, &target, &PlannerConfig::default(), &CancelToken::new())
            .unwrap();
        match pre {
            SingleTilePrecomputed::AllCells { maps } => {
                assert_eq!(maps.len(), 3);
                assert!(!maps.contains_key(&(0, 0)));
            }
            _ => unreachable!("expected all-cells maps"),
        }
    }
}
