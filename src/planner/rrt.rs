//! RRT-style exploration of the configuration space
//!
//! When direct best-first search stalls, the explorer grows a tree of tile
//! configurations: mostly expanding toward random samples with short local
//! searches, occasionally straight toward the goal. Distances between
//! configurations come from glue-respecting matchings; nodes whose larger
//! polyominoes cannot be embedded into the other configuration are
//! infinitely far apart.

use std::sync::Arc;

use ndarray::Array2;
use petgraph::algo::matching::maximum_matching;
use petgraph::graph::UnGraph;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::{Board, Glues, TargetShape, TileId};
use crate::io::error::{Result, SolverError};
use crate::planner::build_order::blueprint_with_glue_types;
use crate::planner::heuristic::{Heuristic, HeuristicKind};
use crate::planner::search::{get_motion_planner, get_motion_planner_with};
use crate::planner::{CancelToken, Instance, PlannerConfig, Solver, SubGoal};
use crate::spatial::pathfinding::compute_distances;
use crate::spatial::shape::is_sub_shape_with_glues;
use crate::spatial::{Cell, Direction};

/// A configuration: one position per tile, indexed by tile id
///
/// Glues and the fixed-tile set live in the board arena, so positions are
/// all a configuration needs to carry.
#[derive(Debug, Clone)]
pub struct Configuration {
    positions: Vec<Cell>,
}

impl Configuration {
    /// Capture the configuration of a board
    pub fn from_board(board: &Board) -> Self {
        Self {
            positions: board.tiles().map(|(_, t)| t.position()).collect(),
        }
    }

    /// Load this configuration onto the board and close the glue partition
    pub fn apply(&self, board: &mut Board) {
        board.load_positions(&self.positions);
        board.activate_glues();
    }

    /// Canonical hash over the `(position, glues)` multiset
    pub fn canonical_hash(&self, board: &Board) -> u64 {
        use std::hash::{Hash, Hasher};
        let mut entries: Vec<(Cell, &Glues)> = self
            .positions
            .iter()
            .enumerate()
            .map(|(index, position)| (*position, &board.tile(TileId::from_index(index)).glues))
            .collect();
        entries.sort_by_key(|(cell, _)| *cell);
        let mut hasher = rustc_hash::FxHasher::default();
        for (cell, glues) in entries {
            cell.hash(&mut hasher);
            glues.hash(&mut hasher);
        }
        hasher.finish()
    }

    fn entries<'a>(&'a self, board: &'a Board) -> impl Iterator<Item = (Cell, &'a Glues)> {
        self.positions
            .iter()
            .enumerate()
            .map(|(index, position)| (*position, &board.tile(TileId::from_index(index)).glues))
    }
}

/// Matching-based distance metrics between configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistanceMetric {
    /// Symmetric max-min distance over glue-compatible partners
    Hausdorff,
    /// Bipartite matching minimizing the maximum edge
    Bottleneck,
    /// Sum of squared edge weights of a bottleneck matching
    BottleneckWeightedSum,
    /// Greedy approximation of the bottleneck matching
    GreedyBottleneck,
}

type Edge = (usize, usize, f64);

fn compatible_edges(
    c1: &Configuration,
    c2: &Configuration,
    board: &Board,
    dist: &dyn Fn(Cell, Cell) -> f64,
) -> Vec<Edge> {
    let left: Vec<(Cell, &Glues)> = c1.entries(board).collect();
    let right: Vec<(Cell, &Glues)> = c2.entries(board).collect();
    let mut edges = Vec::new();
    for (i, (p1, g1)) in left.iter().enumerate() {
        for (j, (p2, g2)) in right.iter().enumerate() {
            if g1 == g2 {
                let w = dist(*p1, *p2);
                if w.is_finite() {
                    edges.push((i, j, w));
                }
            }
        }
    }
    edges
}

fn perfect_matching_below(
    edges: &[Edge],
    node_count: usize,
    threshold: f64,
) -> Option<Vec<(usize, usize)>> {
    let mut graph: UnGraph<(), f64> = UnGraph::new_undirected();
    let left: Vec<_> = (0..node_count).map(|_| graph.add_node(())).collect();
    let right: Vec<_> = (0..node_count).map(|_| graph.add_node(())).collect();
    for (i, j, w) in edges {
        if *w <= threshold {
            graph.add_edge(left[*i], right[*j], *w);
        }
    }
    let matching = maximum_matching(&graph);
    if !matching.is_perfect() {
        return None;
    }
    let pairs = matching
        .edges()
        .map(|(a, b)| {
            let (a, b) = if a.index() < node_count { (a, b) } else { (b, a) };
            (a.index(), b.index() - node_count)
        })
        .collect();
    Some(pairs)
}

/// Binary search for the smallest edge threshold admitting a perfect
/// matching; returns the matching and its bottleneck weight
fn bottleneck_matching(
    edges: &[Edge],
    node_count: usize,
) -> Option<(Vec<(usize, usize)>, f64)> {
    if node_count == 0 {
        return Some((Vec::new(), 0.0));
    }
    let mut weights: Vec<f64> = edges.iter().map(|(_, _, w)| *w).collect();
    weights.sort_by(f64::total_cmp);
    weights.dedup();
    if weights.is_empty() {
        return None;
    }
    let last = *weights.last()?;
    let mut best = perfect_matching_below(edges, node_count, last)?;
    let mut bottleneck = last;

    let mut low = 0usize;
    let mut high = weights.len() - 1;
    while low < high {
        let mid = (low + high) / 2;
        if let Some(matching) = perfect_matching_below(edges, node_count, weights[mid]) {
            best = matching;
            bottleneck = weights[mid];
            high = mid;
        } else {
            low = mid + 1;
        }
    }
    Some((best, bottleneck))
}

impl DistanceMetric {
    /// Resolve a CLI name
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "hausdorff" => Some(Self::Hausdorff),
            "bottleneck" => Some(Self::Bottleneck),
            "bottleneck-weighted-sum" => Some(Self::BottleneckWeightedSum),
            "greedy-bottleneck" => Some(Self::GreedyBottleneck),
            _ => None,
        }
    }

    fn eval(
        self,
        c1: &Configuration,
        c2: &Configuration,
        board: &Board,
        dist: &dyn Fn(Cell, Cell) -> f64,
    ) -> f64 {
        match self {
            Self::Hausdorff => {
                let forward = Self::directed_hausdorff(c1, c2, board, dist);
                let backward = Self::directed_hausdorff(c2, c1, board, dist);
                forward.max(backward)
            }
            Self::Bottleneck => {
                let edges = compatible_edges(c1, c2, board, dist);
                bottleneck_matching(&edges, c1.positions.len())
                    .map_or(f64::INFINITY, |(_, bottleneck)| bottleneck)
            }
            Self::BottleneckWeightedSum => {
                let edges = compatible_edges(c1, c2, board, dist);
                let Some((matching, _)) = bottleneck_matching(&edges, c1.positions.len()) else {
                    return f64::INFINITY;
                };
                let weight_of = |i: usize, j: usize| {
                    edges
                        .iter()
                        .find(|(a, b, _)| *a == i && *b == j)
                        .map_or(f64::INFINITY, |(_, _, w)| *w)
                };
                matching
                    .into_iter()
                    .map(|(i, j)| weight_of(i, j).powi(2))
                    .sum()
            }
            Self::GreedyBottleneck => {
                let mut edges = compatible_edges(c1, c2, board, dist);
                edges.sort_by(|a, b| a.2.total_cmp(&b.2).then_with(|| (a.0, a.1).cmp(&(b.0, b.1))));
                let n = c1.positions.len();
                let mut left_used = vec![false; n];
                let mut right_used = vec![false; n];
                let mut matched = 0usize;
                let mut max_weight: f64 = 0.0;
                for (i, j, w) in edges {
                    if left_used[i] || right_used[j] {
                        continue;
                    }
                    left_used[i] = true;
                    right_used[j] = true;
                    matched += 1;
                    max_weight = max_weight.max(w);
                    if matched == n {
                        return max_weight;
                    }
                }
                if n == 0 { 0.0 } else { f64::INFINITY }
            }
        }
    }

    fn directed_hausdorff(
        c1: &Configuration,
        c2: &Configuration,
        board: &Board,
        dist: &dyn Fn(Cell, Cell) -> f64,
    ) -> f64 {
        let mut overall: f64 = 0.0;
        for (p1, g1) in c1.entries(board) {
            let mut closest = f64::INFINITY;
            for (p2, g2) in c2.entries(board) {
                if g1 == g2 {
                    closest = closest.min(dist(p1, p2));
                    if closest <= overall {
                        break;
                    }
                }
            }
            overall = overall.max(closest);
        }
        overall
    }
}

struct RrtNode {
    config: Configuration,
    parent: Option<usize>,
    sequence: Vec<Direction>,
    feasible: bool,
    distance_to_target: f64,
}

/// Local-search heuristic scoring boards by their distance to a fixed
/// configuration
struct DistanceToConfig {
    target_config: Configuration,
    maps: Arc<FxHashMap<Cell, Array2<f64>>>,
    metric: DistanceMetric,
    scratch: Board,
}

impl Heuristic for DistanceToConfig {
    fn estimate(&mut self, board: &Board, _sub: Option<&SubGoal>, _score: f64) -> f64 {
        let current = Configuration::from_board(board);
        config_distance(
            &current,
            &self.target_config,
            &mut self.scratch,
            &self.maps,
            self.metric,
        )
    }
}

fn map_distance(maps: &FxHashMap<Cell, Array2<f64>>, from: Cell, to: Cell) -> f64 {
    let Some(map) = maps.get(&from) else {
        return f64::INFINITY;
    };
    if to.0 < 0 || to.1 < 0 {
        return f64::INFINITY;
    }
    map.get([to.0 as usize, to.1 as usize])
        .copied()
        .unwrap_or(f64::INFINITY)
}

/// Distance between two configurations, `∞` unless the larger polyominoes
/// of the first embed into the second
fn config_distance(
    c1: &Configuration,
    c2: &Configuration,
    scratch: &mut Board,
    maps: &FxHashMap<Cell, Array2<f64>>,
    metric: DistanceMetric,
) -> f64 {
    if !polyominoes_match(c1, c2, scratch) {
        return f64::INFINITY;
    }
    metric.eval(c1, c2, scratch, &|a, b| map_distance(maps, a, b))
}

fn poly_glue_maps(board: &Board) -> Vec<FxHashMap<Cell, Glues>> {
    board
        .live_polyominoes()
        .map(|(_, poly)| {
            poly.entries()
                .map(|(cell, tile)| (cell, board.tile(tile).glues.clone()))
                .collect()
        })
        .collect()
}

fn polyominoes_match(c1: &Configuration, c2: &Configuration, scratch: &mut Board) -> bool {
    c1.apply(scratch);
    let first = poly_glue_maps(scratch);
    c2.apply(scratch);
    let second = poly_glue_maps(scratch);
    first
        .iter()
        .filter(|p| p.len() > 1)
        .all(|p1| second.iter().any(|p2| is_sub_shape_with_glues(p1, p2)))
}

/// Configuration-space explorer biased toward the goal
pub struct RrtSolver {
    initial: Board,
    target: TargetShape,
    config: PlannerConfig,
    token: CancelToken,
    metric: DistanceMetric,
    max_nodes: Option<usize>,
    rng: StdRng,
    target_distances: Array2<f64>,
    maps: Arc<FxHashMap<Cell, Array2<f64>>>,
    target_cells: Vec<Cell>,
    match_board: Board,
    nodes: Vec<RrtNode>,
    visited: FxHashSet<u64>,
    solution: Option<RrtNode>,
    initialized: bool,
}

impl RrtSolver {
    /// Create the explorer; distance maps are computed lazily in `solve`
    pub fn new(
        instance: &Instance,
        metric: DistanceMetric,
        max_nodes: Option<usize>,
        config: PlannerConfig,
        token: CancelToken,
    ) -> Self {
        let board = instance.board.clone();
        let seed = config.seed;
        Self {
            match_board: board.clone(),
            initial: board,
            target: instance.target_shape.clone(),
            config,
            token,
            metric,
            max_nodes,
            rng: StdRng::seed_from_u64(seed),
            target_distances: Array2::from_elem((1, 1), f64::INFINITY),
            maps: Arc::new(FxHashMap::default()),
            target_cells: instance.target_shape.absolute_cells().collect(),
            nodes: Vec::new(),
            visited: FxHashSet::default(),
            solution: None,
            initialized: false,
        }
    }

    fn initialize(&mut self) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        self.target_distances =
            compute_distances(&self.initial, self.target_cells.iter().copied());

        let mut maps = FxHashMap::default();
        for x in 0..self.initial.cols() as i32 {
            if self.token.is_cancelled() {
                return Err(SolverError::PreComputationTimeout {
                    operation: "configuration distance maps",
                });
            }
            for y in 0..self.initial.rows() as i32 {
                if self.initial.is_blocked(x, y) {
                    continue;
                }
                maps.insert((x, y), compute_distances(&self.initial, [(x, y)]));
            }
        }
        self.maps = Arc::new(maps);

        let root_config = Configuration::from_board(&self.initial);
        let distance = self.distance_to_target(&root_config);
        if distance.is_infinite() {
            return Err(SolverError::InvalidInstance {
                reason: "the available tiles admit no blueprint of the target shape".to_string(),
            });
        }
        let root = RrtNode {
            config: root_config,
            parent: None,
            sequence: Vec::new(),
            feasible: true,
            distance_to_target: distance,
        };
        self.add_node(root);
        self.initialized = true;
        Ok(())
    }

    /// Append a node; indices are stable so parent links stay valid
    fn add_node(&mut self, node: RrtNode) -> Option<usize> {
        let hash = node.config.canonical_hash(&self.initial);
        if !self.visited.insert(hash) {
            return None;
        }
        self.nodes.push(node);
        Some(self.nodes.len() - 1)
    }

    /// Feasible node with the smallest target distance; ties break by age
    fn closest_to_target(&self) -> usize {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.feasible)
            .min_by(|a, b| a.1.distance_to_target.total_cmp(&b.1.distance_to_target))
            .map_or(0, |(index, _)| index)
    }

    /// Smallest index-`i` prefix of target-sorted tiles that admits a
    /// blueprint; the distance is the `i`-th tile's BFS distance
    fn distance_to_target(&mut self, config: &Configuration) -> f64 {
        let mut ranked: Vec<(f64, TileId)> = config
            .positions
            .iter()
            .enumerate()
            .map(|(index, position)| {
                let d = if position.0 < 0 || position.1 < 0 {
                    f64::INFINITY
                } else {
                    self.target_distances
                        .get([position.0 as usize, position.1 as usize])
                        .copied()
                        .unwrap_or(f64::INFINITY)
                };
                (d, TileId::from_index(index))
            })
            .collect();
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

        for count in self.target.size()..=ranked.len() {
            let distance = ranked[count - 1].0;
            let prefix: Vec<Glues> = ranked[..count]
                .iter()
                .map(|(_, id)| self.initial.tile(*id).glues.clone())
                .collect();
            if blueprint_with_glue_types(
                &self.target_cells,
                &prefix,
                self.initial.glue_rules(),
                &[],
                (0, 0),
                self.config.rrt_blueprint_probe,
                &mut self.rng,
            )
            .is_some()
            {
                return distance;
            }
        }
        f64::INFINITY
    }

    fn random_configuration(&mut self) -> Configuration {
        let fixed: FxHashSet<TileId> = self.initial.fixed_tiles().iter().copied().collect();
        let fixed_cells: FxHashSet<Cell> = fixed
            .iter()
            .map(|id| self.initial.tile(*id).position())
            .collect();

        let mut open: Vec<Cell> = Vec::new();
        for x in 0..self.initial.cols() as i32 {
            for y in 0..self.initial.rows() as i32 {
                if !self.initial.is_blocked(x, y) && !fixed_cells.contains(&(x, y)) {
                    open.push((x, y));
                }
            }
        }
        open.shuffle(&mut self.rng);

        let mut positions: Vec<Cell> = self
            .initial
            .tiles()
            .map(|(_, t)| t.position())
            .collect();
        let mut next = 0usize;
        for (index, position) in positions.iter_mut().enumerate() {
            if fixed.contains(&TileId::from_index(index)) {
                continue;
            }
            if let Some(cell) = open.get(next) {
                *position = *cell;
                next += 1;
            }
        }
        Configuration { positions }
    }

    fn config_distance(&mut self, c1: &Configuration, c2: &Configuration) -> f64 {
        config_distance(c1, c2, &mut self.match_board, &self.maps, self.metric)
    }

    fn find_closest_node(&mut self, config: &Configuration) -> (usize, f64) {
        let mut best = (0, f64::INFINITY);
        for index in 0..self.nodes.len() {
            let candidate = self.nodes[index].config.clone();
            let distance = self.config_distance(&candidate, config);
            if distance < best.1 {
                best = (index, distance);
            }
        }
        best
    }

    fn instance_at(&mut self, node: usize) -> Instance {
        let mut board = self.initial.clone();
        self.nodes[node].config.apply(&mut board);
        Instance {
            board,
            target_shape: self.target.clone(),
        }
    }

    /// Short local search pulling the tree toward a sampled configuration
    fn expand_towards_config(&mut self, node: usize, sample: &Configuration) -> RrtNode {
        let instance = self.instance_at(node);
        let heuristic = Box::new(DistanceToConfig {
            target_config: sample.clone(),
            maps: Arc::clone(&self.maps),
            metric: self.metric,
            scratch: self.initial.clone(),
        });
        let mut planner =
            get_motion_planner_with(&instance, heuristic, &self.config, self.token.clone());
        let solution = planner.solve_with_budget(Some(self.config.rrt_local_budget));
        let sequence = solution.map_or_else(|| planner.best_sequence(), |moves| moves);
        let config = Configuration::from_board(planner.board());
        RrtNode {
            config,
            parent: Some(node),
            sequence,
            feasible: true,
            distance_to_target: f64::INFINITY,
        }
    }

    /// Goal-directed expansion; records a solution chain when one is found
    fn expand_towards_goal(&mut self, node: Option<usize>, budget: usize) -> Option<usize> {
        let index = node.unwrap_or_else(|| self.closest_to_target());
        let instance = self.instance_at(index);
        let mut planner = get_motion_planner(
            &instance,
            HeuristicKind::GreedyGreatestDistance,
            Some(&self.target_distances),
            &self.config,
            self.token.clone(),
        );
        if let Some(moves) = planner.solve_with_budget(Some(budget)) {
            self.solution = Some(RrtNode {
                config: Configuration::from_board(planner.board()),
                parent: Some(index),
                sequence: moves,
                feasible: true,
                distance_to_target: 0.0,
            });
        }

        let sequence = planner.best_sequence();
        let config = Configuration::from_board(planner.board());
        let distance = self.distance_to_target(&config);
        if distance >= self.nodes[index].distance_to_target {
            return None;
        }
        self.add_node(RrtNode {
            config,
            parent: Some(index),
            sequence,
            feasible: true,
            distance_to_target: distance,
        })
    }

    fn expand_random(&mut self) -> Option<usize> {
        let sample = self.random_configuration();
        let (closest, distance) = self.find_closest_node(&sample);
        let mut candidate = self.expand_towards_config(closest, &sample);
        let new_distance = self.config_distance(&candidate.config, &sample);
        if new_distance >= distance {
            return None;
        }
        candidate.distance_to_target = self.distance_to_target(&candidate.config);
        self.add_node(candidate)
    }

    fn expand(&mut self) {
        let toward_goal = self.rng.random::<f64>() <= self.config.rrt_bias;
        let new_node = if toward_goal {
            let node = self.expand_towards_goal(None, self.config.rrt_goal_budget);
            if node.is_none() {
                let closest = self.closest_to_target();
                self.nodes[closest].feasible = false;
            }
            node
        } else {
            self.expand_random()
        };

        let Some(index) = new_node else {
            return;
        };
        if self.nodes[index].distance_to_target <= self.config.rrt_closing_distance {
            // close enough: try to close the remaining gap directly
            let closing = self.expand_towards_goal(Some(index), self.config.rrt_closing_budget);
            if closing.is_none() {
                self.nodes[index].feasible = false;
            }
        }
    }

    fn is_finished_on(&self, board: &Board) -> bool {
        board.live_polyominoes().any(|(_, p)| {
            p.shape_equals(&self.target) && self.target_cells.contains(&p.position())
        })
    }
}

impl Solver for RrtSolver {
    fn solve(&mut self) -> Result<Option<Vec<Direction>>> {
        self.initialize()?;
        if self.nodes.len() == 1 && self.is_finished_on(&self.initial) {
            self.solution = Some(RrtNode {
                config: Configuration::from_board(&self.initial),
                parent: None,
                sequence: Vec::new(),
                feasible: true,
                distance_to_target: 0.0,
            });
        }
        while self.solution.is_none() && !self.token.is_cancelled() {
            if self.max_nodes.is_some_and(|budget| self.nodes.len() >= budget) {
                break;
            }
            self.expand();
        }
        Ok(self.extract_solution())
    }

    fn extract_solution(&mut self) -> Option<Vec<Direction>> {
        let solution = self.solution.as_ref()?;
        let mut segments = vec![solution.sequence.clone()];
        let mut parent = solution.parent;
        while let Some(index) = parent {
            segments.push(self.nodes[index].sequence.clone());
            parent = self.nodes[index].parent;
        }
        segments.reverse();
        Some(segments.concat())
    }

    fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{GlueRules, Tile};

    fn taxicab_maps(board: &Board) -> FxHashMap<Cell, Array2<f64>> {
        let mut maps = FxHashMap::default();
        for x in 0..board.cols() as i32 {
            for y in 0..board.rows() as i32 {
                maps.insert((x, y), compute_distances(board, [(x, y)]));
            }
        }
        maps
    }

    #[test]
    fn test_hausdorff_symmetric_and_zero_on_equal_configs() {
        let mut board = Board::new(4, 4, GlueRules::reflexive());
        board.add_tile(Tile::at((0, 0)));
        board.add_tile(Tile::at((3, 3)));
        let maps = taxicab_maps(&board);
        let c1 = Configuration::from_board(&board);
        let dist = |a: Cell, b: Cell| map_distance(&maps, a, b);
        assert!(
            DistanceMetric::Hausdorff
                .eval(&c1, &c1, &board, &dist)
                .abs()
                < f64::EPSILON
        );

        let c2 = Configuration {
            positions: vec![(0, 1), (3, 3)],
        };
        let forward = DistanceMetric::Hausdorff.eval(&c1, &c2, &board, &dist);
        let backward = DistanceMetric::Hausdorff.eval(&c2, &c1, &board, &dist);
        assert!((forward - backward).abs() < f64::EPSILON);
        assert!((forward - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_bottleneck_matching_picks_minimal_maximum() {
        let mut board = Board::new(5, 5, GlueRules::reflexive());
        board.add_tile(Tile::at((0, 0)));
        board.add_tile(Tile::at((4, 0)));
        let maps = taxicab_maps(&board);
        let c1 = Configuration::from_board(&board);
        let c2 = Configuration {
            positions: vec![(1, 0), (3, 0)],
        };
        let dist = |a: Cell, b: Cell| map_distance(&maps, a, b);
        // identity pairing costs max 1; the crossed pairing would cost 3
        let bottleneck = DistanceMetric::Bottleneck.eval(&c1, &c2, &board, &dist);
        assert!((bottleneck - 1.0).abs() < f64::EPSILON);
        let weighted = DistanceMetric::BottleneckWeightedSum.eval(&c1, &c2, &board, &dist);
        assert!((weighted - 2.0).abs() < f64::EPSILON);
        let greedy = DistanceMetric::GreedyBottleneck.eval(&c1, &c2, &board, &dist);
        assert!((greedy - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_polyominoes_match_requires_subshape_embedding() {
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
        let mut scratch = board.clone();

        let bonded = Configuration {
            positions: vec![(0, 0), (1, 0)],
        };
        let separated = Configuration {
            positions: vec![(0, 0), (2, 2)],
        };
        // a bonded pair embeds into itself, but not into a separated config
        assert!(polyominoes_match(&bonded, &bonded, &mut scratch));
        assert!(!polyominoes_match(&bonded, &separated, &mut scratch));
        assert!(polyominoes_match(&separated, &bonded, &mut scratch));
    }
}
