//! Blueprint assignment and build-order generation
//!
//! A blueprint assigns one glue tuple from the available tile multiset to
//! every cell of the target shape so that the result is glue-connected. A
//! build order is a permutation of the target cells such that, read in
//! reverse, every prefix stays glue-connected and the most recently added
//! cell can escape to the outside without touching cells whose glues would
//! stick to it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rustc_hash::FxHashMap;

use crate::board::{Board, GlueRules, Glues, PolyId, TargetShape, TileId};
use crate::io::error::{Result, SolverError};
use crate::planner::{CancelToken, PlannerConfig};
use crate::spatial::direction::{Direction, direct_neighbors, neighbor};
use crate::spatial::pathfinding::path_exists;
use crate::spatial::shape::is_connected_by_glues;
use crate::spatial::Cell;

/// Escape target of the removability test on free boards: any path to this
/// cell leaves the blueprint, since relative coordinates start at `(0, 0)`
const FREE_OUTSIDE: Cell = (-2, 0);

/// Assign glue tuples from the available multiset to the container cells so
/// that the assignment is glue-connected
///
/// Backtracking over the glue-type multiset with a randomized branch order;
/// `None` when the deadline fires or no connected assignment exists. Fixed
/// tiles impose their real glues on their own cells.
pub fn blueprint_with_glue_types(
    container: &[Cell],
    tiles: &[Glues],
    rules: &GlueRules,
    fixed: &[(Cell, Glues)],
    offset: Cell,
    timeout: Duration,
    rng: &mut StdRng,
) -> Option<FxHashMap<Cell, Glues>> {
    let deadline = Instant::now() + timeout;

    let mut shape: FxHashMap<Cell, Glues> = FxHashMap::default();
    for (position, glues) in fixed {
        shape.insert((position.0 - offset.0, position.1 - offset.1), glues.clone());
    }
    let mut missing: Vec<Cell> = container
        .iter()
        .filter(|cell| !shape.contains_key(cell))
        .copied()
        .collect();
    missing.sort_unstable();

    let mut counts: Vec<(Glues, usize)> = Vec::new();
    for glues in tiles {
        if let Some(entry) = counts.iter_mut().find(|(g, _)| g == glues) {
            entry.1 += 1;
        } else {
            counts.push((glues.clone(), 1));
        }
    }

    if assign_recursive(&mut missing, &mut shape, &mut counts, rules, deadline, rng) == Assign::Found
    {
        Some(shape)
    } else {
        None
    }
}

#[derive(PartialEq, Eq, Clone, Copy)]
enum Assign {
    Found,
    Exhausted,
    Expired,
}

fn assign_recursive(
    missing: &mut Vec<Cell>,
    shape: &mut FxHashMap<Cell, Glues>,
    counts: &mut Vec<(Glues, usize)>,
    rules: &GlueRules,
    deadline: Instant,
    rng: &mut StdRng,
) -> Assign {
    if Instant::now() > deadline {
        return Assign::Expired;
    }
    let Some(cell) = missing.pop() else {
        return if is_connected_by_glues(shape, rules) {
            Assign::Found
        } else {
            Assign::Exhausted
        };
    };

    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.shuffle(rng);
    for index in order {
        if counts[index].1 == 0 {
            continue;
        }
        counts[index].1 -= 1;
        shape.insert(cell, counts[index].0.clone());
        match assign_recursive(missing, shape, counts, rules, deadline, rng) {
            Assign::Found => return Assign::Found,
            Assign::Expired => return Assign::Expired,
            Assign::Exhausted => {}
        }
        shape.remove(&cell);
        counts[index].1 += 1;
    }
    missing.push(cell);
    Assign::Exhausted
}

/// Cells that block the removal path of a tile: every other blueprint cell
/// plus any neighbour whose glue would stick to the mover
fn removal_blocked_cells(
    glues: &FxHashMap<Cell, Glues>,
    tile_position: Cell,
    rules: &GlueRules,
) -> rustc_hash::FxHashSet<Cell> {
    let mut blocked = rustc_hash::FxHashSet::default();
    let Some(tile_glues) = glues.get(&tile_position) else {
        return blocked;
    };
    for (cell, cell_glues) in glues {
        if *cell == tile_position {
            continue;
        }
        blocked.insert(*cell);
        for direction in Direction::ALL {
            if rules.sticks(
                cell_glues.side(direction),
                tile_glues.side(direction.inverse()),
            ) {
                blocked.insert(neighbor(*cell, direction));
            }
        }
    }
    blocked
}

fn is_removable(
    old_shape: &FxHashMap<Cell, Glues>,
    new_shape: &FxHashMap<Cell, Glues>,
    tile_position: Cell,
    rules: &GlueRules,
) -> bool {
    if !is_connected_by_glues(new_shape, rules) {
        return false;
    }
    let blocked = removal_blocked_cells(old_shape, tile_position, rules);
    path_exists(
        [tile_position],
        |cell| cell == FREE_OUTSIDE,
        |cell| !blocked.contains(&cell),
    )
}

fn is_removable_fixed(
    old_shape: &FxHashMap<Cell, Glues>,
    new_shape: &FxHashMap<Cell, Glues>,
    tile_position: Cell,
    rules: &GlueRules,
    board: &Board,
    outside: &OutsideRect,
) -> bool {
    if !is_connected_by_glues(new_shape, rules) {
        return false;
    }
    let blocked = removal_blocked_cells(old_shape, tile_position, rules);
    path_exists(
        [tile_position],
        |cell| outside.contains(cell),
        |cell| !blocked.contains(&cell) && !board.is_blocked(cell.0, cell.1),
    )
}

/// Rectangle two cells larger than the blueprint; everything beyond it
/// counts as outside on a fixed board
#[derive(Debug, Clone, Copy)]
struct OutsideRect {
    left: i32,
    right: i32,
    up: i32,
    down: i32,
}

impl OutsideRect {
    fn around(positions: impl Iterator<Item = Cell> + Clone) -> Self {
        let left = positions.clone().map(|(x, _)| x).min().unwrap_or(0) - 2;
        let right = positions.clone().map(|(x, _)| x).max().unwrap_or(0) + 2;
        let up = positions.clone().map(|(_, y)| y).min().unwrap_or(0) - 2;
        let down = positions.map(|(_, y)| y).max().unwrap_or(0) + 2;
        Self {
            left,
            right,
            up,
            down,
        }
    }

    const fn contains(&self, cell: Cell) -> bool {
        let (x, y) = cell;
        !(self.left < x && x < self.right && self.up < y && y < self.down)
    }
}

/// Marker returned when a finder runs past its per-yield or overall deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FinderTimeout;

enum FinderMode {
    Free,
    Fixed { board: Board, outside: OutsideRect },
}

struct Frame {
    glues: FxHashMap<Cell, Glues>,
    candidates: Vec<Cell>,
    next: usize,
    yielded: bool,
}

/// Lazy generator of build orders for one blueprint
///
/// Orders are produced by a resumable depth-first search over removal
/// sequences; each request is bounded by a per-result deadline, and fixed
/// tiles are constrained to be the last to remain.
pub struct BuildOrderFinder {
    rules: GlueRules,
    fixed_positions: Vec<Cell>,
    end_time: Instant,
    per_result: Duration,
    mode: FinderMode,
    shift: Cell,
    frames: Vec<Frame>,
    order: Vec<Cell>,
}

impl BuildOrderFinder {
    fn frame_for(glues: FxHashMap<Cell, Glues>) -> Frame {
        let mut candidates: Vec<Cell> = glues.keys().copied().collect();
        candidates.sort_unstable();
        Frame {
            glues,
            candidates,
            next: 0,
            yielded: false,
        }
    }

    /// Finder over blueprint-relative coordinates on an unbounded lattice
    pub fn new(
        glues: FxHashMap<Cell, Glues>,
        rules: GlueRules,
        fixed_positions: Vec<Cell>,
        end_time: Instant,
        per_result: Duration,
    ) -> Self {
        Self {
            rules,
            fixed_positions,
            end_time,
            per_result,
            mode: FinderMode::Free,
            shift: (0, 0),
            frames: vec![Self::frame_for(glues)],
            order: Vec::new(),
        }
    }

    /// Finder over absolute coordinates that respects the board's walls and
    /// uses the rectangle two cells beyond the blueprint as the outside
    pub fn new_fixed(
        glues: &FxHashMap<Cell, Glues>,
        rules: GlueRules,
        board: &Board,
        target: &TargetShape,
        end_time: Instant,
        per_result: Duration,
    ) -> Self {
        let shift = target.position();
        let absolute: FxHashMap<Cell, Glues> = glues
            .iter()
            .map(|((x, y), g)| ((x + shift.0, y + shift.1), g.clone()))
            .collect();
        let outside = OutsideRect::around(absolute.keys().copied());
        let fixed_positions = board
            .fixed_tiles()
            .iter()
            .map(|id| board.tile(*id).position())
            .collect();
        Self {
            rules,
            fixed_positions,
            end_time,
            per_result,
            mode: FinderMode::Fixed {
                board: board.clone(),
                outside,
            },
            shift,
            frames: vec![Self::frame_for(absolute)],
            order: Vec::new(),
        }
    }

    fn removable(&self, old: &FxHashMap<Cell, Glues>, new: &FxHashMap<Cell, Glues>, t: Cell) -> bool {
        match &self.mode {
            FinderMode::Free => is_removable(old, new, t, &self.rules),
            FinderMode::Fixed { board, outside } => {
                is_removable_fixed(old, new, t, &self.rules, board, outside)
            }
        }
    }

    /// Produce the next build order
    ///
    /// `Ok(None)` once the search space is exhausted.
    ///
    /// # Errors
    ///
    /// [`FinderTimeout`] when the per-result budget or the overall end time
    /// is exceeded; the caller usually reacts by drawing a new blueprint.
    pub fn next_order(&mut self) -> std::result::Result<Option<Vec<Cell>>, FinderTimeout> {
        let deadline = Instant::now() + self.per_result;
        loop {
            if Instant::now() > deadline || Instant::now() > self.end_time {
                return Err(FinderTimeout);
            }
            let Some(top_index) = self.frames.len().checked_sub(1) else {
                return Ok(None);
            };

            if !self.frames[top_index].yielded {
                self.frames[top_index].yielded = true;
                if self.frames[top_index].glues.is_empty() {
                    let mut result = self.order.clone();
                    result.reverse();
                    return Ok(Some(result));
                }
            }

            let mut descended = false;
            while self.frames[top_index].next < self.frames[top_index].candidates.len() {
                let candidate = self.frames[top_index].candidates[self.frames[top_index].next];
                self.frames[top_index].next += 1;

                let remaining = self.frames[top_index].glues.len();
                if remaining > self.fixed_positions.len()
                    && self.fixed_positions.contains(&candidate)
                {
                    continue;
                }
                let mut new_shape = self.frames[top_index].glues.clone();
                new_shape.remove(&candidate);
                if !self.removable(&self.frames[top_index].glues, &new_shape, candidate) {
                    continue;
                }
                self.order
                    .push((candidate.0 - self.shift.0, candidate.1 - self.shift.1));
                self.frames.push(Self::frame_for(new_shape));
                descended = true;
                break;
            }
            if !descended {
                self.frames.pop();
                self.order.pop();
            }
        }
    }
}

/// Plans the order in which tiles are added to the growing shape
///
/// Owns the current blueprint and build order; on exhaustion or timeout of
/// one tiling, a fresh blueprint is drawn until the overall deadline.
pub struct BuildOrderPlanner {
    target: TargetShape,
    started: Instant,
    deadline: Instant,
    per_result: Duration,
    glues: Option<FxHashMap<Cell, Glues>>,
    finder: Option<BuildOrderFinder>,
    build_order: VecDeque<Cell>,
    rng: StdRng,
}

impl BuildOrderPlanner {
    /// Create a planner and compute the first blueprint and build order
    ///
    /// # Errors
    ///
    /// [`SolverError::UnsolvableBlueprint`] when the overall deadline fires
    /// before any usable blueprint/build-order pair is found.
    pub fn new(
        board: &Board,
        target: &TargetShape,
        config: &PlannerConfig,
        token: &CancelToken,
    ) -> Result<Self> {
        let started = Instant::now();
        let mut planner = Self {
            target: target.clone(),
            started,
            deadline: started + config.blueprint_deadline,
            per_result: config.build_order_timeout,
            glues: None,
            finder: None,
            build_order: VecDeque::new(),
            rng: StdRng::seed_from_u64(config.seed),
        };
        planner.change_build_order(board, token)?;
        Ok(planner)
    }

    /// True once every target cell has been scheduled
    pub fn finished(&self) -> bool {
        self.build_order.is_empty()
    }

    /// The currently active blueprint, relative to the target anchor
    pub const fn blueprint(&self) -> Option<&FxHashMap<Cell, Glues>> {
        self.glues.as_ref()
    }

    /// Discard the current build order and find the next workable one
    ///
    /// # Errors
    ///
    /// [`SolverError::UnsolvableBlueprint`] at the overall deadline.
    pub fn change_build_order(&mut self, board: &Board, token: &CancelToken) -> Result<()> {
        let mut container: Vec<Cell> = self.target.cells().iter().copied().collect();
        container.sort_unstable();
        let fixed: Vec<(Cell, Glues)> = board
            .fixed_tiles()
            .iter()
            .map(|id| {
                let tile = board.tile(*id);
                (tile.position(), tile.glues.clone())
            })
            .collect();
        let fixed_relative: Vec<Cell> = fixed
            .iter()
            .map(|(p, _)| {
                (
                    p.0 - self.target.position().0,
                    p.1 - self.target.position().1,
                )
            })
            .collect();
        let movable: Vec<Glues> = board
            .tiles()
            .filter(|(id, _)| !board.fixed_tiles().contains(id))
            .map(|(_, tile)| tile.glues.clone())
            .collect();

        loop {
            if Instant::now() > self.deadline || token.is_cancelled() {
                return Err(SolverError::UnsolvableBlueprint {
                    elapsed: self.started.elapsed(),
                });
            }

            if self.glues.is_none() {
                let attempt_started = Instant::now();
                self.glues = blueprint_with_glue_types(
                    &container,
                    &movable,
                    board.glue_rules(),
                    &fixed,
                    self.target.position(),
                    self.per_result,
                    &mut self.rng,
                );
                self.finder = None;
                if self.glues.is_none() {
                    // the backtracking search is complete: finishing inside
                    // the attempt budget means no blueprint exists at all
                    if attempt_started.elapsed() < self.per_result {
                        return Err(SolverError::UnsolvableBlueprint {
                            elapsed: self.started.elapsed(),
                        });
                    }
                    continue;
                }
            }

            if self.finder.is_none() {
                let Some(glues) = self.glues.as_ref() else {
                    continue;
                };
                self.finder = Some(if board.has_fixed_tiles() {
                    BuildOrderFinder::new_fixed(
                        glues,
                        board.glue_rules().clone(),
                        board,
                        &self.target,
                        self.deadline,
                        self.per_result,
                    )
                } else {
                    BuildOrderFinder::new(
                        glues.clone(),
                        board.glue_rules().clone(),
                        fixed_relative.clone(),
                        self.deadline,
                        self.per_result,
                    )
                });
            }

            let step = self.finder.as_mut().map(BuildOrderFinder::next_order);
            match step {
                Some(Ok(Some(order))) => {
                    self.build_order = order.into();
                    return Ok(());
                }
                // no build order for this tiling: draw another one
                Some(Ok(None) | Err(FinderTimeout)) | None => {
                    self.glues = None;
                    self.finder = None;
                }
            }
        }
    }

    /// Next target cell together with the nearest matching tile
    ///
    /// The destination is reported in blueprint coordinates; the tile is the
    /// closest one on the board carrying the required glue tuple that is not
    /// already part of the growing polyomino.
    pub fn get_next_tile(
        &mut self,
        board: &Board,
        current_poly: Option<PolyId>,
        offset: Cell,
    ) -> Option<(Cell, TileId)> {
        let next_destination = self.build_order.pop_front()?;
        let relative_to_poly = (
            next_destination.0 - offset.0,
            next_destination.1 - offset.1,
        );
        let glue_type = self.glues.as_ref()?.get(&next_destination)?.clone();
        let base = current_poly
            .and_then(|id| board.polyomino(id))
            .map_or_else(|| self.target.position(), |p| p.position());
        let absolute = (base.0 + relative_to_poly.0, base.1 + relative_to_poly.1);
        let tile = find_nearest_tile_with_glues(board, current_poly, absolute, &glue_type)?;
        Some((next_destination, tile))
    }
}

fn find_nearest_tile_with_glues(
    board: &Board,
    excluded_poly: Option<PolyId>,
    destination: Cell,
    glue_type: &Glues,
) -> Option<TileId> {
    let mut distance: FxHashMap<Cell, u32> = FxHashMap::default();
    distance.insert(destination, 0);
    let mut active = VecDeque::from([destination]);
    while let Some(current) = active.pop_front() {
        if let Some(tile) = board.tile_id_at(current) {
            let in_poly = excluded_poly.is_some_and(|p| board.poly_of(tile) == p);
            if !in_poly && board.tile(tile).glues == *glue_type {
                return Some(tile);
            }
        }
        let d = distance.get(&current).copied().unwrap_or(0);
        for cell in direct_neighbors(current) {
            if board.is_blocked(cell.0, cell.1) || distance.contains_key(&cell) {
                continue;
            }
            distance.insert(cell, d + 1);
            active.push_back(cell);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Tile;

    fn chain_glues() -> Vec<Glues> {
        // four distinct tuples forming a vertical chain with an east hook
        let g = |n: Option<&str>, e: Option<&str>, s: Option<&str>, w: Option<&str>| {
            Glues::new(
                n.map(str::to_string),
                e.map(str::to_string),
                s.map(str::to_string),
                w.map(str::to_string),
            )
        };
        vec![
            g(None, None, Some("a"), None),
            g(Some("a"), None, Some("b"), None),
            g(Some("b"), Some("c"), None, None),
            g(None, None, None, Some("c")),
        ]
    }

    fn l_target() -> TargetShape {
        TargetShape::new(vec![
            Tile::at((4, 4)),
            Tile::at((4, 5)),
            Tile::at((4, 6)),
            Tile::at((5, 6)),
        ])
    }

    #[test]
    fn test_blueprint_is_glue_connected() {
        let container: Vec<Cell> = vec![(0, 0), (0, 1), (0, 2), (1, 2)];
        let tiles = chain_glues();
        let rules = GlueRules::reflexive();
        let mut rng = StdRng::seed_from_u64(7);
        let blueprint = blueprint_with_glue_types(
            &container,
            &tiles,
            &rules,
            &[],
            (0, 0),
            Duration::from_secs(10),
            &mut rng,
        )
        .unwrap();
        assert_eq!(blueprint.len(), 4);
        assert!(is_connected_by_glues(&blueprint, &rules));
        // the chain admits exactly one connected assignment
        assert_eq!(blueprint.get(&(1, 2)), Some(&tiles[3]));
    }

    #[test]
    fn test_blueprint_fails_for_disconnected_supply() {
        let container: Vec<Cell> = vec![(0, 0), (0, 1)];
        let blank = vec![Glues::blank(), Glues::blank()];
        let rules = GlueRules::reflexive();
        let mut rng = StdRng::seed_from_u64(7);
        assert!(
            blueprint_with_glue_types(
                &container,
                &blank,
                &rules,
                &[],
                (0, 0),
                Duration::from_millis(200),
                &mut rng,
            )
            .is_none()
        );
    }

    #[test]
    fn test_build_order_covers_all_cells_and_prefixes_stay_connected() {
        let mut board = Board::new(10, 10, GlueRules::reflexive());
        let glues = chain_glues();
        board.add_tile(Tile::new((0, 0), glues[0].clone()));
        board.add_tile(Tile::new((9, 0), glues[1].clone()));
        board.add_tile(Tile::new((0, 9), glues[2].clone()));
        board.add_tile(Tile::new((9, 9), glues[3].clone()));
        let target = l_target();
        let config = PlannerConfig::default();
        let mut planner =
            BuildOrderPlanner::new(&board, &target, &config, &CancelToken::new()).unwrap();

        let blueprint = planner.blueprint().unwrap().clone();
        let mut remaining = blueprint.clone();
        let mut scheduled = Vec::new();
        while !planner.finished() {
            let (cell, tile) = planner.get_next_tile(&board, None, (0, 0)).unwrap();
            assert_eq!(
                board.tile(tile).glues,
                blueprint.get(&cell).unwrap().clone()
            );
            scheduled.push(cell);
        }
        assert_eq!(scheduled.len(), 4);
        // removing cells in reverse schedule order keeps every prefix connected
        for cell in scheduled.iter().rev() {
            remaining.remove(cell);
            assert!(is_connected_by_glues(&remaining, board.glue_rules()));
        }
    }
}
