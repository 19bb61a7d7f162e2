//! Lattice search constrained by board walls
//!
//! Distance maps are dense `ndarray` grids indexed `[x, y]` with `∞` for
//! unreachable cells. Rigid-shape searches move a whole polyomino by its
//! anchor and test collisions with `Board::fits`, so other tiles never block
//! a rigid path.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, VecDeque};

use bitvec::prelude::*;
use ndarray::Array2;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::{Board, TileId};
use crate::spatial::direction::{Direction, direct_neighbors};
use crate::spatial::Cell;

/// BFS distance from a set of source cells to every reachable cell
///
/// Source cells get distance 0 even when they are blocked (targets may sit
/// on concrete in the anchoring variant); expansion only crosses free cells.
pub fn compute_distances(
    board: &Board,
    sources: impl IntoIterator<Item = Cell>,
) -> Array2<f64> {
    bfs_distances(board, sources, None)
}

/// Like [`compute_distances`], but expansion is restricted to `allowed`
pub fn compute_distance_within_set(
    board: &Board,
    sources: impl IntoIterator<Item = Cell>,
    allowed: &FxHashSet<Cell>,
) -> Array2<f64> {
    bfs_distances(board, sources, Some(allowed))
}

fn bfs_distances(
    board: &Board,
    sources: impl IntoIterator<Item = Cell>,
    allowed: Option<&FxHashSet<Cell>>,
) -> Array2<f64> {
    let mut result = Array2::from_elem((board.cols(), board.rows()), f64::INFINITY);
    let mut active: VecDeque<Cell> = VecDeque::new();
    for cell in sources {
        if let Some(index) = grid_index(board, cell) {
            if result[index].is_infinite() {
                result[index] = 0.0;
                active.push_back(cell);
            }
        }
    }
    while let Some(current) = active.pop_front() {
        let current_distance = grid_index(board, current).map_or(0.0, |i| result[i]);
        for cell in direct_neighbors(current) {
            if board.is_blocked(cell.0, cell.1) {
                continue;
            }
            if allowed.is_some_and(|set| !set.contains(&cell)) {
                continue;
            }
            if let Some(index) = grid_index(board, cell) {
                if result[index].is_infinite() {
                    result[index] = current_distance + 1.0;
                    active.push_back(cell);
                }
            }
        }
    }
    result
}

fn grid_index(board: &Board, cell: Cell) -> Option<[usize; 2]> {
    let (x, y) = cell;
    if x < 0 || y < 0 || x >= board.cols() as i32 || y >= board.rows() as i32 {
        return None;
    }
    Some([x as usize, y as usize])
}

/// BFS distance field bounded by a passability predicate
pub fn distance_field(
    sources: impl IntoIterator<Item = Cell>,
    passable: impl Fn(Cell) -> bool,
) -> FxHashMap<Cell, u32> {
    let mut distance: FxHashMap<Cell, u32> = sources.into_iter().map(|c| (c, 0)).collect();
    let mut active: VecDeque<Cell> = distance.keys().copied().collect();
    while let Some(current) = active.pop_front() {
        let d = distance.get(&current).copied().unwrap_or(0);
        for cell in direct_neighbors(current) {
            if !distance.contains_key(&cell) && passable(cell) {
                distance.insert(cell, d + 1);
                active.push_back(cell);
            }
        }
    }
    distance
}

/// BFS test for a path from `start` to any cell satisfying `goal`
///
/// The goal predicate is evaluated on newly discovered passable cells, so a
/// start cell satisfying it does not terminate the search by itself.
pub fn path_exists(
    start: impl IntoIterator<Item = Cell>,
    goal: impl Fn(Cell) -> bool,
    passable: impl Fn(Cell) -> bool,
) -> bool {
    let mut visited: FxHashSet<Cell> = start.into_iter().collect();
    let mut active: VecDeque<Cell> = visited.iter().copied().collect();
    while let Some(current) = active.pop_front() {
        for cell in direct_neighbors(current) {
            if visited.contains(&cell) || !passable(cell) {
                continue;
            }
            if goal(cell) {
                return true;
            }
            visited.insert(cell);
            active.push_back(cell);
        }
    }
    false
}

/// Back-pointer tree produced by the rigid-shape path searches
#[derive(Debug, Clone)]
pub struct PathsTree {
    parents: FxHashMap<Cell, Option<Cell>>,
}

impl PathsTree {
    /// True iff the search reached this anchor position
    pub fn contains(&self, position: Cell) -> bool {
        self.parents.contains_key(&position)
    }

    /// Anchor positions from the start to `position`, inclusive
    pub fn path_to(&self, position: Cell) -> Option<Vec<Cell>> {
        if !self.contains(position) {
            return None;
        }
        let mut path = vec![position];
        let mut current = position;
        while let Some(Some(previous)) = self.parents.get(&current) {
            path.push(*previous);
            current = *previous;
        }
        path.reverse();
        Some(path)
    }

    /// Tilt moves from the start to `position`; empty if already there
    pub fn moves_to(&self, position: Cell) -> Option<Vec<Direction>> {
        let path = self.path_to(position)?;
        Some(
            path.windows(2)
                .filter_map(|pair| {
                    Direction::from_vector((pair[1].0 - pair[0].0, pair[1].1 - pair[0].1))
                })
                .collect(),
        )
    }
}

/// A* search over anchor positions with a custom anchor fit predicate
pub fn find_shortest_path_with<F>(fits: F, start: Cell, target: Cell) -> PathsTree
where
    F: Fn(Cell) -> bool,
{
    let taxicab =
        |p: Cell| (target.0 - p.0).unsigned_abs() + (target.1 - p.1).unsigned_abs();

    let mut parents: FxHashMap<Cell, Option<Cell>> = FxHashMap::default();
    parents.insert(start, None);
    let mut g_score: FxHashMap<Cell, u32> = FxHashMap::default();
    g_score.insert(start, 0);

    let mut sequence: u64 = 0;
    let mut queue: BinaryHeap<Reverse<(u32, u64, Cell)>> = BinaryHeap::new();
    queue.push(Reverse((taxicab(start), sequence, start)));

    while let Some(Reverse((_, _, current))) = queue.pop() {
        let tentative = g_score.get(&current).copied().unwrap_or(u32::MAX) + 1;
        for cell in direct_neighbors(current) {
            if !fits(cell) {
                continue;
            }
            if tentative < g_score.get(&cell).copied().unwrap_or(u32::MAX) {
                parents.insert(cell, Some(current));
                g_score.insert(cell, tentative);
                if cell == target {
                    return PathsTree { parents };
                }
                sequence += 1;
                queue.push(Reverse((tentative + taxicab(cell), sequence, cell)));
            }
        }
    }
    PathsTree { parents }
}

/// A* search for the rigid shape from `start` to `target` on the board
pub fn find_shortest_path(board: &Board, shape: &[Cell], start: Cell, target: Cell) -> PathsTree {
    find_shortest_path_with(|anchor| board.fits(anchor, shape.iter().copied()), start, target)
}

/// Shortest tilt sequence moving the rigid shape from `start` to `target`
pub fn shortest_sequence(
    board: &Board,
    shape: &[Cell],
    start: Cell,
    target: Cell,
) -> Option<Vec<Direction>> {
    find_shortest_path(board, shape, start, target).moves_to(target)
}

/// True iff the rigid shape can be translated from `start` to `target`
pub fn is_reachable(board: &Board, shape: &[Cell], start: Cell, target: Cell) -> bool {
    find_shortest_path(board, shape, start, target).contains(target)
}

/// All anchor positions the rigid shape can be translated to from `start`
pub fn reachable_set(board: &Board, shape: &[Cell], start: Cell) -> FxHashSet<Cell> {
    let mut reachable = FxHashSet::default();
    reachable.insert(start);
    let mut visited = bitvec![0; board.cols() * board.rows()];
    if let Some(index) = bit_index(board, start) {
        visited.set(index, true);
    }
    let mut active = VecDeque::from([start]);
    while let Some(current) = active.pop_front() {
        for cell in direct_neighbors(current) {
            let Some(index) = bit_index(board, cell) else {
                continue;
            };
            if visited[index] {
                continue;
            }
            if board.fits(cell, shape.iter().copied()) {
                visited.set(index, true);
                reachable.insert(cell);
                active.push_back(cell);
            }
        }
    }
    reachable
}

fn bit_index(board: &Board, cell: Cell) -> Option<usize> {
    let (x, y) = cell;
    if x < 0 || y < 0 || x >= board.cols() as i32 || y >= board.rows() as i32 {
        return None;
    }
    Some(x as usize * board.rows() + y as usize)
}

/// Greedy best-first test whether the rigid shape can reach any cell of the
/// area; distances are ignored, only reachability matters
pub fn is_reachable_area(
    board: &Board,
    shape: &[Cell],
    start: Cell,
    area: &FxHashSet<Cell>,
) -> bool {
    let c = crate::spatial::shape::center(area.iter().copied());
    let estimate = |p: Cell| (c.0 - p.0).unsigned_abs() + (c.1 - p.1).unsigned_abs();

    let mut visited: FxHashSet<Cell> = FxHashSet::default();
    visited.insert(start);
    let mut sequence: u64 = 0;
    let mut queue: BinaryHeap<Reverse<(u32, u64, Cell)>> = BinaryHeap::new();
    queue.push(Reverse((estimate(start), sequence, start)));

    while let Some(Reverse((_, _, current))) = queue.pop() {
        if area.contains(&current) {
            return true;
        }
        for cell in direct_neighbors(current) {
            if visited.contains(&cell) {
                continue;
            }
            if board.fits(cell, shape.iter().copied()) {
                visited.insert(cell);
                sequence += 1;
                queue.push(Reverse((estimate(cell), sequence, cell)));
            }
        }
    }
    false
}

/// BFS outward from a destination area to the nearest tile strictly outside
/// of it; returns the tile and its distance
pub fn nearest_tile(board: &Board, destination: &FxHashSet<Cell>) -> Option<(TileId, u32)> {
    let mut distance: FxHashMap<Cell, u32> =
        destination.iter().map(|c| (*c, 0)).collect();
    let mut active: VecDeque<Cell> = distance.keys().copied().collect();
    while let Some(current) = active.pop_front() {
        let d = distance.get(&current).copied().unwrap_or(0);
        for cell in direct_neighbors(current) {
            if board.is_blocked(cell.0, cell.1) || distance.contains_key(&cell) {
                continue;
            }
            distance.insert(cell, d + 1);
            active.push_back(cell);
            if let Some(tile) = board.tile_id_at(cell) {
                return Some((tile, d + 1));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{GlueRules, Tile};

    fn open_board(rows: usize, cols: usize) -> Board {
        Board::new(rows, cols, GlueRules::reflexive())
    }

    #[test]
    fn test_distance_map_routes_around_walls() {
        let mut board = open_board(3, 3);
        board.add_concrete(1, 0);
        board.add_concrete(1, 1);
        let distances = compute_distances(&board, [(0, 0)]);
        assert_eq!(distances[[0, 0]], 0.0);
        assert_eq!(distances[[0, 2]], 2.0);
        // (2, 0) is only reachable around the southern gap
        assert_eq!(distances[[2, 0]], 6.0);
        assert!(distances[[1, 0]].is_infinite());
    }

    #[test]
    fn test_shortest_path_for_rigid_domino() {
        let mut board = open_board(4, 4);
        board.add_concrete(2, 1);
        let shape = vec![(0, 0), (1, 0)];
        let moves = shortest_sequence(&board, &shape, (0, 0), (0, 2));
        assert_eq!(moves, Some(vec![Direction::South, Direction::South]));
        // the domino cannot anchor where its second cell hits concrete
        assert!(!is_reachable(&board, &shape, (0, 0), (1, 1)));
    }

    #[test]
    fn test_reachable_set_respects_shape_collisions() {
        let mut board = open_board(2, 3);
        board.add_concrete(2, 1);
        let shape = vec![(0, 0), (1, 0)];
        let reachable = reachable_set(&board, &shape, (0, 0));
        assert!(reachable.contains(&(1, 0)));
        assert!(!reachable.contains(&(1, 1)));
        assert!(!reachable.contains(&(2, 0)));
    }

    #[test]
    fn test_reachable_area_and_path_exists() {
        let mut board = open_board(3, 3);
        board.add_concrete(0, 1);
        board.add_concrete(1, 1);
        board.add_concrete(2, 1);
        let area: FxHashSet<Cell> = [(0, 2), (1, 2)].into_iter().collect();
        assert!(!is_reachable_area(&board, &[(0, 0)], (0, 0), &area));
        assert!(path_exists(
            [(0, 0)],
            |c| c == (5, 5),
            |_| true
        ));
    }

    #[test]
    fn test_nearest_tile_skips_destination_cells() {
        let mut board = open_board(3, 3);
        board.add_tile(Tile::at((0, 0)));
        let far = board.add_tile(Tile::at((2, 2))).unwrap();
        let destination: FxHashSet<Cell> = [(0, 0), (1, 0)].into_iter().collect();
        let (found, distance) = nearest_tile(&board, &destination).unwrap();
        // the tile sitting on the destination is ignored
        assert_eq!(found, far);
        assert_eq!(distance, 3);
    }
}
