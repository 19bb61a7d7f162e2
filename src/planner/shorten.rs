//! Solution post-processing: splicing rigid shortcuts into tilt sequences
//!
//! When two intermediate states of a solution are pure translations of each
//! other, the moves between them can be replaced by the direct rigid path of
//! the whole configuration. Shortening repeats its splice pass until a fixed
//! point, so applying it twice changes nothing.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::board::{Board, BoardState, Glues, PolyId};
use crate::planner::Instance;
use crate::spatial::direction::direct_neighbors;
use crate::spatial::pathfinding::find_shortest_path_with;
use crate::spatial::{Cell, Direction};

/// Movable tiles of a restored board as a position-to-glues map, plus the
/// cells of every polyomino containing a fixed tile
fn position_glues(board: &Board) -> (FxHashMap<Cell, Glues>, Vec<Cell>) {
    let mut fixed_polys: Vec<PolyId> = board
        .fixed_tiles()
        .iter()
        .map(|id| board.poly_of(*id))
        .collect();
    fixed_polys.sort_unstable();
    fixed_polys.dedup();

    let mut fixed_cells = Vec::new();
    let mut fixed_tiles = FxHashSet::default();
    for poly_id in &fixed_polys {
        if let Some(poly) = board.polyomino(*poly_id) {
            for tile in poly.tile_ids() {
                fixed_cells.push(board.tile(tile).position());
                fixed_tiles.insert(tile);
            }
        }
    }

    let map = board
        .tiles()
        .filter(|(id, _)| !fixed_tiles.contains(id))
        .map(|(_, tile)| (tile.position(), tile.glues.clone()))
        .collect();
    (map, fixed_cells)
}

/// Tilt sequence that translates the whole movable configuration of
/// `state1` rigidly into `state2`, if the two are pure translations of each
/// other with identical glues
///
/// Cells adjacent to a fixed polyomino are treated as walls so that the
/// moving configuration cannot brush against its glues.
pub fn direct_path_between_configs(
    board: &Board,
    state1: &BoardState,
    state2: &BoardState,
) -> Option<Vec<Direction>> {
    let mut scratch = board.clone();
    scratch.restore_state(state1);
    let (map1, fixed_cells) = position_glues(&scratch);
    scratch.restore_state(state2);
    let (map2, _) = position_glues(&scratch);

    if map1.len() != map2.len() || map1.is_empty() {
        return None;
    }
    let anchor1 = map1.keys().copied().min()?;
    let anchor2 = map2.keys().copied().min()?;
    for (cell, glues) in &map1 {
        let translated = (
            cell.0 - anchor1.0 + anchor2.0,
            cell.1 - anchor1.1 + anchor2.1,
        );
        if map2.get(&translated) != Some(glues) {
            return None;
        }
    }

    let mut overlay: FxHashSet<Cell> = FxHashSet::default();
    for cell in fixed_cells {
        for neighbor in direct_neighbors(cell) {
            overlay.insert(neighbor);
        }
    }

    let shape: Vec<Cell> = map1
        .keys()
        .map(|(x, y)| (x - anchor1.0, y - anchor1.1))
        .collect();
    let fits = |anchor: Cell| {
        shape.iter().all(|(dx, dy)| {
            let cell = (anchor.0 + dx, anchor.1 + dy);
            !scratch.is_blocked(cell.0, cell.1) && !overlay.contains(&cell)
        })
    };
    find_shortest_path_with(fits, anchor1, anchor2).moves_to(anchor2)
}

fn shorten_pass(instance: &Instance, sequence: &[Direction]) -> Vec<Direction> {
    let mut board = instance.board.clone();
    let mut sequence = sequence.to_vec();
    let mut position = 0usize;

    while position < sequence.len() {
        let current_state = board.get_state();
        let mut last = position;
        let mut last_state = board.get_state();
        let mut new_path: Option<Vec<Direction>> = None;

        for i in position..sequence.len() {
            board.step(sequence[i]);
            board.activate_glues();
            let state = board.get_state();
            if let Some(path) = direct_path_between_configs(&board, &current_state, &state) {
                if path.len() < i - position + 1 {
                    last = i;
                    last_state = state;
                    new_path = Some(path);
                }
            }
        }

        let Some(path) = new_path else {
            position += 1;
            board.restore_state(&last_state);
            board.activate_glues();
            if let Some(&next) = sequence.get(position - 1) {
                board.step(next);
            }
            continue;
        };

        sequence.splice(position..=last, path.iter().copied());
        position += path.len() + 1;

        board.restore_state(&last_state);
        board.activate_glues();
        match sequence.get(position - 1) {
            Some(&next) => {
                board.step(next);
                board.activate_glues();
            }
            None => break,
        }
    }
    sequence
}

/// Shorten a tilt sequence by splicing in direct rigid paths
///
/// Only strictly shorter shortcuts are taken, and the pass repeats until no
/// further splice applies, which makes the result a fixed point of the
/// procedure.
pub fn shorten_solution(instance: &Instance, sequence: &[Direction]) -> Vec<Direction> {
    let mut current = sequence.to_vec();
    loop {
        let next = shorten_pass(instance, &current);
        if next == current {
            return current;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{GlueRules, TargetShape, Tile};

    fn execute(board: &Board, sequence: &[Direction]) -> Board {
        let mut board = board.clone();
        for direction in sequence {
            board.step(*direction);
            board.activate_glues();
        }
        board
    }

    #[test]
    fn test_direct_path_found_for_pure_translation() {
        let mut board = Board::new(5, 5, GlueRules::reflexive());
        board.add_tile(Tile::at((1, 1)));
        board.add_tile(Tile::at((2, 1)));
        let state1 = board.get_state();
        let moved = execute(&board, &[Direction::South, Direction::South]);
        let state2 = moved.get_state();
        let path = direct_path_between_configs(&board, &state1, &state2).unwrap();
        assert_eq!(path, vec![Direction::South, Direction::South]);
    }

    #[test]
    fn test_direct_path_rejected_when_relative_layout_changes() {
        let mut board = Board::new(5, 5, GlueRules::reflexive());
        board.add_tile(Tile::at((1, 1)));
        board.add_tile(Tile::at((3, 1)));
        let state1 = board.get_state();
        // tilting west compresses the pair against the wall
        let moved = execute(&board, &[Direction::West, Direction::West, Direction::West]);
        let state2 = moved.get_state();
        assert!(direct_path_between_configs(&board, &state1, &state2).is_none());
    }

    #[test]
    fn test_shorten_is_idempotent_and_preserves_outcome() {
        let mut board = Board::new(5, 5, GlueRules::reflexive());
        board.add_tile(Tile::at((4, 4)));
        let instance = Instance {
            board,
            target_shape: TargetShape::new(vec![Tile::at((0, 0))]),
        };
        // a wasteful sequence that still ends at the west wall, row 4
        let sequence = [
            Direction::North,
            Direction::South,
            Direction::West,
            Direction::West,
            Direction::West,
            Direction::West,
        ];
        let shortened = shorten_solution(&instance, &sequence);
        assert!(shortened.len() <= sequence.len());
        let twice = shorten_solution(&instance, &shortened);
        assert_eq!(twice, shortened);
        let final_board = execute(&instance.board, &shortened);
        let expected = execute(&instance.board, &sequence);
        assert_eq!(final_board.state_hash(), expected.state_hash());
    }
}
