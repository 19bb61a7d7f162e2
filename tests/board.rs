//! Simulator invariants: occupancy, glue closure, determinism, snapshots

use rustc_hash::FxHashSet;
use tiltplan::board::{Board, GlueRules, Glues, Tile};
use tiltplan::spatial::Direction;

fn glued(
    north: Option<&str>,
    east: Option<&str>,
    south: Option<&str>,
    west: Option<&str>,
) -> Glues {
    Glues::new(
        north.map(str::to_string),
        east.map(str::to_string),
        south.map(str::to_string),
        west.map(str::to_string),
    )
}

fn crowded_board() -> Board {
    let mut rules = GlueRules::new();
    rules.add_rule("x", "x");
    rules.add_rule("x", "y");
    let mut board = Board::new(6, 6, rules);
    board.add_concrete(3, 3);
    board.add_concrete(2, 0);
    board.add_tile(Tile::new((0, 0), glued(None, Some("x"), None, None)));
    board.add_tile(Tile::new((5, 0), glued(None, None, None, Some("x"))));
    board.add_tile(Tile::new((0, 5), glued(Some("y"), None, None, None)));
    board.add_tile(Tile::new((5, 5), glued(None, None, Some("x"), None)));
    board.add_tile(Tile::new((2, 2), glued(None, None, None, None)));
    board.activate_glues();
    board
}

fn exercise(board: &mut Board, moves: &[Direction]) {
    for direction in moves {
        board.step(*direction);
        board.activate_glues();
    }
}

const WORKOUT: [Direction; 8] = [
    Direction::North,
    Direction::East,
    Direction::East,
    Direction::South,
    Direction::West,
    Direction::North,
    Direction::West,
    Direction::South,
];

#[test]
fn test_no_two_tiles_share_a_position() {
    let mut board = crowded_board();
    let mut prefix = Vec::new();
    for direction in WORKOUT {
        prefix.push(direction);
        board.step(direction);
        board.activate_glues();
        let positions: FxHashSet<_> = board.tiles().map(|(_, t)| t.position()).collect();
        assert_eq!(
            positions.len(),
            board.number_of_tiles(),
            "tiles overlap after {prefix:?}"
        );
        for (_, tile) in board.tiles() {
            assert!(
                !board.is_blocked(tile.x, tile.y),
                "tile inside a wall after {prefix:?}"
            );
        }
    }
}

#[test]
fn test_glue_closure_leaves_no_sticking_pair_unmerged() {
    let mut board = crowded_board();
    exercise(&mut board, &WORKOUT);
    for (id_a, tile_a) in board.tiles() {
        for (id_b, tile_b) in board.tiles() {
            if id_a == id_b {
                continue;
            }
            let adjacent = (tile_a.x - tile_b.x).abs() + (tile_a.y - tile_b.y).abs() == 1;
            if adjacent && board.glueable(id_a, id_b) {
                assert_eq!(
                    board.poly_of(id_a),
                    board.poly_of(id_b),
                    "sticking neighbours in different polyominoes"
                );
            }
        }
    }
}

#[test]
fn test_step_is_deterministic() {
    let board = crowded_board();
    for direction in Direction::ALL {
        let mut first = board.clone();
        let mut second = board.clone();
        first.step(direction);
        second.step(direction);
        assert_eq!(first.state_hash(), second.state_hash());
        assert_eq!(first.get_state(), second.get_state());
    }
}

#[test]
fn test_snapshot_round_trip_is_identity() {
    let mut board = crowded_board();
    exercise(&mut board, &WORKOUT[..3]);
    let state = board.get_state();
    let hash = board.state_hash();
    let partition: Vec<usize> = board
        .live_polyominoes()
        .map(|(_, p)| p.size())
        .collect();

    exercise(&mut board, &WORKOUT[3..]);
    board.restore_state(&state);

    assert_eq!(board.state_hash(), hash);
    let restored: Vec<usize> = board
        .live_polyominoes()
        .map(|(_, p)| p.size())
        .collect();
    assert_eq!(restored, partition);
    assert_eq!(board.get_state(), state);
}

#[test]
fn test_glue_symmetry_over_all_label_pairs() {
    let mut rules = GlueRules::new();
    rules.add_rule("a", "b");
    rules.add_rule("c", "c");
    let labels = [None, Some("a"), Some("b"), Some("c"), Some("z")];
    for a in labels {
        for b in labels {
            assert_eq!(rules.sticks(a, b), rules.sticks(b, a), "{a:?} vs {b:?}");
        }
    }
    let reflexive = GlueRules::reflexive();
    for a in labels {
        for b in labels {
            assert_eq!(
                reflexive.sticks(a, b),
                reflexive.sticks(b, a),
                "{a:?} vs {b:?}"
            );
        }
    }
}

#[test]
fn test_tumble_is_idempotent() {
    for direction in Direction::ALL {
        let mut board = crowded_board();
        board.tumble(direction);
        let once = board.state_hash();
        board.tumble(direction);
        assert_eq!(board.state_hash(), once, "tumble {direction:?} not idempotent");
    }
}

#[test]
fn test_tumble_glue_bonds_along_the_way() {
    let mut rules = GlueRules::new();
    rules.add_rule("x", "x");
    let mut board = Board::new(1, 6, rules);
    board.add_tile(Tile::new((0, 0), glued(None, Some("x"), None, None)));
    board.add_tile(Tile::new((3, 0), glued(None, None, None, Some("x"))));
    board.tumble_glue(Direction::West);
    assert_eq!(board.live_polyominoes().count(), 1);
    let (_, poly) = board.live_polyominoes().next().unwrap();
    assert_eq!(poly.size(), 2);
    assert_eq!(poly.position(), (0, 0));
}
