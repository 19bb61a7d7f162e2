//! Performance measurement for the best-first planner at varying board sizes

// Criterion macros generate undocumented functions
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tiltplan::board::{Board, GlueRules, Glues, TargetShape, Tile};
use tiltplan::planner::heuristic::HeuristicKind;
use tiltplan::planner::search::get_motion_planner;
use tiltplan::{CancelToken, Instance, PlannerConfig, Solver};

fn bond_instance(size: usize) -> Instance {
    let mut rules = GlueRules::new();
    rules.add_rule("x", "x");
    let mut board = Board::new(size, size, rules);
    let far = (size - 1) as i32;
    board.add_tile(Tile::new(
        (0, 0),
        Glues::new(None, None, Some("x".to_string()), None),
    ));
    board.add_tile(Tile::new(
        (far, far),
        Glues::new(Some("x".to_string()), None, None, None),
    ));
    Instance {
        board,
        target_shape: TargetShape::new(vec![Tile::at((0, 0)), Tile::at((0, 1))]),
    }
}

/// Measures full solve time for the two-tile bond as the board grows
fn bench_best_first_bond(c: &mut Criterion) {
    let mut group = c.benchmark_group("best_first_bond");
    for size in &[4usize, 6, 8] {
        let instance = bond_instance(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut planner = get_motion_planner(
                    &instance,
                    HeuristicKind::GreatestDistance,
                    None,
                    &PlannerConfig::default(),
                    CancelToken::new(),
                );
                black_box(planner.solve())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_best_first_bond);
criterion_main!(benches);
