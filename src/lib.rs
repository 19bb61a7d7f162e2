//! Tilt motion planning for polyomino self-assembly
//!
//! Given a rectangular board with walls, movable tiles carrying directional
//! glues, and a target polyomino, the planners search for a sequence of
//! global tilts that makes the tiles self-assemble into the target shape.
//! The crate provides the board simulator, a family of best-first planners
//! with pluggable heuristics and pruners, a one-tile-at-a-time construction
//! planner, and an RRT-style configuration-space explorer.

#![forbid(unsafe_code)]

/// Tiles, polyominoes, glue rules, and the tilt simulator
pub mod board;
/// Input/output, errors, and the CLI surface
pub mod io;
/// Search engines, heuristics, pruners, and explorers
pub mod planner;
/// Grid geometry and lattice search
pub mod spatial;

pub use io::error::{Result, SolverError};
pub use planner::{CancelToken, Instance, PlannerConfig, Solver};
