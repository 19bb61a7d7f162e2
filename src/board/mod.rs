//! Data model of tiles, polyominoes, glue rules, and the tilt simulator

/// Board state, the tilt step, and glue activation
pub mod board;
/// Glue labels and sticking rules
pub mod glues;
/// Rigid tile groups and target shapes
pub mod polyomino;
/// Tile records and arena identifiers
pub mod tile;

pub use board::{Board, BoardState};
pub use glues::{GlueRules, Glues};
pub use polyomino::{Polyomino, TargetShape};
pub use tile::{PolyId, Tile, TileId};
