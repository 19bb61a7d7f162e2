//! Instance JSON codec
//!
//! One instance file holds a board (dimensions, concrete mask, tiles, glue
//! rules, optional fixed tiles) and the target shape. The concrete mask is
//! serialized with the outer index running over x and the inner index over
//! y, and dimensions are validated strictly on decode.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::board::{Board, GlueRules, Glues, TargetShape, Tile};
use crate::io::error::{Result, fs_error, malformed_input};
use crate::planner::Instance;

/// Serialized tile: position, the four glues in N, E, S, W order, color
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileJson {
    /// x coordinate
    pub x: i32,
    /// y coordinate
    pub y: i32,
    /// Glue labels in N, E, S, W order; `null` means no glue
    pub glues: [Option<String>; 4],
    /// Display color
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_color() -> String {
    Tile::DEFAULT_COLOR.to_string()
}

/// Serialized glue relation: declared pairs plus the variant name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlueRulesJson {
    /// Declared sticking pairs
    pub rules: Vec<(String, String)>,
    /// `"GlueRules"` or `"ReflexiveGlueRules"`
    pub class: String,
}

/// Serialized board
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardJson {
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
    /// Wall mask, `concrete[x][y]`
    pub concrete: Vec<Vec<bool>>,
    /// Tiles on the board
    pub tiles: Vec<TileJson>,
    /// The glue relation
    #[serde(rename = "glueRules")]
    pub glue_rules: GlueRulesJson,
    /// Positions of fixed seed tiles, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed_tiles: Option<Vec<(i32, i32)>>,
}

/// Serialized target shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeJson {
    /// Cells of the shape given as tiles
    pub tiles: Vec<TileJson>,
}

/// Serialized instance: board plus target shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceJson {
    /// The initial board
    pub board: BoardJson,
    /// The shape to assemble
    pub target_shape: ShapeJson,
}

fn tile_from_json(json: &TileJson) -> Tile {
    let [north, east, south, west] = json.glues.clone();
    Tile {
        x: json.x,
        y: json.y,
        glues: Glues::new(north, east, south, west),
        color: json.color.clone(),
    }
}

fn tile_to_json(tile: &Tile) -> TileJson {
    TileJson {
        x: tile.x,
        y: tile.y,
        glues: [
            tile.glues.north.clone(),
            tile.glues.east.clone(),
            tile.glues.south.clone(),
            tile.glues.west.clone(),
        ],
        color: tile.color.clone(),
    }
}

/// Build an [`Instance`] from its serialized form
///
/// # Errors
///
/// [`crate::SolverError::MalformedInput`] on unknown rule classes, concrete
/// dimension mismatches, fixed tiles pointing at empty cells, or an empty
/// target shape. `path` is only used for error reporting.
pub fn decode_instance(json: &InstanceJson, path: &Path) -> Result<Instance> {
    let mut rules = match json.board.glue_rules.class.as_str() {
        "GlueRules" => GlueRules::new(),
        "ReflexiveGlueRules" => GlueRules::reflexive(),
        other => {
            return Err(malformed_input(
                path,
                &format!("unknown glue rules class '{other}'"),
            ));
        }
    };
    for (a, b) in &json.board.glue_rules.rules {
        rules.add_rule(a, b);
    }

    let mut board = Board::new(json.board.height, json.board.width, rules);

    if json.board.concrete.len() != json.board.width {
        return Err(malformed_input(
            path,
            &format!(
                "concrete mask has {} columns, expected {}",
                json.board.concrete.len(),
                json.board.width
            ),
        ));
    }
    for (x, column) in json.board.concrete.iter().enumerate() {
        if column.len() != json.board.height {
            return Err(malformed_input(
                path,
                &format!(
                    "concrete column {x} has {} cells, expected {}",
                    column.len(),
                    json.board.height
                ),
            ));
        }
        for (y, value) in column.iter().enumerate() {
            if *value {
                board.add_concrete(x as i32, y as i32);
            }
        }
    }

    for tile in &json.board.tiles {
        // occupancy conflicts are dropped silently, as add() documents
        board.add_tile(tile_from_json(tile));
    }

    if let Some(fixed) = &json.board.fixed_tiles {
        for position in fixed {
            let Some(id) = board.tile_id_at(*position) else {
                return Err(malformed_input(
                    path,
                    &format!("fixed tile at ({}, {}) has no tile", position.0, position.1),
                ));
            };
            board.mark_fixed(id);
        }
    }
    board.activate_glues();

    if json.target_shape.tiles.is_empty() {
        return Err(malformed_input(path, &"target shape has no tiles"));
    }
    let target_shape =
        TargetShape::new(json.target_shape.tiles.iter().map(tile_from_json).collect());

    Ok(Instance {
        board,
        target_shape,
    })
}

/// Serialize an [`Instance`]
pub fn encode_instance(instance: &Instance) -> InstanceJson {
    let board = &instance.board;
    let mut concrete = vec![vec![false; board.rows()]; board.cols()];
    for (x, column) in concrete.iter_mut().enumerate() {
        for (y, value) in column.iter_mut().enumerate() {
            // in bounds, blocked means concrete
            *value = board.is_blocked(x as i32, y as i32);
        }
    }

    let fixed: Vec<(i32, i32)> = board
        .fixed_tiles()
        .iter()
        .map(|id| board.tile(*id).position())
        .collect();

    InstanceJson {
        board: BoardJson {
            width: board.cols(),
            height: board.rows(),
            concrete,
            tiles: board.tiles().map(|(_, t)| tile_to_json(t)).collect(),
            glue_rules: GlueRulesJson {
                rules: board.glue_rules().unique_rules(),
                class: if board.glue_rules().is_reflexive() {
                    "ReflexiveGlueRules".to_string()
                } else {
                    "GlueRules".to_string()
                },
            },
            fixed_tiles: (!fixed.is_empty()).then_some(fixed),
        },
        target_shape: ShapeJson {
            tiles: instance.target_shape.tiles().iter().map(tile_to_json).collect(),
        },
    }
}

/// Read and decode an instance file
///
/// # Errors
///
/// [`crate::SolverError::FileSystem`] when the file cannot be read and
/// [`crate::SolverError::MalformedInput`] when it does not match the schema.
pub fn read_instance(path: &Path) -> Result<Instance> {
    let text = fs::read_to_string(path).map_err(|e| fs_error(path, "read", e))?;
    let json: InstanceJson =
        serde_json::from_str(&text).map_err(|e| malformed_input(path, &e))?;
    decode_instance(&json, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> String {
        r##"{
            "board": {
                "width": 3,
                "height": 3,
                "concrete": [
                    [false, false, false],
                    [false, true, false],
                    [false, false, false]
                ],
                "tiles": [
                    {"x": 0, "y": 0, "glues": ["a", null, null, null], "color": "#FF0000"},
                    {"x": 2, "y": 2, "glues": [null, null, "a", null], "color": "#00FF00"}
                ],
                "glueRules": {"rules": [["a", "a"]], "class": "GlueRules"},
                "fixed_tiles": [[0, 0]]
            },
            "target_shape": {
                "tiles": [
                    {"x": 0, "y": 0, "glues": [null, null, null, null], "color": "#FFFF00"},
                    {"x": 0, "y": 1, "glues": [null, null, null, null], "color": "#FFFF00"}
                ]
            }
        }"##
        .to_string()
    }

    #[test]
    fn test_decode_sample_instance() {
        let json: InstanceJson = serde_json::from_str(&sample_json()).unwrap();
        let instance = decode_instance(&json, Path::new("sample.json")).unwrap();
        let board = &instance.board;
        assert_eq!(board.rows(), 3);
        assert_eq!(board.cols(), 3);
        assert!(board.is_blocked(1, 1));
        assert_eq!(board.number_of_tiles(), 2);
        assert_eq!(board.fixed_tiles().len(), 1);
        assert!(board.glue_rules().sticks(Some("a"), Some("a")));
        assert!(!board.glue_rules().is_reflexive());
        assert_eq!(instance.target_shape.size(), 2);
        assert_eq!(instance.target_shape.position(), (0, 0));
    }

    #[test]
    fn test_round_trip_preserves_structure() {
        let json: InstanceJson = serde_json::from_str(&sample_json()).unwrap();
        let instance = decode_instance(&json, Path::new("sample.json")).unwrap();
        let encoded = encode_instance(&instance);
        let again = decode_instance(&encoded, Path::new("sample.json")).unwrap();
        assert_eq!(
            instance.board.state_hash(),
            again.board.state_hash()
        );
        assert_eq!(again.board.fixed_tiles().len(), 1);
        assert_eq!(
            again.target_shape.cells(),
            instance.target_shape.cells()
        );
    }

    #[test]
    fn test_dimension_mismatch_is_malformed() {
        let mut json: InstanceJson = serde_json::from_str(&sample_json()).unwrap();
        json.board.concrete.pop();
        assert!(decode_instance(&json, Path::new("bad.json")).is_err());
    }

    #[test]
    fn test_unknown_rule_class_is_malformed() {
        let mut json: InstanceJson = serde_json::from_str(&sample_json()).unwrap();
        json.board.glue_rules.class = "MagneticRules".to_string();
        assert!(decode_instance(&json, Path::new("bad.json")).is_err());
    }
}
