//! Glue labels and the symmetric sticking relation between them

use rustc_hash::FxHashSet;

use crate::spatial::Direction;

/// The four directional glue labels of a tile
///
/// `None` means no glue on that edge. Treated as an immutable value; tiles
/// with equal `Glues` are interchangeable for blueprint purposes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Glues {
    /// Glue on the north edge
    pub north: Option<String>,
    /// Glue on the east edge
    pub east: Option<String>,
    /// Glue on the south edge
    pub south: Option<String>,
    /// Glue on the west edge
    pub west: Option<String>,
}

impl Glues {
    /// Create a glue tuple from the four edge labels in N, E, S, W order
    pub fn new(
        north: Option<String>,
        east: Option<String>,
        south: Option<String>,
        west: Option<String>,
    ) -> Self {
        Self {
            north,
            east,
            south,
            west,
        }
    }

    /// A tile with no glue on any edge
    pub const fn blank() -> Self {
        Self {
            north: None,
            east: None,
            south: None,
            west: None,
        }
    }

    /// Glue label on the given edge
    pub fn side(&self, direction: Direction) -> Option<&str> {
        match direction {
            Direction::North => self.north.as_deref(),
            Direction::East => self.east.as_deref(),
            Direction::South => self.south.as_deref(),
            Direction::West => self.west.as_deref(),
        }
    }

    /// True iff no edge carries a glue
    pub const fn is_blank(&self) -> bool {
        self.north.is_none() && self.east.is_none() && self.south.is_none() && self.west.is_none()
    }
}

/// Symmetric binary sticking relation over glue labels
///
/// The plain variant sticks only explicitly declared pairs. The reflexive
/// variant additionally sticks any pair of identical non-null labels.
/// `sticks(a, b) == sticks(b, a)` holds for every pair, and nothing sticks
/// to a missing glue.
#[derive(Debug, Clone, Default)]
pub struct GlueRules {
    pairs: FxHashSet<(String, String)>,
    reflexive: bool,
}

impl GlueRules {
    /// Create an empty plain relation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty reflexive relation
    pub fn reflexive() -> Self {
        Self {
            pairs: FxHashSet::default(),
            reflexive: true,
        }
    }

    /// True for the reflexive variant
    pub const fn is_reflexive(&self) -> bool {
        self.reflexive
    }

    /// Declare that two labels stick; the relation stays symmetric
    pub fn add_rule(&mut self, a: &str, b: &str) {
        self.pairs.insert((a.to_string(), b.to_string()));
        self.pairs.insert((b.to_string(), a.to_string()));
    }

    /// True iff the two labels stick
    pub fn sticks(&self, a: Option<&str>, b: Option<&str>) -> bool {
        let (Some(a), Some(b)) = (a, b) else {
            return false;
        };
        if self.reflexive && a == b {
            return true;
        }
        self.pairs.contains(&(a.to_string(), b.to_string()))
    }

    /// Declared rules with each symmetric pair reported once, sorted
    pub fn unique_rules(&self) -> Vec<(String, String)> {
        let mut unique: Vec<(String, String)> = self
            .pairs
            .iter()
            .filter(|(a, b)| a <= b)
            .cloned()
            .collect();
        unique.sort();
        unique
    }

}
