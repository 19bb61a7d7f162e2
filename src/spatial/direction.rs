//! Tilt directions on the 4-neighbour lattice
//!
//! The coordinate system has x growing east and y growing south, so north is
//! the negative y direction. A control sequence is a string of direction
//! characters, one global tilt pulse per character.

/// A grid cell as `(x, y)` integer coordinates
pub type Cell = (i32, i32);

/// One of the four global tilt directions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Negative y
    North,
    /// Positive x
    East,
    /// Positive y
    South,
    /// Negative x
    West,
}

impl Direction {
    /// All directions in canonical expansion order
    pub const ALL: [Self; 4] = [Self::North, Self::East, Self::South, Self::West];

    /// Unit vector of the direction
    pub const fn vector(self) -> Cell {
        match self {
            Self::North => (0, -1),
            Self::East => (1, 0),
            Self::South => (0, 1),
            Self::West => (-1, 0),
        }
    }

    /// Opposite direction
    pub const fn inverse(self) -> Self {
        match self {
            Self::North => Self::South,
            Self::East => Self::West,
            Self::South => Self::North,
            Self::West => Self::East,
        }
    }

    /// Direction corresponding to a unit vector, if any
    pub const fn from_vector(vector: Cell) -> Option<Self> {
        match vector {
            (0, -1) => Some(Self::North),
            (1, 0) => Some(Self::East),
            (0, 1) => Some(Self::South),
            (-1, 0) => Some(Self::West),
            _ => None,
        }
    }

    /// Single-character code used in control sequences
    pub const fn as_char(self) -> char {
        match self {
            Self::North => 'N',
            Self::East => 'E',
            Self::South => 'S',
            Self::West => 'W',
        }
    }

    /// Parse a control-sequence character
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'N' => Some(Self::North),
            'E' => Some(Self::East),
            'S' => Some(Self::South),
            'W' => Some(Self::West),
            _ => None,
        }
    }
}

/// Neighbour of a cell in the given direction
pub const fn neighbor(cell: Cell, direction: Direction) -> Cell {
    let (dx, dy) = direction.vector();
    (cell.0 + dx, cell.1 + dy)
}

/// The four direct (edge-sharing) neighbours of a cell
pub const fn direct_neighbors(cell: Cell) -> [Cell; 4] {
    let (x, y) = cell;
    [(x, y - 1), (x + 1, y), (x, y + 1), (x - 1, y)]
}

/// Encode a control sequence as its character string
pub fn sequence_string(sequence: &[Direction]) -> String {
    sequence.iter().map(|d| d.as_char()).collect()
}

/// Parse a control sequence string; `None` on any unknown character
pub fn parse_sequence(s: &str) -> Option<Vec<Direction>> {
    s.chars().map(Direction::from_char).collect()
}

/// Compact set of directions, used for per-node candidate moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionSet(u8);

impl DirectionSet {
    /// Set containing every direction
    pub const ALL: Self = Self(0b1111);
    /// The empty set
    pub const EMPTY: Self = Self(0);

    const fn bit(direction: Direction) -> u8 {
        match direction {
            Direction::North => 1,
            Direction::East => 2,
            Direction::South => 4,
            Direction::West => 8,
        }
    }

    /// Add a direction to the set
    pub const fn insert(&mut self, direction: Direction) {
        self.0 |= Self::bit(direction);
    }

    /// True iff the set contains the direction
    pub const fn contains(self, direction: Direction) -> bool {
        self.0 & Self::bit(direction) != 0
    }

    /// Number of directions in the set
    pub const fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    /// True iff the set is empty
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained directions in canonical order
    pub fn iter(self) -> impl Iterator<Item = Direction> {
        Direction::ALL.into_iter().filter(move |d| self.contains(*d))
    }
}

impl Default for DirectionSet {
    fn default() -> Self {
        Self::ALL
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vector_inverse_round_trip() {
        for d in Direction::ALL {
            let (dx, dy) = d.vector();
            assert_eq!(Direction::from_vector((-dx, -dy)), Some(d.inverse()));
            assert_eq!(d.inverse().inverse(), d);
        }
    }

    #[test]
    fn test_sequence_codec() {
        let sequence = [
            Direction::West,
            Direction::North,
            Direction::East,
            Direction::South,
        ];
        let encoded = sequence_string(&sequence);
        assert_eq!(encoded, "WNES");
        assert_eq!(parse_sequence(&encoded).as_deref(), Some(&sequence[..]));
        assert_eq!(parse_sequence("NX"), None);
    }

    #[test]
    fn test_direction_set() {
        let mut set = DirectionSet::EMPTY;
        assert!(set.is_empty());
        set.insert(Direction::East);
        set.insert(Direction::West);
        assert_eq!(set.len(), 2);
        assert!(set.contains(Direction::East));
        assert!(!set.contains(Direction::North));
        let collected: Vec<_> = set.iter().collect();
        assert_eq!(collected, vec![Direction::East, Direction::West]);
    }
}
