//! Hex board geometry with axial coordinates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// Board radius (distance from center to edge)
pub const BOARD_RADIUS: i8 = 4;

/// Number of cells on a radius-4 hexagon
pub const CELL_COUNT: usize = 61;

/// Number of rows (and the widest row)
pub const ROW_COUNT: usize = 9;

/// Index of the first cell of each row, top row (r = -4) first
const ROW_START: [usize; ROW_COUNT] = [0, 5, 11, 18, 26, 35, 43, 50, 56];

/// Axial hex coordinates, (0, 0) is the board center
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Hex {
    pub q: i8,
    pub r: i8,
}

impl Hex {
    pub const CENTER: Hex = Hex::new(0, 0);

    pub const fn new(q: i8, r: i8) -> Self {
        Self { q, r }
    }

    /// Check if this hex is on the board
    pub fn is_valid(&self) -> bool {
        self.q.abs() <= BOARD_RADIUS
            && self.r.abs() <= BOARD_RADIUS
            && (self.q + self.r).abs() <= BOARD_RADIUS
    }

    /// Distance from center (0,0)
    pub fn distance_to_center(&self) -> i8 {
        (self.q.abs() + self.r.abs() + (self.q + self.r).abs()) / 2
    }

    /// Distance between two hexes
    pub fn distance_to(&self, other: Hex) -> i8 {
        let dq = (self.q - other.q).abs();
        let dr = (self.r - other.r).abs();
        let ds = ((self.q + self.r) - (other.q + other.r)).abs();
        (dq + dr + ds) / 2
    }

    /// Neighbor one step in `direction` (may be off the board)
    pub fn neighbor(&self, direction: Direction) -> Hex {
        self.offset(direction, 1)
    }

    /// Hex `steps` away in `direction`
    pub fn offset(&self, direction: Direction, steps: i8) -> Hex {
        let (dq, dr) = direction.delta();
        Hex::new(self.q + dq * steps, self.r + dr * steps)
    }

    /// All six neighbors, in `Direction::ALL` order
    pub fn neighbors(&self) -> impl Iterator<Item = Hex> + '_ {
        Direction::ALL.iter().map(move |&d| self.neighbor(d))
    }

    /// Dense cell index in `0..CELL_COUNT`, top row first
    pub fn index(&self) -> Option<usize> {
        if !self.is_valid() {
            return None;
        }
        let row = (self.r + BOARD_RADIUS) as usize;
        Some(ROW_START[row] + (self.q - row_min_q(self.r)) as usize)
    }

    /// Inverse of [`Hex::index`]
    pub fn from_index(index: usize) -> Option<Hex> {
        if index >= CELL_COUNT {
            return None;
        }
        let row = ROW_START.iter().rposition(|&start| start <= index)?;
        let r = row as i8 - BOARD_RADIUS;
        let q = row_min_q(r) + (index - ROW_START[row]) as i8;
        Some(Hex::new(q, r))
    }

    /// Every board cell in index order
    pub fn all() -> impl Iterator<Item = Hex> {
        (0..CELL_COUNT).filter_map(Hex::from_index)
    }
}

/// Smallest q on row r
pub(crate) fn row_min_q(r: i8) -> i8 {
    (-BOARD_RADIUS).max(-BOARD_RADIUS - r)
}

/// Number of cells on row r
pub(crate) fn row_width(r: i8) -> usize {
    (2 * BOARD_RADIUS + 1 - r.abs()) as usize
}

/// Abalone notation: rows A (bottom) to I (top), columns 1..9
impl fmt::Display for Hex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let row = (b'A' as i8 + BOARD_RADIUS - self.r) as u8 as char;
        write!(f, "{}{}", row, self.q + BOARD_RADIUS + 1)
    }
}

impl FromStr for Hex {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let (row, col) = match (chars.next(), chars.next(), chars.next()) {
            (Some(row), Some(col), None) => (row.to_ascii_uppercase(), col),
            _ => return Err(ParseError::Cell(s.to_string())),
        };
        if !('A'..='I').contains(&row) || !('1'..='9').contains(&col) {
            return Err(ParseError::Cell(s.to_string()));
        }
        let r = BOARD_RADIUS - (row as i8 - b'A' as i8);
        let q = (col as i8 - b'0' as i8) - BOARD_RADIUS - 1;
        let hex = Hex::new(q, r);
        if hex.is_valid() {
            Ok(hex)
        } else {
            Err(ParseError::Cell(s.to_string()))
        }
    }
}

/// The six hex directions in axial coordinates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    NW,
    NE,
    W,
    E,
    SW,
    SE,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::NW,
        Direction::NE,
        Direction::W,
        Direction::E,
        Direction::SW,
        Direction::SE,
    ];

    /// Direction vector (dq, dr)
    pub const fn delta(self) -> (i8, i8) {
        match self {
            Direction::NW => (0, -1),
            Direction::NE => (1, -1),
            Direction::W => (-1, 0),
            Direction::E => (1, 0),
            Direction::SW => (-1, 1),
            Direction::SE => (0, 1),
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::NW => Direction::SE,
            Direction::NE => Direction::SW,
            Direction::W => Direction::E,
            Direction::E => Direction::W,
            Direction::SW => Direction::NE,
            Direction::SE => Direction::NW,
        }
    }

    /// True if both directions lie on the same axis
    pub fn is_parallel(self, other: Direction) -> bool {
        self == other || self == other.opposite()
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for Direction {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NW" => Ok(Direction::NW),
            "NE" => Ok(Direction::NE),
            "W" => Ok(Direction::W),
            "E" => Ok(Direction::E),
            "SW" => Ok(Direction::SW),
            "SE" => Ok(Direction::SE),
            _ => Err(ParseError::Direction(s.to_string())),
        }
    }
}
