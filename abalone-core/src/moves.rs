//! Selections and moves

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::board::{Direction, Hex};
use crate::error::ParseError;
use crate::game::{Board, Player};

/// Largest number of marbles that may move together
pub const MAX_SELECTION_SIZE: usize = 3;

// ============================================================================
// SELECTION
// ============================================================================

/// One to three collinear, contiguous cells.
///
/// Stored canonically (`start <= end`) so a line selected from either end
/// compares and hashes equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Selection {
    start: Hex,
    end: Hex,
}

impl Selection {
    pub fn single(cell: Hex) -> Self {
        Self { start: cell, end: cell }
    }

    /// Selection spanning `a..=b`, or `None` if the cells are off the board,
    /// not on a common axis, or more than three long
    pub fn new(a: Hex, b: Hex) -> Option<Self> {
        if !a.is_valid() || !b.is_valid() {
            return None;
        }
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        if start == end {
            return Some(Self::single(start));
        }

        let steps = start.distance_to(end);
        if steps as usize >= MAX_SELECTION_SIZE {
            return None;
        }
        Direction::ALL
            .iter()
            .any(|&d| start.offset(d, steps) == end)
            .then_some(Self { start, end })
    }

    pub fn start(&self) -> Hex {
        self.start
    }

    pub fn end(&self) -> Hex {
        self.end
    }

    pub fn size(&self) -> usize {
        self.start.distance_to(self.end) as usize + 1
    }

    /// Axis from start to end, `None` for a single cell
    pub fn direction(&self) -> Option<Direction> {
        if self.start == self.end {
            return None;
        }
        let steps = self.start.distance_to(self.end);
        Direction::ALL
            .into_iter()
            .find(|&d| self.start.offset(d, steps) == self.end)
    }

    /// Cells from start to end
    pub fn cells(&self) -> impl Iterator<Item = Hex> {
        let start = self.start;
        let direction = self.direction();
        (0..self.size() as i8).map(move |i| match direction {
            Some(d) => start.offset(d, i),
            None => start,
        })
    }

    pub fn contains(&self, cell: Hex) -> bool {
        self.cells().any(|c| c == cell)
    }

    /// Owner of the first cell
    pub fn owner(&self, board: &Board) -> Option<Player> {
        board.get(self.start)
    }

    /// Every cell is owned by `side`
    pub fn is_owned_by(&self, board: &Board, side: Player) -> bool {
        self.cells().all(|cell| board.get(cell) == Some(side))
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

// ============================================================================
// MOVE
// ============================================================================

/// A selection pushed one step in a direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Move {
    pub selection: Selection,
    pub direction: Direction,
}

impl Move {
    pub fn new(selection: Selection, direction: Direction) -> Self {
        Self { selection, direction }
    }

    pub fn is_single(&self) -> bool {
        self.selection.size() == 1
    }

    /// Movement along the selection's own axis
    pub fn is_inline(&self) -> bool {
        match self.selection.direction() {
            Some(axis) => axis.is_parallel(self.direction),
            None => false,
        }
    }

    /// Broadside movement of a multi-cell selection
    pub fn is_sidestep(&self) -> bool {
        !self.is_single() && !self.is_inline()
    }

    /// Inline move whose target cell is occupied (assumes a validated move)
    pub fn is_sumito(&self, board: &Board) -> bool {
        match self.front_target() {
            Some(target) if self.is_inline() => board.get(target).is_some(),
            _ => false,
        }
    }

    /// Leading cell relative to the move direction, `None` for side-steps
    pub fn front(&self) -> Option<Hex> {
        if self.is_sidestep() {
            return None;
        }
        let start = self.selection.start();
        if self.selection.contains(start.neighbor(self.direction)) {
            Some(self.selection.end())
        } else {
            Some(start)
        }
    }

    /// Trailing cell relative to the move direction, `None` for side-steps
    pub fn back(&self) -> Option<Hex> {
        if self.is_sidestep() {
            return None;
        }
        let start = self.selection.start();
        if self.selection.contains(start.neighbor(self.direction)) {
            Some(start)
        } else {
            Some(self.selection.end())
        }
    }

    /// Cell directly in front of the leading cell
    pub fn front_target(&self) -> Option<Hex> {
        self.front().map(|front| front.neighbor(self.direction))
    }

    pub fn cells(&self) -> impl Iterator<Item = Hex> {
        self.selection.cells()
    }

    /// Where each selected cell ends up
    pub fn destinations(&self) -> impl Iterator<Item = Hex> {
        let direction = self.direction;
        self.selection.cells().map(move |cell| cell.neighbor(direction))
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.selection, self.direction)
    }
}

/// Parses `"E5 W"` or `"A1-A3 NE"`
impl FromStr for Move {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (cells, direction) = match (parts.next(), parts.next(), parts.next()) {
            (Some(cells), Some(direction), None) => (cells, direction),
            _ => return Err(ParseError::Move(s.to_string())),
        };

        let selection = match cells.split_once('-') {
            Some((a, b)) => Selection::new(a.parse()?, b.parse()?),
            None => Some(Selection::single(cells.parse()?)),
        }
        .ok_or_else(|| ParseError::Move(s.to_string()))?;

        Ok(Move::new(selection, direction.parse()?))
    }
}
