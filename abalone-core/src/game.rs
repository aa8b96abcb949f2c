//! Board state, move legality and move application

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::board::{row_min_q, row_width, Direction, Hex, BOARD_RADIUS, CELL_COUNT};
use crate::moves::Move;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Marbles a side must push off to win
pub const WIN_SCORE: u8 = 6;

/// Largest number of marbles an inline move may push
pub const MAX_SUMITO: usize = 3;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Player color
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Player {
    Black = 0,
    White = 1,
}

impl Player {
    pub const ALL: [Player; 2] = [Player::Black, Player::White];

    pub fn opponent(self) -> Self {
        match self {
            Player::Black => Player::White,
            Player::White => Player::Black,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Player {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Player::Black => f.write_str("black"),
            Player::White => f.write_str("white"),
        }
    }
}

impl std::str::FromStr for Player {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "black" | "b" => Ok(Player::Black),
            "white" | "w" => Ok(Player::White),
            _ => Err(format!("unknown side: {}", s)),
        }
    }
}

/// Opposing marbles in front of an inline move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PushedLine {
    pub owner: Player,
    pub first: Hex,
    pub len: u8,
    pub direction: Direction,
}

impl PushedLine {
    /// Cell the last pushed marble lands on (off the board when pushed out)
    pub fn landing(&self) -> Hex {
        self.first.offset(self.direction, self.len as i8)
    }
}

// ============================================================================
// BOARD
// ============================================================================

/// Marble positions plus each side's starting count (for scoring)
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Board {
    cells: [Option<Player>; CELL_COUNT],
    starting: [u8; 2],
}

impl Default for Board {
    fn default() -> Self {
        Self::empty()
    }
}

impl Board {
    // ========================================================================
    // CONSTRUCTORS
    // ========================================================================

    pub fn empty() -> Self {
        Self {
            cells: [None; CELL_COUNT],
            starting: [0; 2],
        }
    }

    /// Board holding `pieces`, which are also taken as the starting layout
    pub fn from_pieces(pieces: &[(Hex, Player)]) -> Self {
        let mut board = Self::empty();
        for &(cell, player) in pieces {
            board.set(cell, Some(player));
        }
        board.starting = [
            board.marble_count(Player::Black),
            board.marble_count(Player::White),
        ];
        board
    }

    /// Board holding `pieces` that started the game with `starting` marbles
    /// per side (black, white)
    pub fn from_position(pieces: &[(Hex, Player)], starting: [u8; 2]) -> Self {
        let mut board = Self::from_pieces(pieces);
        board.starting = starting;
        board
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    /// Owner of a cell, `None` when empty or off the board
    pub fn get(&self, cell: Hex) -> Option<Player> {
        cell.index().and_then(|i| self.cells[i])
    }

    pub(crate) fn set(&mut self, cell: Hex, value: Option<Player>) {
        if let Some(i) = cell.index() {
            self.cells[i] = value;
        }
    }

    pub fn cell_in_bounds(&self, cell: Hex) -> bool {
        cell.is_valid()
    }

    pub fn cell_owned_by(&self, cell: Hex, side: Player) -> bool {
        self.get(cell) == Some(side)
    }

    /// Every cell with its owner, in index order
    pub fn enumerate_cells(&self) -> impl Iterator<Item = (Hex, Option<Player>)> + '_ {
        Hex::all().zip(self.cells.iter().copied())
    }

    /// Occupied cells only
    pub fn pieces(&self) -> impl Iterator<Item = (Hex, Player)> + '_ {
        self.enumerate_cells()
            .filter_map(|(cell, owner)| owner.map(|p| (cell, p)))
    }

    pub fn marble_count(&self, side: Player) -> u8 {
        self.cells.iter().filter(|&&c| c == Some(side)).count() as u8
    }

    pub fn starting_count(&self, side: Player) -> u8 {
        self.starting[side.index()]
    }

    /// Opponent marbles pushed off by `side`, saturating at [`WIN_SCORE`]
    pub fn score(&self, side: Player) -> u8 {
        let opponent = side.opponent();
        self.starting_count(opponent)
            .saturating_sub(self.marble_count(opponent))
            .min(WIN_SCORE)
    }

    pub fn winner(&self) -> Option<Player> {
        Player::ALL.into_iter().find(|&p| self.score(p) >= WIN_SCORE)
    }

    pub fn is_game_over(&self) -> bool {
        self.winner().is_some()
    }

    /// No two adjacent marbles belong to opposing sides
    pub fn is_quiet(&self) -> bool {
        const HALF: [Direction; 3] = [Direction::E, Direction::SE, Direction::SW];
        self.pieces().all(|(cell, owner)| {
            HALF.iter().all(|&d| match self.get(cell.neighbor(d)) {
                Some(other) => other == owner,
                None => true,
            })
        })
    }

    // ========================================================================
    // LEGALITY
    // ========================================================================

    /// Whether `side` may play `mv` on this board
    pub fn is_valid_move(&self, mv: &Move, side: Player) -> bool {
        if !mv.selection.is_owned_by(self, side) {
            return false;
        }
        if mv.is_single() {
            let dest = mv.selection.start().neighbor(mv.direction);
            return dest.is_valid() && self.get(dest).is_none();
        }
        if mv.is_inline() {
            return self.is_valid_inline_move(mv, side);
        }
        self.is_valid_sidestep_move(mv)
    }

    fn is_valid_inline_move(&self, mv: &Move, side: Player) -> bool {
        let Some(mut cell) = mv.front() else {
            return false;
        };
        let size = mv.selection.size();
        let mut pushing = false;

        for i in 1..=MAX_SUMITO {
            cell = cell.neighbor(mv.direction);
            if !cell.is_valid() {
                // Pushing off the edge is fine, walking off it is not
                return pushing;
            }
            match self.get(cell) {
                None => return true,
                Some(owner) if owner == side => return false,
                Some(_) => {
                    if i >= size {
                        return false;
                    }
                    pushing = true;
                }
            }
        }

        true
    }

    fn is_valid_sidestep_move(&self, mv: &Move) -> bool {
        mv.destinations()
            .all(|dest| self.cell_in_bounds(dest) && self.get(dest).is_none())
    }

    // ========================================================================
    // APPLY MOVE
    // ========================================================================

    /// Opposing line a (validated) inline move pushes, if any
    pub fn pushed_line(&self, mv: &Move) -> Option<PushedLine> {
        if !mv.is_inline() {
            return None;
        }
        let attacker = mv.selection.owner(self)?;
        let first = mv.front_target()?;
        let owner = self.get(first)?;
        if owner == attacker {
            return None;
        }

        let mut len = 1;
        while self.get(first.offset(mv.direction, len)) == Some(owner) {
            len += 1;
        }
        Some(PushedLine {
            owner,
            first,
            len: len as u8,
            direction: mv.direction,
        })
    }

    /// Apply a move in place. The move must be valid for its owner.
    pub fn apply_move(&mut self, mv: &Move) {
        let Some(attacker) = mv.selection.owner(self) else {
            return;
        };

        // Only the far end of a pushed line changes; the front cell is
        // overwritten by the attacker below.
        if let Some(line) = self.pushed_line(mv) {
            self.set(line.landing(), Some(line.owner));
        }

        for cell in mv.cells() {
            self.set(cell, None);
        }
        for dest in mv.destinations() {
            self.set(dest, Some(attacker));
        }
    }

    /// Copy of this board with `mv` applied
    pub fn with_move(&self, mv: &Move) -> Self {
        let mut next = self.clone();
        next.apply_move(mv);
        next
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in -BOARD_RADIUS..=BOARD_RADIUS {
            let row = (b'A' as i8 + BOARD_RADIUS - r) as u8 as char;
            write!(f, "{}{}", row, " ".repeat(r.unsigned_abs() as usize + 1))?;
            let min_q = row_min_q(r);
            for i in 0..row_width(r) as i8 {
                let symbol = match self.get(Hex::new(min_q + i, r)) {
                    Some(Player::Black) => 'b',
                    Some(Player::White) => 'w',
                    None => '.',
                };
                write!(f, "{} ", symbol)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::moves::Selection;

    fn hex(s: &str) -> Hex {
        s.parse().unwrap()
    }

    fn mv(s: &str) -> Move {
        s.parse().unwrap()
    }

    fn board(black: &[&str], white: &[&str]) -> Board {
        let mut pieces: Vec<_> = black.iter().map(|c| (hex(c), Player::Black)).collect();
        pieces.extend(white.iter().map(|c| (hex(c), Player::White)));
        Board::from_pieces(&pieces)
    }

    #[test]
    fn test_single_moves() {
        let b = board(&["E5"], &["E6"]);
        assert!(b.is_valid_move(&mv("E5 W"), Player::Black));
        // Occupied
        assert!(!b.is_valid_move(&mv("E5 E"), Player::Black));
        // Not the mover's marble
        assert!(!b.is_valid_move(&mv("E5 W"), Player::White));

        let edge = board(&["A1"], &[]);
        assert!(!edge.is_valid_move(&mv("A1 W"), Player::Black));
    }

    #[test]
    fn test_inline_push_rules() {
        // 2 vs 1 into empty space
        let b = board(&["E3", "E4"], &["E5"]);
        assert!(b.is_valid_move(&mv("E3-E4 E"), Player::Black));
        assert!(mv("E3-E4 E").is_sumito(&b));

        // 2 vs 2 is blocked
        let b = board(&["E3", "E4"], &["E5", "E6"]);
        assert!(!b.is_valid_move(&mv("E3-E4 E"), Player::Black));

        // 3 vs 2 is fine, 3 vs 3 is not
        let b = board(&["E2", "E3", "E4"], &["E5", "E6"]);
        assert!(b.is_valid_move(&mv("E2-E4 E"), Player::Black));
        let b = board(&["E2", "E3", "E4"], &["E5", "E6", "E7"]);
        assert!(!b.is_valid_move(&mv("E2-E4 E"), Player::Black));

        // Own marble behind the pushed line blocks the push
        let b = board(&["E3", "E4", "E6"], &["E5"]);
        assert!(!b.is_valid_move(&mv("E3-E4 E"), Player::Black));

        // Walking own line off the board is illegal
        let b = board(&["E8", "E9"], &[]);
        assert!(!b.is_valid_move(&mv("E8-E9 E"), Player::Black));
    }

    #[test]
    fn test_sidestep_needs_empty_destinations() {
        let b = board(&["C3", "C4", "C5"], &["D5"]);
        assert!(!b.is_valid_move(&mv("C3-C5 NE"), Player::Black));
        assert!(b.is_valid_move(&mv("C3-C5 SW"), Player::Black));

        // Bottom rim: stepping down leaves the board, stepping up does not
        let rim = board(&["A1", "A2"], &[]);
        assert!(!rim.is_valid_move(&mv("A1-A2 SW"), Player::Black));
        assert!(!rim.is_valid_move(&mv("A1-A2 SE"), Player::Black));
        assert!(rim.is_valid_move(&mv("A1-A2 NE"), Player::Black));
        assert!(rim.is_valid_move(&mv("A1-A2 NW"), Player::Black));

        // One destination on the board is not enough
        let corner = board(&["A1", "B2"], &[]);
        assert!(!corner.is_valid_move(&mv("A1-B2 W"), Player::Black));
        assert!(corner.is_valid_move(&mv("A1-B2 E"), Player::Black));
    }

    #[test]
    fn test_push_off_scores() {
        let mut b = board(&["E7", "E8"], &["E9"]);
        assert!(b.is_valid_move(&mv("E7-E8 E"), Player::Black));
        b.apply_move(&mv("E7-E8 E"));
        assert_eq!(b.get(hex("E9")), Some(Player::Black));
        assert_eq!(b.get(hex("E8")), Some(Player::Black));
        assert_eq!(b.get(hex("E7")), None);
        assert_eq!(b.marble_count(Player::White), 0);
        assert_eq!(b.score(Player::Black), 1);
        assert_eq!(b.score(Player::White), 0);
    }

    #[test]
    fn test_sumito_shifts_line() {
        let mut b = board(&["E2", "E3", "E4"], &["E5", "E6"]);
        b.apply_move(&mv("E2-E4 E"));
        let black: Vec<_> = ["E3", "E4", "E5"].iter().map(|c| hex(c)).collect();
        let white: Vec<_> = ["E6", "E7"].iter().map(|c| hex(c)).collect();
        for cell in black {
            assert_eq!(b.get(cell), Some(Player::Black));
        }
        for cell in white {
            assert_eq!(b.get(cell), Some(Player::White));
        }
        assert_eq!(b.get(hex("E2")), None);
    }

    #[test]
    fn test_sidestep_apply() {
        let mut b = board(&["C3", "C4"], &[]);
        let m = Move::new(Selection::new(hex("C3"), hex("C4")).unwrap(), Direction::NE);
        assert!(m.is_sidestep());
        b.apply_move(&m);
        assert_eq!(b.get(hex("D4")), Some(Player::Black));
        assert_eq!(b.get(hex("D5")), Some(Player::Black));
        assert_eq!(b.marble_count(Player::Black), 2);
    }

    #[test]
    fn test_quiet_detection() {
        assert!(board(&["E5"], &["E7"]).is_quiet());
        assert!(!board(&["E5"], &["E6"]).is_quiet());
        assert!(!board(&["E5"], &["D5"]).is_quiet());
    }

    #[test]
    fn test_player_names() {
        for player in Player::ALL {
            assert_eq!(player.to_string().parse::<Player>().unwrap(), player);
        }
        assert_eq!("W".parse::<Player>().unwrap(), Player::White);
        assert!("red".parse::<Player>().is_err());
    }

    #[test]
    fn test_winner() {
        let b = Board::from_position(&[(hex("E5"), Player::Black)], [1, 6]);
        assert_eq!(b.score(Player::Black), WIN_SCORE);
        assert_eq!(b.winner(), Some(Player::Black));
        assert!(b.is_game_over());
    }
}
