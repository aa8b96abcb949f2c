//! Zobrist hashing for position fingerprints
//!
//! Each (cell, owner) pair gets a random 64-bit mask; a position's hash is
//! the XOR of the masks of its occupied cells, so a move can be folded into
//! an existing hash by XOR-ing out vacated cells and XOR-ing in new ones.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::OnceLock;

use crate::board::{Hex, CELL_COUNT};
use crate::game::{Board, Player};
use crate::moves::Move;

/// Random masks for every (cell, owner) pair plus side-to-move keys
#[derive(Clone, Debug)]
pub struct ZobristTable {
    pieces: [[u64; 2]; CELL_COUNT],
    side_to_move: [u64; 2],
}

static GLOBAL: OnceLock<ZobristTable> = OnceLock::new();

impl ZobristTable {
    /// Table drawn from a seeded generator
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(&mut ChaCha8Rng::seed_from_u64(seed))
    }

    fn from_rng(rng: &mut impl Rng) -> Self {
        let mut pieces = [[0u64; 2]; CELL_COUNT];
        for masks in pieces.iter_mut() {
            masks[0] = rng.gen();
            masks[1] = rng.gen();
        }
        Self {
            pieces,
            side_to_move: [rng.gen(), rng.gen()],
        }
    }

    /// Process-wide table, drawn from entropy on first use
    pub fn global() -> &'static ZobristTable {
        GLOBAL.get_or_init(|| Self::from_rng(&mut ChaCha8Rng::from_entropy()))
    }

    #[inline]
    fn mask(&self, cell: Hex, owner: Player) -> u64 {
        match cell.index() {
            Some(i) => self.pieces[i][owner.index()],
            None => 0,
        }
    }

    /// Key distinguishing the same position with a different side to move
    #[inline]
    pub fn side_key(&self, side: Player) -> u64 {
        self.side_to_move[side.index()]
    }

    /// Hash of a position computed from scratch
    pub fn create_board_hash(&self, board: &Board) -> u64 {
        board
            .pieces()
            .fold(0, |hash, (cell, owner)| hash ^ self.mask(cell, owner))
    }

    /// Hash after playing `mv` on `before`, without rescanning the board.
    /// `mv` must be valid on `before`.
    pub fn update_board_hash(&self, mut hash: u64, before: &Board, mv: &Move) -> u64 {
        let Some(attacker) = mv.selection.owner(before) else {
            return hash;
        };

        // Middle marbles of a pushed line keep their colour; only the first
        // is replaced by the attacker and the last lands one cell further.
        if let Some(line) = before.pushed_line(mv) {
            hash ^= self.mask(line.first, line.owner);
            if line.landing().is_valid() {
                hash ^= self.mask(line.landing(), line.owner);
            }
        }

        for cell in mv.cells() {
            hash ^= self.mask(cell, attacker);
        }
        for dest in mv.destinations() {
            hash ^= self.mask(dest, attacker);
        }

        hash
    }
}

/// Hash of `board` under the process-wide table
pub fn create_board_hash(board: &Board) -> u64 {
    ZobristTable::global().create_board_hash(board)
}

/// Incremental hash update under the process-wide table
pub fn update_board_hash(hash: u64, before: &Board, mv: &Move) -> u64 {
    ZobristTable::global().update_board_hash(hash, before, mv)
}
