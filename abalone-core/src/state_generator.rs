//! Legal move enumeration and successor boards

use rustc_hash::FxHashSet;

use crate::board::{Direction, Hex};
use crate::game::{Board, Player};
use crate::moves::{Move, Selection, MAX_SELECTION_SIZE};

pub struct StateGenerator;

impl StateGenerator {
    /// Every legal move for `side`, in a stable order: selections by anchor
    /// cell, then by direction
    pub fn enumerate_board(board: &Board, side: Player) -> Vec<Move> {
        let mut seen = FxHashSet::default();
        let mut selections = Vec::new();
        for (cell, _) in board.pieces().filter(|&(_, owner)| owner == side) {
            for selection in Self::selections_from(board, cell, side) {
                if seen.insert(selection) {
                    selections.push(selection);
                }
            }
        }

        let mut moves = Vec::with_capacity(selections.len() * 2);
        for selection in selections {
            for direction in Direction::ALL {
                let mv = Move::new(selection, direction);
                if board.is_valid_move(&mv, side) {
                    moves.push(mv);
                }
            }
        }
        moves
    }

    /// One successor board per move, same order
    pub fn generate(board: &Board, moves: &[Move]) -> Vec<Board> {
        moves.iter().map(|mv| board.with_move(mv)).collect()
    }

    /// The single cell plus lines of two and three growing from it
    fn selections_from(
        board: &Board,
        origin: Hex,
        side: Player,
    ) -> impl Iterator<Item = Selection> + '_ {
        let lines = Direction::ALL.into_iter().flat_map(move |direction| {
            (1..MAX_SELECTION_SIZE as i8)
                .take_while(move |&steps| board.cell_owned_by(origin.offset(direction, steps), side))
                .filter_map(move |steps| Selection::new(origin, origin.offset(direction, steps)))
        });
        std::iter::once(Selection::single(origin)).chain(lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BoardLayout;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::collections::HashSet;

    /// Every (cell pair, direction) the board says is legal
    fn brute_force_moves(board: &Board, side: Player) -> HashSet<Move> {
        let cells: Vec<Hex> = Hex::all().collect();
        let mut moves = HashSet::new();
        for &a in &cells {
            for &b in &cells {
                let Some(selection) = Selection::new(a, b) else {
                    continue;
                };
                for direction in Direction::ALL {
                    let mv = Move::new(selection, direction);
                    if board.is_valid_move(&mv, side) {
                        moves.insert(mv);
                    }
                }
            }
        }
        moves
    }

    #[test]
    fn test_opening_move_count_is_symmetric() {
        // Every built-in layout mirrors across the middle row with colours swapped
        for layout in BoardLayout::ALL {
            let board = layout.setup_board();
            let black = StateGenerator::enumerate_board(&board, Player::Black).len();
            let white = StateGenerator::enumerate_board(&board, Player::White).len();
            assert!(black > 0, "{:?}", layout);
            assert_eq!(black, white, "{:?}", layout);
        }
    }

    #[test]
    fn test_no_duplicates_and_all_legal() {
        for layout in BoardLayout::ALL {
            let board = layout.setup_board();
            for side in Player::ALL {
                let moves = StateGenerator::enumerate_board(&board, side);
                let unique: HashSet<_> = moves.iter().copied().collect();
                assert_eq!(unique.len(), moves.len());
                assert!(moves.iter().all(|mv| board.is_valid_move(mv, side)));
                assert!(moves.iter().all(|mv| mv.selection.is_owned_by(&board, side)));
            }
        }
    }

    #[test]
    fn test_matches_brute_force_on_random_positions() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for layout in BoardLayout::ALL {
            let mut board = layout.setup_board();
            let mut side = Player::Black;
            for ply in 0..40 {
                let moves = StateGenerator::enumerate_board(&board, side);
                if ply % 8 == 0 {
                    let generated: HashSet<_> = moves.iter().copied().collect();
                    assert_eq!(generated, brute_force_moves(&board, side));
                }
                if moves.is_empty() || board.is_game_over() {
                    break;
                }
                board.apply_move(&moves[rng.gen_range(0..moves.len())]);
                side = side.opponent();
            }
        }
    }

    #[test]
    fn test_generate_preserves_order() {
        let board = BoardLayout::BelgianDaisy.setup_board();
        let moves = StateGenerator::enumerate_board(&board, Player::White);
        let boards = StateGenerator::generate(&board, &moves);
        assert_eq!(boards.len(), moves.len());
        for (mv, next) in moves.iter().zip(&boards) {
            assert_eq!(*next, board.with_move(mv));
        }
        // Source board untouched
        assert_eq!(board, BoardLayout::BelgianDaisy.setup_board());
    }

    #[test]
    fn test_order_is_stable() {
        let board = BoardLayout::GermanDaisy.setup_board();
        assert_eq!(
            StateGenerator::enumerate_board(&board, Player::Black),
            StateGenerator::enumerate_board(&board, Player::Black)
        );
    }
}
