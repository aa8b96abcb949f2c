//! Pondering: searching replies to predicted opponent moves during the
//! opponent's turn

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use tracing::debug;

use crate::eval::{EvaluatorKind, GameProgress, Score};
use crate::game::{Board, Player};
use crate::moves::Move;
use crate::search::Search;
use crate::state_generator::StateGenerator;
use crate::zobrist::create_board_hash;

/// Best reply to one predicted opponent move
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Refutation {
    pub predicted: Move,
    pub reply: Move,
    pub score: Option<Score>,
}

/// Refutations keyed by the fingerprint of the board after the predicted
/// move. Shared between the pondering thread and the agent's owner.
#[derive(Debug, Default)]
pub struct RefutationTable {
    entries: Mutex<FxHashMap<u64, Refutation>>,
}

impl RefutationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, board: &Board, refutation: Refutation) {
        self.entries.lock().insert(create_board_hash(board), refutation);
    }

    /// Refutation computed for exactly this position, if any
    pub fn get(&self, board: &Board) -> Option<Refutation> {
        self.entries.lock().get(&create_board_hash(board)).copied()
    }

    pub fn take(&self, board: &Board) -> Option<Refutation> {
        self.entries.lock().remove(&create_board_hash(board))
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

/// The opponent's most promising moves by the evaluator's opinion, best
/// first. `breadth` of `None` keeps them all.
pub fn predict_opponent_moves(
    board: &Board,
    opponent: Player,
    evaluator: EvaluatorKind,
    progress: GameProgress,
    breadth: Option<usize>,
) -> Vec<Move> {
    let mut scored: Vec<(Move, Score)> = StateGenerator::enumerate_board(board, opponent)
        .into_iter()
        .map(|mv| {
            let after = board.with_move(&mv);
            (mv, evaluator.evaluate(&after, opponent, progress))
        })
        .collect();
    scored.sort_by_key(|&(_, score)| Reverse(score));

    let keep = breadth.unwrap_or(scored.len());
    scored.into_iter().take(keep).map(|(mv, _)| mv).collect()
}

/// Ponder on `board`, where the opponent of `agent_side` is to move.
///
/// Clears `table`, then for each predicted opponent move searches the
/// resulting position for `agent_side` and records the reply when that
/// search ran to completion. Stops early once the search control is
/// stopped. `on_complete` runs when the cycle ends, stopped or not.
#[allow(clippy::too_many_arguments)]
pub fn ponder(
    search: &mut Search,
    table: &RefutationTable,
    board: &Board,
    agent_side: Player,
    progress: GameProgress,
    breadth: Option<usize>,
    mut on_find: impl FnMut(Move, Move),
    on_complete: impl FnOnce(),
) -> Vec<Refutation> {
    table.clear();
    let opponent = agent_side.opponent();
    let predictions = predict_opponent_moves(
        board,
        opponent,
        search.config().evaluator,
        progress,
        breadth,
    );
    debug!(side = %agent_side, predictions = predictions.len(), "pondering");

    let control = search.control();
    let mut found = Vec::new();
    for predicted in predictions {
        let after = board.with_move(&predicted);
        let outcome = search.run(&after, agent_side, progress, |_| {}, || {});

        if outcome.is_exhausted() {
            if let Some(reply) = outcome.best_move {
                let refutation = Refutation {
                    predicted,
                    reply,
                    score: outcome.score,
                };
                debug!(predicted = %predicted, reply = %reply, "refutation stored");
                table.insert(&after, refutation);
                found.push(refutation);
                on_find(predicted, reply);
            }
        }

        if control.is_stopped() {
            break;
        }
    }

    on_complete();
    found
}
