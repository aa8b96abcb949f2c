//! Iterative-deepening negamax search
//!
//! Each iteration runs a fail-soft principal-variation (negascout) search
//! backed by the transposition table. The search polls a shared
//! [`SearchControl`] at every node and at every move of every move loop,
//! so a stop request unwinds within one node's worth of work and a pause
//! blocks without losing the recursion stack.

use parking_lot::Mutex;
use std::cmp::Reverse;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::eval::{EvaluatorKind, GameProgress, Score, INFINITY};
use crate::game::{Board, Player};
use crate::moves::{Move, MAX_SELECTION_SIZE};
use crate::state_generator::StateGenerator;
use crate::transposition::{NodeType, TableConfig, TranspositionTable};
use crate::zobrist::ZobristTable;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Sleep between flag checks while paused
const PAUSE_POLL: Duration = Duration::from_millis(16);

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SearchConfig {
    /// Deepest iteration, in plies
    pub depth_limit: u8,
    pub evaluator: EvaluatorKind,
    /// Search quiet positions one ply deep only
    pub quiescence_gate: bool,
    pub table: TableConfig,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            depth_limit: 3,
            evaluator: EvaluatorKind::default(),
            quiescence_gate: false,
            table: TableConfig::default(),
        }
    }
}

impl SearchConfig {
    pub fn with_depth(mut self, depth_limit: u8) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn with_evaluator(mut self, evaluator: EvaluatorKind) -> Self {
        self.evaluator = evaluator;
        self
    }

    pub fn with_quiescence_gate(mut self, enabled: bool) -> Self {
        self.quiescence_gate = enabled;
        self
    }

    pub fn with_table(mut self, table: TableConfig) -> Self {
        self.table = table;
        self
    }
}

// ============================================================================
// CONTROL
// ============================================================================

/// Lifecycle of one search run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Searching,
    Exhausted,
    Interrupted,
}

impl SearchState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => SearchState::Searching,
            2 => SearchState::Exhausted,
            3 => SearchState::Interrupted,
            _ => SearchState::Idle,
        }
    }
}

/// The search was asked to stop
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Interrupted;

#[derive(Debug, Default)]
struct Published {
    generation: u64,
    best_move: Option<Move>,
}

/// Flags shared between a search thread and whoever controls it
#[derive(Debug, Default)]
pub struct SearchControl {
    stopped: AtomicBool,
    paused: AtomicBool,
    state: AtomicU8,
    published: Mutex<Published>,
}

impl SearchControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request the running search to unwind. Also lifts a pause.
    pub fn stop(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// Stop only if no newer run has started since `generation`
    pub fn stop_generation(&self, generation: u64) -> bool {
        let published = self.published.lock();
        if published.generation != generation {
            return false;
        }
        self.stop();
        true
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Flip the pause flag, returning the new value
    pub fn toggle_paused(&self) -> bool {
        !self.paused.fetch_xor(true, Ordering::SeqCst)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> SearchState {
        SearchState::from_u8(self.state.load(Ordering::SeqCst))
    }

    fn set_state(&self, state: SearchState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    pub fn generation(&self) -> u64 {
        self.published.lock().generation
    }

    /// Best root move published by the current run
    pub fn best_move(&self) -> Option<Move> {
        self.published.lock().best_move
    }

    fn publish(&self, mv: Move) {
        self.published.lock().best_move = Some(mv);
    }

    /// Prepare for a new run: clear flags and the published move, and start
    /// a new generation. Returns the new generation.
    pub fn reset(&self) -> u64 {
        let mut published = self.published.lock();
        published.generation += 1;
        published.best_move = None;
        self.stopped.store(false, Ordering::SeqCst);
        self.paused.store(false, Ordering::SeqCst);
        self.set_state(SearchState::Idle);
        published.generation
    }

    /// Cooperative checkpoint: blocks while paused, fails once stopped
    pub fn checkpoint(&self) -> Result<(), Interrupted> {
        loop {
            if self.is_stopped() {
                return Err(Interrupted);
            }
            if !self.is_paused() {
                return Ok(());
            }
            std::thread::sleep(PAUSE_POLL);
        }
    }
}

// ============================================================================
// OUTCOME
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchStatus {
    /// Every configured iteration finished
    Exhausted,
    /// Stopped before the last iteration finished
    Interrupted,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub nodes: u64,
    pub leaves: u64,
    pub cutoffs: u64,
    pub tt_hits: u64,
    pub re_searches: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SearchOutcome {
    /// Last move published through `on_find`
    pub best_move: Option<Move>,
    /// Value of `best_move` at the depth it was found
    pub score: Option<Score>,
    /// Deepest fully completed iteration
    pub depth: u8,
    pub status: SearchStatus,
    pub stats: SearchStats,
}

impl SearchOutcome {
    pub fn is_exhausted(&self) -> bool {
        self.status == SearchStatus::Exhausted
    }
}

// ============================================================================
// SEARCH
// ============================================================================

/// A reusable search engine; one per agent
pub struct Search {
    config: SearchConfig,
    control: Arc<SearchControl>,
    table: TranspositionTable,
}

impl Search {
    pub fn new(config: SearchConfig) -> Self {
        Self::with_control(config, Arc::new(SearchControl::new()))
    }

    pub fn with_control(config: SearchConfig, control: Arc<SearchControl>) -> Self {
        Self {
            config,
            control,
            table: TranspositionTable::new(config.table),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn control(&self) -> Arc<SearchControl> {
        Arc::clone(&self.control)
    }

    pub fn table(&self) -> &TranspositionTable {
        &self.table
    }

    /// Takes effect on the next run
    pub fn set_evaluator(&mut self, evaluator: EvaluatorKind) {
        self.config.evaluator = evaluator;
    }

    /// Best move for `side` without callbacks
    pub fn best_move(&mut self, board: &Board, side: Player, progress: GameProgress) -> Option<Move> {
        self.run(board, side, progress, |_| {}, || {}).best_move
    }

    /// Search `board` for `side`. `on_find` receives every new best root
    /// move; `on_complete` runs once if the deepest iteration finishes.
    pub fn run(
        &mut self,
        board: &Board,
        side: Player,
        progress: GameProgress,
        mut on_find: impl FnMut(Move),
        on_complete: impl FnOnce(),
    ) -> SearchOutcome {
        self.control.set_state(SearchState::Searching);
        self.table.clear();

        let depth_limit = if self.config.quiescence_gate && board.is_quiet() {
            1
        } else {
            self.config.depth_limit.max(1)
        };

        let mut searcher = Searcher {
            table: &mut self.table,
            control: &self.control,
            zobrist: ZobristTable::global(),
            root_side: side,
            evaluator: self.config.evaluator,
            progress,
            stats: SearchStats::default(),
        };

        let mut moves = if board.is_game_over() {
            Vec::new()
        } else {
            StateGenerator::enumerate_board(board, side)
        };
        order_by_heuristic(board, &mut moves);

        let mut outcome = SearchOutcome {
            best_move: None,
            score: None,
            depth: 0,
            status: SearchStatus::Exhausted,
            stats: SearchStats::default(),
        };

        if !moves.is_empty() {
            for depth in 1..=depth_limit {
                let result = searcher.search_root(board, &mut moves, depth, &mut |mv, score| {
                    outcome.best_move = Some(mv);
                    outcome.score = Some(score);
                    on_find(mv);
                });
                match result {
                    Ok(Some(best)) => {
                        outcome.depth = depth;
                        // Principal variation first on the next iteration
                        if let Some(i) = moves.iter().position(|&mv| mv == best) {
                            let pv = moves.remove(i);
                            moves.insert(0, pv);
                        }
                        debug!(
                            depth,
                            best = %best,
                            score = outcome.score.unwrap_or_default(),
                            nodes = searcher.stats.nodes,
                            "iteration complete"
                        );
                    }
                    Ok(None) => break,
                    Err(Interrupted) => {
                        outcome.status = SearchStatus::Interrupted;
                        break;
                    }
                }
            }
        }

        outcome.stats = searcher.stats;
        debug!(
            nodes = outcome.stats.nodes,
            leaves = outcome.stats.leaves,
            cutoffs = outcome.stats.cutoffs,
            tt_hits = outcome.stats.tt_hits,
            re_searches = outcome.stats.re_searches,
            table = self.table.len(),
            "search {:?}",
            outcome.status
        );

        match outcome.status {
            SearchStatus::Exhausted => {
                self.control.set_state(SearchState::Exhausted);
                on_complete();
            }
            SearchStatus::Interrupted => self.control.set_state(SearchState::Interrupted),
        }
        outcome
    }
}

/// Transposition key: position plus side to move
#[inline]
pub(crate) fn table_key(zobrist: &ZobristTable, hash: u64, to_move: Player) -> u64 {
    hash ^ zobrist.side_key(to_move)
}

/// Pushes first, then larger selections. Stable, so ties keep generator order.
fn order_by_heuristic(board: &Board, moves: &mut [Move]) {
    moves.sort_by_key(|mv| {
        Reverse(if mv.is_sumito(board) {
            MAX_SELECTION_SIZE + 1
        } else {
            mv.selection.size()
        })
    });
}

// ============================================================================
// NEGAMAX WITH NEGASCOUT
// ============================================================================

/// State of one run
struct Searcher<'a> {
    table: &'a mut TranspositionTable,
    control: &'a SearchControl,
    zobrist: &'static ZobristTable,
    root_side: Player,
    evaluator: EvaluatorKind,
    progress: GameProgress,
    stats: SearchStats,
}

impl Searcher<'_> {
    /// One iteration at the root. Returns the best move of the iteration.
    fn search_root(
        &mut self,
        board: &Board,
        moves: &mut [Move],
        depth: u8,
        on_find: &mut dyn FnMut(Move, Score),
    ) -> Result<Option<Move>, Interrupted> {
        let hash = self.zobrist.create_board_hash(board);
        let opponent = self.root_side.opponent();
        let mut alpha = -INFINITY;
        let beta = INFINITY;
        let mut best = None;

        for (i, &mv) in moves.iter().enumerate() {
            self.control.checkpoint()?;
            let child = board.with_move(&mv);
            let child_hash = self.zobrist.update_board_hash(hash, board, &mv);

            let score = if i == 0 {
                -self.negamax(&child, child_hash, depth - 1, -beta, -alpha, opponent)?
            } else {
                self.scout(&child, child_hash, depth - 1, alpha, beta, opponent)?
            };

            if score > alpha {
                alpha = score;
                best = Some(mv);
                self.control.publish(mv);
                debug!(depth, mv = %mv, score, "new best move");
                on_find(mv, score);
            }
        }

        Ok(best)
    }

    /// Null-window probe of a later sibling, re-searched with the full
    /// window when it lands strictly inside (alpha, beta). Returns the
    /// score from the parent's point of view.
    fn scout(
        &mut self,
        child: &Board,
        child_hash: u64,
        depth: u8,
        alpha: Score,
        beta: Score,
        to_move: Player,
    ) -> Result<Score, Interrupted> {
        let score = -self.negamax(child, child_hash, depth, -alpha - 1, -alpha, to_move)?;
        if score > alpha && score < beta {
            self.stats.re_searches += 1;
            return Ok(-self.negamax(child, child_hash, depth, -beta, -alpha, to_move)?);
        }
        Ok(score)
    }

    fn leaf(&mut self, board: &Board, to_move: Player) -> Score {
        self.stats.leaves += 1;
        let perspective = if to_move == self.root_side { 1 } else { -1 };
        self.evaluator.evaluate(board, self.root_side, self.progress) * perspective
    }

    fn negamax(
        &mut self,
        board: &Board,
        hash: u64,
        depth: u8,
        mut alpha: Score,
        mut beta: Score,
        to_move: Player,
    ) -> Result<Score, Interrupted> {
        self.control.checkpoint()?;
        self.stats.nodes += 1;

        if depth == 0 || board.is_game_over() {
            return Ok(self.leaf(board, to_move));
        }

        let key = table_key(self.zobrist, hash, to_move);
        let entry = self.table.probe(key);
        if let Some(entry) = entry.filter(|e| e.depth >= depth) {
            self.stats.tt_hits += 1;
            match entry.node_type {
                NodeType::Exact => return Ok(entry.score),
                NodeType::LowerBound => alpha = alpha.max(entry.score),
                NodeType::UpperBound => beta = beta.min(entry.score),
            }
            if alpha >= beta {
                return Ok(entry.score);
            }
        }
        // Window this node is actually searched with
        let (window_alpha, window_beta) = (alpha, beta);

        let mut moves = StateGenerator::enumerate_board(board, to_move);
        if moves.is_empty() {
            return Ok(self.leaf(board, to_move));
        }
        order_by_heuristic(board, &mut moves);
        if let Some(tt_move) = entry.and_then(|e| e.best_move) {
            if let Some(i) = moves.iter().position(|&mv| mv == tt_move) {
                moves[..=i].rotate_right(1);
            }
        }

        let opponent = to_move.opponent();
        let mut best = -INFINITY;
        let mut best_move = None;

        for (i, mv) in moves.iter().enumerate() {
            self.control.checkpoint()?;
            let child = board.with_move(mv);
            let child_hash = self.zobrist.update_board_hash(hash, board, mv);

            let score = if i == 0 {
                -self.negamax(&child, child_hash, depth - 1, -beta, -alpha, opponent)?
            } else {
                self.scout(&child, child_hash, depth - 1, alpha, beta, opponent)?
            };

            if score > best {
                best = score;
                best_move = Some(*mv);
            }
            alpha = alpha.max(best);
            if alpha >= beta {
                self.stats.cutoffs += 1;
                break;
            }
        }

        let node_type = if best <= window_alpha {
            NodeType::UpperBound
        } else if best >= window_beta {
            NodeType::LowerBound
        } else {
            NodeType::Exact
        };
        self.table.store(key, best, depth, best_move, node_type);

        Ok(best)
    }
}

// ============================================================================
// TESTS
// ============================================================================
