//! Agent: owns one search engine and at most one worker thread
//!
//! The worker takes the [`Search`] with it and hands it back when joined, so
//! two generations of search state can never overlap. Live searches and
//! pondering share the same engine and control flags; starting a live search
//! cancels any pondering first.

use crossbeam_channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::AgentError;
use crate::eval::{EvaluatorKind, GameProgress};
use crate::game::{Board, Player};
use crate::moves::Move;
use crate::ponder::{ponder, Refutation, RefutationTable};
use crate::search::{Search, SearchConfig, SearchControl, SearchOutcome};

/// Progress reported over an agent's event channel
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AgentEvent {
    /// The live search has a new best root move
    BestMove(Move),
    /// Pondering found a reply to a predicted opponent move
    Refutation { predicted: Move, reply: Move },
    /// The live search returned, exhausted or interrupted
    Finished(SearchOutcome),
    /// The ponder cycle returned
    PonderFinished { refutations: usize },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerMode {
    Search,
    Ponder,
}

struct Worker {
    mode: WorkerMode,
    generation: u64,
    handle: JoinHandle<(Search, Option<SearchOutcome>)>,
}

pub struct Agent {
    name: String,
    config: SearchConfig,
    ponder_breadth: Option<usize>,
    control: Arc<SearchControl>,
    search: Option<Search>,
    worker: Option<Worker>,
    refutations: Arc<RefutationTable>,
    last_outcome: Option<SearchOutcome>,
    /// Dropping a sender retires its timer thread
    timers: Vec<Sender<()>>,
}

impl Agent {
    pub fn new(name: impl Into<String>, config: SearchConfig, ponder_breadth: Option<usize>) -> Self {
        let control = Arc::new(SearchControl::new());
        Self {
            name: name.into(),
            config,
            ponder_breadth,
            search: Some(Search::with_control(config, Arc::clone(&control))),
            control,
            worker: None,
            refutations: Arc::new(RefutationTable::new()),
            last_outcome: None,
            timers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn control(&self) -> Arc<SearchControl> {
        Arc::clone(&self.control)
    }

    pub fn evaluator(&self) -> EvaluatorKind {
        self.config.evaluator
    }

    /// Used from the next search or ponder cycle on
    pub fn set_evaluator(&mut self, evaluator: EvaluatorKind) {
        self.config.evaluator = evaluator;
    }

    pub fn set_ponder_breadth(&mut self, breadth: Option<usize>) {
        self.ponder_breadth = breadth;
    }

    /// Mode of the worker thread, if one is still running
    pub fn worker_mode(&self) -> Option<WorkerMode> {
        self.worker
            .as_ref()
            .filter(|w| !w.handle.is_finished())
            .map(|w| w.mode)
    }

    pub fn is_searching(&self) -> bool {
        self.worker_mode() == Some(WorkerMode::Search)
    }

    pub fn is_pondering(&self) -> bool {
        self.worker_mode() == Some(WorkerMode::Ponder)
    }

    /// Outcome of the most recently joined live search
    pub fn last_outcome(&self) -> Option<SearchOutcome> {
        self.last_outcome
    }

    // ========================================================================
    // LIVE SEARCH
    // ========================================================================

    /// Search `board` for `side` on a worker thread. Cancels pondering;
    /// fails with [`AgentError::AlreadySearching`] while a live search runs.
    /// Returns the search generation.
    pub fn start(
        &mut self,
        board: &Board,
        side: Player,
        progress: GameProgress,
        on_find: impl FnMut(Move) + Send + 'static,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Result<u64, AgentError> {
        self.spawn_search(board, side, progress, on_find, on_complete, None)
    }

    /// Like [`Agent::start`], reporting through a channel instead
    pub fn start_with_events(
        &mut self,
        board: &Board,
        side: Player,
        progress: GameProgress,
    ) -> Result<Receiver<AgentEvent>, AgentError> {
        let (tx, rx) = unbounded();
        let found = tx.clone();
        self.spawn_search(
            board,
            side,
            progress,
            move |mv| {
                let _ = found.send(AgentEvent::BestMove(mv));
            },
            || {},
            Some(tx),
        )?;
        Ok(rx)
    }

    fn spawn_search(
        &mut self,
        board: &Board,
        side: Player,
        progress: GameProgress,
        on_find: impl FnMut(Move) + Send + 'static,
        on_complete: impl FnOnce() + Send + 'static,
        events: Option<Sender<AgentEvent>>,
    ) -> Result<u64, AgentError> {
        match self.worker_mode() {
            Some(WorkerMode::Search) => return Err(AgentError::AlreadySearching),
            Some(WorkerMode::Ponder) => {
                debug!(agent = %self.name, "cancelling ponder for live search");
                self.stop()?;
            }
            None => {}
        }
        let mut search = self.reclaim()?;
        search.set_evaluator(self.config.evaluator);
        let generation = self.control.reset();

        let board = board.clone();
        let worker = move || {
            let outcome = search.run(&board, side, progress, on_find, on_complete);
            if let Some(tx) = events {
                let _ = tx.send(AgentEvent::Finished(outcome));
            }
            (search, Some(outcome))
        };
        self.spawn(WorkerMode::Search, generation, worker)?;
        info!(agent = %self.name, %side, generation, "search started");
        Ok(generation)
    }

    // ========================================================================
    // PONDERING
    // ========================================================================

    /// Ponder on `board` (opponent to move) for `agent_side`. Replaces any
    /// running ponder cycle; fails while a live search runs.
    pub fn ponder(
        &mut self,
        board: &Board,
        agent_side: Player,
        progress: GameProgress,
        on_find: impl FnMut(Move, Move) + Send + 'static,
        on_complete: impl FnOnce() + Send + 'static,
    ) -> Result<u64, AgentError> {
        self.spawn_ponder(board, agent_side, progress, on_find, on_complete, None)
    }

    pub fn ponder_with_events(
        &mut self,
        board: &Board,
        agent_side: Player,
        progress: GameProgress,
    ) -> Result<Receiver<AgentEvent>, AgentError> {
        let (tx, rx) = unbounded();
        let found = tx.clone();
        self.spawn_ponder(
            board,
            agent_side,
            progress,
            move |predicted, reply| {
                let _ = found.send(AgentEvent::Refutation { predicted, reply });
            },
            || {},
            Some(tx),
        )?;
        Ok(rx)
    }

    fn spawn_ponder(
        &mut self,
        board: &Board,
        agent_side: Player,
        progress: GameProgress,
        on_find: impl FnMut(Move, Move) + Send + 'static,
        on_complete: impl FnOnce() + Send + 'static,
        events: Option<Sender<AgentEvent>>,
    ) -> Result<u64, AgentError> {
        match self.worker_mode() {
            Some(WorkerMode::Search) => return Err(AgentError::AlreadySearching),
            Some(WorkerMode::Ponder) => {
                self.stop()?;
            }
            None => {}
        }
        let mut search = self.reclaim()?;
        search.set_evaluator(self.config.evaluator);
        let generation = self.control.reset();

        let board = board.clone();
        let table = Arc::clone(&self.refutations);
        let breadth = self.ponder_breadth;
        let worker = move || {
            let found = ponder(
                &mut search,
                &table,
                &board,
                agent_side,
                progress,
                breadth,
                on_find,
                on_complete,
            );
            if let Some(tx) = events {
                let _ = tx.send(AgentEvent::PonderFinished {
                    refutations: found.len(),
                });
            }
            (search, None)
        };
        self.spawn(WorkerMode::Ponder, generation, worker)?;
        info!(agent = %self.name, side = %agent_side, generation, "pondering started");
        Ok(generation)
    }

    /// Refutation prepared for `board`, the position the opponent just
    /// produced
    pub fn refutation(&self, board: &Board) -> Option<Refutation> {
        self.refutations.get(board)
    }

    pub fn take_refutation(&self, board: &Board) -> Option<Refutation> {
        self.refutations.take(board)
    }

    pub fn clear_refutations(&self) {
        self.refutations.clear();
    }

    pub fn refutation_count(&self) -> usize {
        self.refutations.len()
    }

    // ========================================================================
    // CONTROL
    // ========================================================================

    /// Cancel the worker, if any, and block until it has unwound. Returns
    /// the outcome of an interrupted live search.
    pub fn stop(&mut self) -> Result<Option<SearchOutcome>, AgentError> {
        if self.worker.is_some() {
            self.control.stop();
        }
        self.join()
    }

    /// Block until the worker finishes on its own
    pub fn wait(&mut self) -> Result<Option<SearchOutcome>, AgentError> {
        self.join()
    }

    /// Stop the current generation after `duration`. A later search is never
    /// affected by this timer, and the timer thread exits as soon as the
    /// worker is joined.
    pub fn stop_after(&mut self, duration: Duration) -> Result<JoinHandle<()>, AgentError> {
        let control = Arc::clone(&self.control);
        let generation = control.generation();
        let name = self.name.clone();
        let (cancel, cancelled) = bounded::<()>(0);
        let handle = thread::Builder::new()
            .name(format!("{}-timer", self.name))
            .spawn(move || match cancelled.recv_timeout(duration) {
                Err(RecvTimeoutError::Timeout) => {
                    if control.stop_generation(generation) {
                        debug!(agent = %name, generation, "time limit reached");
                    }
                }
                _ => debug!(agent = %name, generation, "timer retired"),
            })?;
        self.timers.push(cancel);
        Ok(handle)
    }

    /// Flip the pause flag; returns whether the agent is now paused
    pub fn toggle_paused(&self) -> bool {
        self.control.toggle_paused()
    }

    // ========================================================================
    // WORKER
    // ========================================================================

    fn spawn<F>(&mut self, mode: WorkerMode, generation: u64, worker: F) -> Result<(), AgentError>
    where
        F: FnOnce() -> (Search, Option<SearchOutcome>) + Send + 'static,
    {
        let suffix = match mode {
            WorkerMode::Search => "search",
            WorkerMode::Ponder => "ponder",
        };
        let spawned = thread::Builder::new()
            .name(format!("{}-{}", self.name, suffix))
            .spawn(worker);
        match spawned {
            Ok(handle) => {
                self.worker = Some(Worker {
                    mode,
                    generation,
                    handle,
                });
                Ok(())
            }
            Err(e) => {
                // The engine went down with the closure
                self.search = Some(self.fresh_search());
                Err(AgentError::Spawn(e))
            }
        }
    }

    fn fresh_search(&self) -> Search {
        Search::with_control(self.config, Arc::clone(&self.control))
    }

    /// Engine back from a finished worker (the worker must not be running)
    fn reclaim(&mut self) -> Result<Search, AgentError> {
        self.join()?;
        Ok(self.search.take().unwrap_or_else(|| self.fresh_search()))
    }

    fn join(&mut self) -> Result<Option<SearchOutcome>, AgentError> {
        self.timers.clear();
        let Some(worker) = self.worker.take() else {
            return Ok(None);
        };
        match worker.handle.join() {
            Ok((search, outcome)) => {
                self.search = Some(search);
                if let Some(outcome) = outcome {
                    info!(
                        agent = %self.name,
                        generation = worker.generation,
                        best = ?outcome.best_move.map(|mv| mv.to_string()),
                        depth = outcome.depth,
                        "search {:?}",
                        outcome.status
                    );
                    self.last_outcome = Some(outcome);
                }
                Ok(outcome)
            }
            Err(_) => {
                warn!(agent = %self.name, generation = worker.generation, "worker panicked");
                self.search = Some(self.fresh_search());
                Err(AgentError::WorkerPanicked)
            }
        }
    }
}

impl Drop for Agent {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::BoardLayout;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Instant;

    fn agent(depth: u8) -> Agent {
        Agent::new(
            "test",
            SearchConfig::default()
                .with_depth(depth)
                .with_evaluator(EvaluatorKind::Weighted),
            Some(1),
        )
    }

    #[test]
    fn test_search_runs_to_completion() {
        let mut agent = agent(2);
        let board = BoardLayout::Standard.setup_board();
        let completed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&completed);

        agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, move || {
                flag.store(true, Ordering::SeqCst)
            })
            .unwrap();
        let outcome = agent.wait().unwrap().unwrap();

        assert!(outcome.is_exhausted());
        assert!(outcome.best_move.is_some());
        assert!(completed.load(Ordering::SeqCst));
        assert_eq!(agent.last_outcome(), Some(outcome));
        assert!(!agent.is_searching());
    }

    #[test]
    fn test_second_start_is_rejected() {
        let mut agent = agent(12);
        let board = BoardLayout::Standard.setup_board();
        agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, || {})
            .unwrap();
        assert!(agent.is_searching());
        assert!(matches!(
            agent.start(&board, Player::Black, GameProgress::default(), |_| {}, || {}),
            Err(AgentError::AlreadySearching)
        ));
        let outcome = agent.stop().unwrap().unwrap();
        assert!(!outcome.is_exhausted());
    }

    #[test]
    fn test_stop_returns_promptly() {
        let mut agent = agent(12);
        let board = BoardLayout::GermanDaisy.setup_board();
        agent
            .start(&board, Player::White, GameProgress::default(), |_| {}, || {})
            .unwrap();
        thread::sleep(Duration::from_millis(30));
        let started = Instant::now();
        agent.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!agent.is_searching());
    }

    #[test]
    fn test_timer_stops_current_generation() {
        let mut agent = agent(12);
        let board = BoardLayout::Standard.setup_board();
        let rx = agent
            .start_with_events(&board, Player::Black, GameProgress::default())
            .unwrap();
        agent.stop_after(Duration::from_millis(50)).unwrap();

        let finished = rx
            .iter()
            .find_map(|event| match event {
                AgentEvent::Finished(outcome) => Some(outcome),
                _ => None,
            })
            .unwrap();
        assert!(!finished.is_exhausted());
        agent.wait().unwrap();
    }

    #[test]
    fn test_old_timer_spares_new_generation() {
        let mut agent = agent(12);
        let board = BoardLayout::Standard.setup_board();
        agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, || {})
            .unwrap();
        let timer = agent.stop_after(Duration::from_millis(50)).unwrap();
        agent.stop().unwrap();

        let second = agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, || {})
            .unwrap();
        timer.join().unwrap();
        assert_eq!(agent.control().generation(), second);
        assert!(!agent.control().is_stopped());
        assert!(agent.is_searching());
        agent.stop().unwrap();
    }

    #[test]
    fn test_timer_retires_when_search_finishes() {
        let mut agent = agent(1);
        let board = BoardLayout::Standard.setup_board();
        agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, || {})
            .unwrap();
        let timer = agent.stop_after(Duration::from_secs(60)).unwrap();

        let started = Instant::now();
        assert!(agent.wait().unwrap().unwrap().is_exhausted());
        timer.join().unwrap();
        assert!(started.elapsed() < Duration::from_secs(10));
        assert!(!agent.control().is_stopped());
    }

    #[test]
    fn test_events_report_best_moves() {
        let mut agent = agent(2);
        let board = BoardLayout::BelgianDaisy.setup_board();
        let rx = agent
            .start_with_events(&board, Player::Black, GameProgress::default())
            .unwrap();

        let mut best = Vec::new();
        let mut outcome = None;
        for event in rx.iter() {
            match event {
                AgentEvent::BestMove(mv) => best.push(mv),
                AgentEvent::Finished(o) => {
                    outcome = Some(o);
                    break;
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        let outcome = outcome.unwrap();
        assert!(outcome.is_exhausted());
        assert!(!best.is_empty());
        assert_eq!(best.last().copied(), outcome.best_move);
        agent.wait().unwrap();
    }

    #[test]
    fn test_ponder_then_reuse_refutation() {
        let mut agent = agent(1);
        let board = BoardLayout::Standard.setup_board();
        // White to move; black ponders
        let rx = agent
            .ponder_with_events(&board, Player::Black, GameProgress::default())
            .unwrap();

        let mut refutations = Vec::new();
        for event in rx.iter() {
            match event {
                AgentEvent::Refutation { predicted, reply } => refutations.push((predicted, reply)),
                AgentEvent::PonderFinished { refutations: count } => {
                    assert_eq!(count, refutations.len());
                    break;
                }
                other => panic!("unexpected event {:?}", other),
            }
        }
        agent.wait().unwrap();

        assert_eq!(refutations.len(), 1);
        let (predicted, reply) = refutations[0];
        let after = board.with_move(&predicted);
        assert_eq!(agent.refutation(&after).map(|r| r.reply), Some(reply));
        assert!(after.is_valid_move(&reply, Player::Black));
        assert_eq!(agent.take_refutation(&after).map(|r| r.predicted), Some(predicted));
        assert_eq!(agent.refutation_count(), 0);
    }

    #[test]
    fn test_live_search_cancels_ponder() {
        let mut agent = agent(12);
        agent.set_ponder_breadth(None);
        let board = BoardLayout::Standard.setup_board();
        agent
            .ponder(&board, Player::Black, GameProgress::default(), |_, _| {}, || {})
            .unwrap();
        assert!(agent.is_pondering());

        agent
            .start(&board, Player::White, GameProgress::default(), |_| {}, || {})
            .unwrap();
        assert!(agent.is_searching());
        assert!(!agent.is_pondering());
        agent.stop().unwrap();
    }

    #[test]
    fn test_ponder_rejected_during_search() {
        let mut agent = agent(12);
        let board = BoardLayout::Standard.setup_board();
        agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, || {})
            .unwrap();
        assert!(matches!(
            agent.ponder(&board, Player::White, GameProgress::default(), |_, _| {}, || {}),
            Err(AgentError::AlreadySearching)
        ));
        agent.stop().unwrap();
    }

    #[test]
    fn test_pause_toggle() {
        let mut agent = agent(2);
        let board = BoardLayout::Standard.setup_board();
        agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, || {})
            .unwrap();
        assert!(agent.toggle_paused());
        assert!(!agent.toggle_paused());
        let outcome = agent.wait().unwrap().unwrap();
        assert!(outcome.is_exhausted());
    }

    #[test]
    fn test_set_evaluator_applies_to_next_search() {
        let mut agent = agent(1);
        agent.set_evaluator(EvaluatorKind::Clustered);
        assert_eq!(agent.evaluator(), EvaluatorKind::Clustered);

        let board = BoardLayout::Standard.setup_board();
        agent
            .start(&board, Player::Black, GameProgress::default(), |_| {}, || {})
            .unwrap();
        agent.wait().unwrap();
        let search = agent.search.as_ref().unwrap();
        assert_eq!(search.config().evaluator, EvaluatorKind::Clustered);
    }
}
