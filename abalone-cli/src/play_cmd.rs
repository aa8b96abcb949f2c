//! Play command - engine-vs-engine game
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: apply_overrides(), play_game(), report_results()
//! - Level 3: choose_move(), search_move(), random_move()
//! - Level 4: formatting utilities

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use abalone_core::{
    Agent, AgentEvent, Board, BoardLayout, EngineConfig, EvaluatorKind, GameProgress, Move,
    Player, StateGenerator,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct PlayArgs {
    /// Starting layout (defaults to the config's layout)
    #[arg(long)]
    pub layout: Option<BoardLayout>,

    /// Search depth in plies
    #[arg(long)]
    pub depth: Option<u8>,

    /// Turns per side before the game is called
    #[arg(long)]
    pub move_limit: Option<u32>,

    /// Time limit per move in milliseconds, both sides
    #[arg(long)]
    pub time_ms: Option<u64>,

    /// Evaluator for black
    #[arg(long)]
    pub black_evaluator: Option<EvaluatorKind>,

    /// Evaluator for white
    #[arg(long)]
    pub white_evaluator: Option<EvaluatorKind>,

    /// Do not ponder during the opponent's turn
    #[arg(long)]
    pub no_ponder: bool,

    /// Output results as JSON
    #[arg(long)]
    pub json: bool,
}

/// Where a played move came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
enum MoveSource {
    Search,
    Refutation,
    Random,
}

#[derive(Clone, Debug)]
struct TurnRecord {
    ply: u32,
    side: Player,
    mv: Move,
    source: MoveSource,
    elapsed: Duration,
}

#[derive(Clone, Debug)]
struct GameRecord {
    turns: Vec<TurnRecord>,
    board: Board,
}

impl GameRecord {
    fn count(&self, source: MoveSource) -> usize {
        self.turns.iter().filter(|t| t.source == source).count()
    }
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run play command
///
/// 1. Apply command-line overrides to the config
/// 2. Play one game
/// 3. Report results
pub fn run(args: PlayArgs, config: EngineConfig, seed: Option<u64>) -> Result<()> {
    let config = apply_overrides(&args, config)?;
    let mut rng = create_rng(seed);

    tracing::info!(
        "Starting game: {} layout, depth={}, black={}, white={}",
        config.layout.name(),
        config.depth_limit,
        config.black.evaluator,
        config.white.evaluator
    );

    let record = play_game(&config, !args.no_ponder, &mut rng)?;
    report_results(&record, args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn apply_overrides(args: &PlayArgs, mut config: EngineConfig) -> Result<EngineConfig> {
    if let Some(layout) = args.layout {
        config.layout = layout;
    }
    if let Some(depth) = args.depth {
        config.depth_limit = depth;
    }
    if let Some(move_limit) = args.move_limit {
        config.move_limit = move_limit;
    }
    for side in Player::ALL {
        if let Some(time_ms) = args.time_ms {
            config.side_mut(side).time_limit_ms = time_ms;
        }
    }
    if let Some(evaluator) = args.black_evaluator {
        config.black.evaluator = evaluator;
    }
    if let Some(evaluator) = args.white_evaluator {
        config.white.evaluator = evaluator;
    }
    config.validate().context("Invalid game settings")?;
    Ok(config)
}

/// Alternate turns until someone wins, the move limit is hit or a side
/// has no legal move
fn play_game(config: &EngineConfig, ponder: bool, rng: &mut ChaCha8Rng) -> Result<GameRecord> {
    let mut board = config.layout.setup_board();
    let mut agents = Player::ALL.map(|side| {
        Agent::new(side.to_string(), config.search_config(side), config.ponder_breadth)
    });
    let mut turns = Vec::new();
    let mut side = Player::Black;

    for ply in 0..config.ply_limit() {
        if board.is_game_over() {
            break;
        }
        let turn = ply / 2;
        let started = Instant::now();
        let agent = &mut agents[side.index()];

        let Some((mv, source)) = choose_move(
            agent,
            &board,
            side,
            config.progress(turn),
            config.side(side).time_limit(),
            rng,
        )?
        else {
            tracing::warn!("{} has no legal move", side);
            break;
        };

        board.apply_move(&mv);
        let elapsed = started.elapsed();
        tracing::info!(
            "Ply {}: {} plays {} ({:?}, {:.2}s)",
            ply + 1,
            side,
            mv,
            source,
            elapsed.as_secs_f64()
        );
        turns.push(TurnRecord {
            ply: ply + 1,
            side,
            mv,
            source,
            elapsed,
        });

        if ponder && !board.is_game_over() {
            agent.ponder(&board, side, config.progress(turn + 1), |_, _| {}, || {})?;
        }
        side = side.opponent();
    }

    for agent in agents.iter_mut() {
        agent.stop()?;
    }

    Ok(GameRecord { turns, board })
}

fn report_results(record: &GameRecord, json: bool) -> Result<()> {
    if json {
        print_json_results(record)
    } else {
        print_text_results(record);
        Ok(())
    }
}

// ============================================================================
// LEVEL 3 - STEPS
// ============================================================================

/// Refutation if the opponent played a predicted move, else a timed search,
/// else a random legal move
fn choose_move(
    agent: &mut Agent,
    board: &Board,
    side: Player,
    progress: GameProgress,
    time_limit: Duration,
    rng: &mut ChaCha8Rng,
) -> Result<Option<(Move, MoveSource)>> {
    // Our turn: pondering is over and its table is stale after this lookup
    agent.stop()?;
    let refutation = agent.take_refutation(board);
    agent.clear_refutations();

    if let Some(refutation) = refutation {
        if board.is_valid_move(&refutation.reply, side) {
            tracing::debug!("{} predicted {}", side, refutation.predicted);
            return Ok(Some((refutation.reply, MoveSource::Refutation)));
        }
        tracing::warn!("Discarding illegal refutation {}", refutation.reply);
    }

    if let Some(mv) = search_move(agent, board, side, progress, time_limit)? {
        return Ok(Some((mv, MoveSource::Search)));
    }
    Ok(random_move(board, side, rng).map(|mv| (mv, MoveSource::Random)))
}

fn search_move(
    agent: &mut Agent,
    board: &Board,
    side: Player,
    progress: GameProgress,
    time_limit: Duration,
) -> Result<Option<Move>> {
    let events = agent.start_with_events(board, side, progress)?;
    agent.stop_after(time_limit)?;

    let mut best = None;
    for event in events.iter() {
        match event {
            AgentEvent::BestMove(mv) => best = Some(mv),
            AgentEvent::Finished(outcome) => {
                best = outcome.best_move.or(best);
                break;
            }
            _ => {}
        }
    }
    agent.wait()?;
    Ok(best)
}

fn random_move(board: &Board, side: Player, rng: &mut ChaCha8Rng) -> Option<Move> {
    let moves = StateGenerator::enumerate_board(board, side);
    if moves.is_empty() {
        return None;
    }
    Some(moves[rng.gen_range(0..moves.len())])
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

/// Create RNG from seed or random
fn create_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(s) => ChaCha8Rng::seed_from_u64(s),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn result_label(board: &Board) -> String {
    match board.winner() {
        Some(side) => format!("{} wins", side),
        None => "no winner".to_string(),
    }
}

fn print_json_results(record: &GameRecord) -> Result<()> {
    #[derive(serde::Serialize)]
    struct JsonTurn {
        ply: u32,
        side: Player,
        mv: String,
        source: MoveSource,
        elapsed_ms: u128,
    }

    #[derive(serde::Serialize)]
    struct JsonOutput {
        result: String,
        winner: Option<Player>,
        black_score: u8,
        white_score: u8,
        plies: usize,
        refutations_used: usize,
        random_moves: usize,
        final_rows: Vec<Vec<u8>>,
        turns: Vec<JsonTurn>,
    }

    let output = JsonOutput {
        result: result_label(&record.board),
        winner: record.board.winner(),
        black_score: record.board.score(Player::Black),
        white_score: record.board.score(Player::White),
        plies: record.turns.len(),
        refutations_used: record.count(MoveSource::Refutation),
        random_moves: record.count(MoveSource::Random),
        final_rows: record.board.to_rows(),
        turns: record
            .turns
            .iter()
            .map(|t| JsonTurn {
                ply: t.ply,
                side: t.side,
                mv: t.mv.to_string(),
                source: t.source,
                elapsed_ms: t.elapsed.as_millis(),
            })
            .collect(),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text_results(record: &GameRecord) {
    println!("\n=== Game Result ===");
    println!("{}", record.board);
    println!("Result:       {}", result_label(&record.board));
    println!(
        "Score:        black {} - white {}",
        record.board.score(Player::Black),
        record.board.score(Player::White)
    );
    println!("Plies:        {}", record.turns.len());
    println!("Refutations:  {}", record.count(MoveSource::Refutation));
    println!("Random moves: {}", record.count(MoveSource::Random));
}
