//! Search command - analyse a single position
//!
//! ## Architecture (4-layer granularity)
//!
//! - Level 1: run() - orchestration
//! - Level 2: load_board(), run_search(), report_outcome()
//! - Level 4: formatting utilities

use std::path::PathBuf;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Args;

use abalone_core::{
    Agent, AgentEvent, Board, BoardLayout, EngineConfig, EvaluatorKind, GameProgress, LayoutFile,
    Player, SearchOutcome,
};

// ============================================================================
// COMMAND ARGUMENTS (Level 4 - Configuration)
// ============================================================================

#[derive(Args)]
pub struct SearchArgs {
    /// Built-in starting layout (defaults to the config's layout)
    #[arg(long)]
    pub layout: Option<BoardLayout>,

    /// Custom layout JSON file, overrides --layout
    #[arg(long, value_name = "FILE")]
    pub layout_file: Option<PathBuf>,

    /// Side to move
    #[arg(long, default_value = "black")]
    pub side: Player,

    /// Search depth in plies
    #[arg(long)]
    pub depth: Option<u8>,

    /// Evaluator (weighted, weighted_normalized, dynamic, clustered)
    #[arg(long)]
    pub evaluator: Option<EvaluatorKind>,

    /// Turn number, for dynamic weighting
    #[arg(long, default_value = "0")]
    pub turn: u32,

    /// Time limit in milliseconds (defaults to the side's limit)
    #[arg(long)]
    pub time_ms: Option<u64>,

    /// Output result as JSON
    #[arg(long)]
    pub json: bool,
}

// ============================================================================
// LEVEL 1 - ORCHESTRATION
// ============================================================================

/// Run search command
pub fn run(args: SearchArgs, mut config: EngineConfig) -> Result<()> {
    if let Some(depth) = args.depth {
        config.depth_limit = depth;
    }
    if let Some(evaluator) = args.evaluator {
        config.side_mut(args.side).evaluator = evaluator;
    }
    if let Some(time_ms) = args.time_ms {
        config.side_mut(args.side).time_limit_ms = time_ms;
    }
    config.validate().context("Invalid search settings")?;

    let board = load_board(&args, &config)?;
    if !args.json {
        println!("{}", board);
    }

    let started = Instant::now();
    let outcome = run_search(&board, args.side, config.progress(args.turn), &config)?;
    report_outcome(&outcome, args.side, started.elapsed(), args.json)
}

// ============================================================================
// LEVEL 2 - PHASES
// ============================================================================

fn load_board(args: &SearchArgs, config: &EngineConfig) -> Result<Board> {
    match &args.layout_file {
        Some(path) => {
            let file = LayoutFile::load(path)
                .with_context(|| format!("Failed to load layout: {}", path.display()))?;
            file.to_board()
                .with_context(|| format!("Invalid layout: {}", path.display()))
        }
        None => Ok(args.layout.unwrap_or(config.layout).setup_board()),
    }
}

/// Search on an agent thread under the side's time limit
fn run_search(
    board: &Board,
    side: Player,
    progress: GameProgress,
    config: &EngineConfig,
) -> Result<SearchOutcome> {
    let mut agent = Agent::new(side.to_string(), config.search_config(side), config.ponder_breadth);
    let events = agent.start_with_events(board, side, progress)?;
    agent.stop_after(config.side(side).time_limit())?;

    let mut outcome = None;
    for event in events.iter() {
        match event {
            AgentEvent::BestMove(mv) => tracing::info!("Best so far: {}", mv),
            AgentEvent::Finished(result) => {
                outcome = Some(result);
                break;
            }
            _ => {}
        }
    }
    agent.wait()?;

    outcome.context("Search worker exited without a result")
}

fn report_outcome(outcome: &SearchOutcome, side: Player, elapsed: Duration, json: bool) -> Result<()> {
    if json {
        print_json_outcome(outcome, side, elapsed)?;
    } else {
        print_text_outcome(outcome, side, elapsed);
    }
    Ok(())
}

// ============================================================================
// LEVEL 4 - UTILITIES
// ============================================================================

fn print_json_outcome(outcome: &SearchOutcome, side: Player, elapsed: Duration) -> Result<()> {
    #[derive(serde::Serialize)]
    struct JsonOutcome {
        side: Player,
        best_move: Option<String>,
        score: Option<i32>,
        depth: u8,
        exhausted: bool,
        nodes: u64,
        leaves: u64,
        cutoffs: u64,
        tt_hits: u64,
        re_searches: u64,
        elapsed_ms: u128,
    }

    let output = JsonOutcome {
        side,
        best_move: outcome.best_move.map(|mv| mv.to_string()),
        score: outcome.score,
        depth: outcome.depth,
        exhausted: outcome.is_exhausted(),
        nodes: outcome.stats.nodes,
        leaves: outcome.stats.leaves,
        cutoffs: outcome.stats.cutoffs,
        tt_hits: outcome.stats.tt_hits,
        re_searches: outcome.stats.re_searches,
        elapsed_ms: elapsed.as_millis(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn print_text_outcome(outcome: &SearchOutcome, side: Player, elapsed: Duration) {
    println!("=== Search ({}) ===", side);
    match outcome.best_move {
        Some(mv) => println!("Best move:  {}", mv),
        None => println!("Best move:  none"),
    }
    if let Some(score) = outcome.score {
        println!("Score:      {}", score);
    }
    println!("Depth:      {} ({:?})", outcome.depth, outcome.status);
    println!(
        "Nodes:      {} ({} leaves, {} cutoffs, {} table hits, {} re-searches)",
        outcome.stats.nodes,
        outcome.stats.leaves,
        outcome.stats.cutoffs,
        outcome.stats.tt_hits,
        outcome.stats.re_searches
    );
    println!("Time:       {:.2}s", elapsed.as_secs_f64());
}
