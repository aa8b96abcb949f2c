//! Search depth scaling benchmark
//!
//! Compares:
//! 1. Time per search at increasing depth for each layout
//! 2. Node counts and table effectiveness
//! 3. Enumeration and hashing throughput

use std::time::Instant;

use abalone_core::{
    create_board_hash, update_board_hash, Board, BoardLayout, EvaluatorKind, GameProgress, Player,
    Search, SearchConfig, StateGenerator,
};

// ============================================================================
// TEST POSITIONS
// ============================================================================

/// Opening position with a few moves played so the sides are in contact
fn midgame_position(layout: BoardLayout) -> Board {
    let mut board = layout.setup_board();
    let mut side = Player::Black;
    for _ in 0..12 {
        let mut search = Search::new(SearchConfig::default().with_depth(1));
        let Some(mv) = search.best_move(&board, side, GameProgress::default()) else {
            break;
        };
        board.apply_move(&mv);
        side = side.opponent();
    }
    board
}

// ============================================================================
// BENCHMARKS
// ============================================================================

#[derive(Clone, Debug)]
struct DepthResult {
    position: String,
    depth: u8,
    millis: f64,
    nodes: u64,
    tt_hits: u64,
    re_searches: u64,
}

impl DepthResult {
    fn to_table_row(&self) -> String {
        format!(
            "| {:<20} | {:>5} | {:>10.1} | {:>10} | {:>8} | {:>11} |",
            self.position, self.depth, self.millis, self.nodes, self.tt_hits, self.re_searches
        )
    }
}

fn benchmark_depths(name: &str, board: &Board, max_depth: u8) -> Vec<DepthResult> {
    println!("\n=== DEPTH BENCHMARK: {} ===", name);
    let mut results = Vec::new();
    for depth in 1..=max_depth {
        let mut search = Search::new(
            SearchConfig::default()
                .with_depth(depth)
                .with_evaluator(EvaluatorKind::WeightedNormalized),
        );
        let start = Instant::now();
        let outcome = search.run(board, Player::Black, GameProgress::default(), |_| {}, || {});
        let millis = start.elapsed().as_secs_f64() * 1000.0;
        println!(
            "  depth {}: {:.1}ms, best {}",
            depth,
            millis,
            outcome.best_move.map(|mv| mv.to_string()).unwrap_or_default()
        );
        results.push(DepthResult {
            position: name.to_string(),
            depth,
            millis,
            nodes: outcome.stats.nodes,
            tt_hits: outcome.stats.tt_hits,
            re_searches: outcome.stats.re_searches,
        });
    }
    results
}

fn benchmark_generation(board: &Board) {
    println!("\n=== GENERATION THROUGHPUT ===");
    let iterations = 2_000;

    let start = Instant::now();
    let mut total = 0;
    for _ in 0..iterations {
        total += StateGenerator::enumerate_board(board, Player::Black).len();
    }
    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "  enumerate: {:.0} boards/sec ({} moves each)",
        iterations as f64 / elapsed,
        total / iterations
    );

    let moves = StateGenerator::enumerate_board(board, Player::Black);
    let hash = create_board_hash(board);
    let start = Instant::now();
    let mut acc = 0u64;
    for _ in 0..iterations {
        for mv in &moves {
            acc ^= update_board_hash(hash, board, mv);
        }
    }
    let elapsed = start.elapsed().as_secs_f64();
    println!(
        "  incremental hash: {:.0} updates/sec (checksum {:x})",
        (iterations * moves.len()) as f64 / elapsed,
        acc
    );
}

fn main() {
    println!("\n=== ABALONE: search depth benchmark ===");

    let mut results = Vec::new();
    for layout in BoardLayout::ALL {
        results.extend(benchmark_depths(layout.name(), &layout.setup_board(), 4));
    }
    let midgame = midgame_position(BoardLayout::BelgianDaisy);
    results.extend(benchmark_depths("belgian_daisy midgame", &midgame, 4));
    benchmark_generation(&midgame);

    println!("\n| Position             | Depth |   Time(ms) |      Nodes |  TT hits | Re-searches |");
    println!("|----------------------|-------|------------|------------|----------|-------------|");
    for result in &results {
        println!("{}", result.to_table_row());
    }
    println!();
}
