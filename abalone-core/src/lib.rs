//! Abalone Core - Board model and search engine
//!
//! This crate provides the decision-making core for Abalone:
//! - Hex geometry (radius-4 board, axial coordinates, Abalone notation)
//! - Board, selection and move model with legality and push rules
//! - Starting layouts and JSON layout files
//! - Legal move enumeration and Zobrist hashing
//! - Static evaluators and a transposition table
//! - Iterative-deepening negascout search with cooperative cancellation
//! - Pondering and a threaded agent wrapper

pub mod board;
pub mod error;
pub mod moves;
pub mod game;
pub mod layout;
pub mod state_generator;
pub mod zobrist;
pub mod transposition;
pub mod eval;
pub mod search;
pub mod ponder;
pub mod agent;
pub mod config;

// Re-exports for convenient access
pub use board::{Direction, Hex, BOARD_RADIUS, CELL_COUNT};
pub use error::{AgentError, ConfigError, LayoutError, ParseError};
pub use moves::{Move, Selection, MAX_SELECTION_SIZE};
pub use game::{Board, Player, MAX_SUMITO, WIN_SCORE};
pub use layout::{BoardLayout, LayoutFile};
pub use state_generator::StateGenerator;
pub use zobrist::{create_board_hash, update_board_hash, ZobristTable};
pub use transposition::{EvictionPolicy, NodeType, TableConfig, TranspositionTable};
pub use eval::{evaluate, EvaluatorKind, GameProgress, Score, INFINITY, WIN_VALUE};
pub use search::{
    Search, SearchConfig, SearchControl, SearchOutcome, SearchState, SearchStats, SearchStatus,
};
pub use ponder::{ponder, predict_opponent_moves, Refutation, RefutationTable};
pub use agent::{Agent, AgentEvent, WorkerMode};
pub use config::{EngineConfig, SideConfig};
