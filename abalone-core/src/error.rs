//! Error types

use std::path::PathBuf;

/// Cell, direction or move notation that could not be parsed
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid cell: {0:?}")]
    Cell(String),

    #[error("invalid direction: {0:?}")]
    Direction(String),

    #[error("invalid move: {0:?}")]
    Move(String),
}

/// Board layout could not be built
#[derive(Debug, thiserror::Error)]
pub enum LayoutError {
    #[error("expected {expected} rows, found {found}")]
    RowCount { expected: usize, found: usize },

    #[error("row {row} has {found} cells, expected {expected}")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid cell value {value} at row {row}, column {column}")]
    CellValue { row: usize, column: usize, value: u8 },

    #[error("failed to read layout {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse layout: {0}")]
    Json(#[from] serde_json::Error),
}

/// Engine configuration could not be loaded or is inconsistent
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Agent worker failures
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("agent already owns a running search")]
    AlreadySearching,

    #[error("failed to spawn search thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("search thread panicked")]
    WorkerPanicked,
}
