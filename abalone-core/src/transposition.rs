//! Transposition table
//!
//! Caches backed-up search results by position fingerprint. The table only
//! stores; interpreting bounds against an alpha-beta window is the search's
//! job. Entries are overwritten blindly, and 64-bit collisions are not
//! detected.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::eval::Score;
use crate::moves::Move;

/// How a stored score relates to the node's true value
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeType {
    /// Score is the value (PV node)
    Exact,
    /// True value is at least the score (cut node)
    LowerBound,
    /// True value is at most the score (all node)
    UpperBound,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    pub score: Score,
    pub depth: u8,
    pub best_move: Option<Move>,
    pub node_type: NodeType,
}

/// What happens when a bounded table is full
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvictionPolicy {
    /// Keep existing entries, drop new keys
    #[default]
    Never,
    /// Empty the table and start over
    ClearWhenFull,
}

/// Capacity and eviction settings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    /// Maximum entries, `None` for unbounded
    pub capacity: Option<usize>,
    pub eviction: EvictionPolicy,
}

#[derive(Debug, Default)]
pub struct TranspositionTable {
    entries: FxHashMap<u64, Entry>,
    config: TableConfig,
}

impl TranspositionTable {
    pub fn new(config: TableConfig) -> Self {
        let entries = match config.capacity {
            Some(capacity) => FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
            None => FxHashMap::default(),
        };
        Self { entries, config }
    }

    pub fn probe(&self, key: u64) -> Option<Entry> {
        self.entries.get(&key).copied()
    }

    pub fn store(
        &mut self,
        key: u64,
        score: Score,
        depth: u8,
        best_move: Option<Move>,
        node_type: NodeType,
    ) {
        if let Some(capacity) = self.config.capacity {
            if self.entries.len() >= capacity && !self.entries.contains_key(&key) {
                match self.config.eviction {
                    EvictionPolicy::Never => return,
                    EvictionPolicy::ClearWhenFull => self.entries.clear(),
                }
            }
        }
        self.entries.insert(
            key,
            Entry {
                score,
                depth,
                best_move,
                node_type,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn config(&self) -> TableConfig {
        self.config
    }
}
