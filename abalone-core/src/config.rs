//! Engine configuration
//!
//! Loaded from JSON; every field has a default so a config file only needs
//! the values it changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::eval::{EvaluatorKind, GameProgress};
use crate::game::Player;
use crate::layout::BoardLayout;
use crate::search::SearchConfig;
use crate::transposition::TableConfig;

/// Settings that differ between the two sides
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SideConfig {
    /// Wall-clock budget per move
    pub time_limit_ms: u64,
    pub evaluator: EvaluatorKind,
}

impl Default for SideConfig {
    fn default() -> Self {
        Self {
            time_limit_ms: 60_000,
            evaluator: EvaluatorKind::WeightedNormalized,
        }
    }
}

impl SideConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Deepest iteration, in plies
    pub depth_limit: u8,
    pub quiescence_gate: bool,
    /// Opponent moves to ponder on, `None` for all of them
    pub ponder_breadth: Option<usize>,
    pub black: SideConfig,
    pub white: SideConfig,
    /// Turns per side before a game is called
    pub move_limit: u32,
    pub layout: BoardLayout,
    /// Turn at which dynamic weighting stops changing
    pub dynamic_max_turn: u32,
    pub table: TableConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            depth_limit: 3,
            quiescence_gate: false,
            ponder_breadth: Some(2),
            black: SideConfig {
                evaluator: EvaluatorKind::Dynamic,
                ..SideConfig::default()
            },
            white: SideConfig::default(),
            move_limit: 50,
            layout: BoardLayout::GermanDaisy,
            dynamic_max_turn: 40,
            table: TableConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.depth_limit == 0 {
            return Err(ConfigError::Invalid("depth_limit must be at least 1".into()));
        }
        for side in Player::ALL {
            if self.side(side).time_limit_ms == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} time_limit_ms must be positive",
                    side
                )));
            }
        }
        if self.ponder_breadth == Some(0) {
            return Err(ConfigError::Invalid(
                "ponder_breadth must be positive or null".into(),
            ));
        }
        if self.table.capacity == Some(0) {
            return Err(ConfigError::Invalid(
                "table capacity must be positive or null".into(),
            ));
        }
        Ok(())
    }

    pub fn side(&self, side: Player) -> &SideConfig {
        match side {
            Player::Black => &self.black,
            Player::White => &self.white,
        }
    }

    pub fn side_mut(&mut self, side: Player) -> &mut SideConfig {
        match side {
            Player::Black => &mut self.black,
            Player::White => &mut self.white,
        }
    }

    /// Search settings for one side
    pub fn search_config(&self, side: Player) -> SearchConfig {
        SearchConfig::default()
            .with_depth(self.depth_limit)
            .with_evaluator(self.side(side).evaluator)
            .with_quiescence_gate(self.quiescence_gate)
            .with_table(self.table)
    }

    pub fn progress(&self, turn: u32) -> GameProgress {
        GameProgress::new(turn, self.dynamic_max_turn)
    }

    /// Plies in a full game, both sides together
    pub fn ply_limit(&self) -> u32 {
        self.move_limit.saturating_mul(2)
    }

    pub fn with_depth(mut self, depth_limit: u8) -> Self {
        self.depth_limit = depth_limit;
        self
    }

    pub fn with_layout(mut self, layout: BoardLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_ponder_breadth(mut self, breadth: Option<usize>) -> Self {
        self.ponder_breadth = breadth;
        self
    }

    pub fn with_move_limit(mut self, move_limit: u32) -> Self {
        self.move_limit = move_limit;
        self
    }

    pub fn with_time_limit(mut self, side: Player, time_limit_ms: u64) -> Self {
        self.side_mut(side).time_limit_ms = time_limit_ms;
        self
    }

    pub fn with_evaluator(mut self, side: Player, evaluator: EvaluatorKind) -> Self {
        self.side_mut(side).evaluator = evaluator;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transposition::EvictionPolicy;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.depth_limit, 3);
        assert_eq!(config.ponder_breadth, Some(2));
        assert_eq!(config.black.evaluator, EvaluatorKind::Dynamic);
        assert_eq!(config.white.evaluator, EvaluatorKind::WeightedNormalized);
        assert_eq!(config.white.time_limit(), Duration::from_secs(60));
        assert_eq!(config.layout, BoardLayout::GermanDaisy);
        assert!(config.validate().is_ok());
        assert_eq!(config.ply_limit(), 100);
    }

    #[test]
    fn test_ply_limit_saturates() {
        let config = EngineConfig::default().with_move_limit(u32::MAX);
        assert_eq!(config.ply_limit(), u32::MAX);
        let config = EngineConfig::default().with_move_limit(1 << 31);
        assert_eq!(config.ply_limit(), u32::MAX);
    }

    #[test]
    fn test_json_round_trip() {
        let config = EngineConfig::default()
            .with_depth(5)
            .with_layout(BoardLayout::BelgianDaisy)
            .with_ponder_breadth(None)
            .with_time_limit(Player::White, 1500)
            .with_evaluator(Player::Black, EvaluatorKind::Clustered);
        let json = config.to_json().unwrap();
        let back: EngineConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: EngineConfig = serde_json::from_str(
            r#"{"depth_limit": 4, "white": {"evaluator": "weighted"},
                "table": {"capacity": 1000, "eviction": "clear_when_full"}}"#,
        )
        .unwrap();
        assert_eq!(config.depth_limit, 4);
        assert_eq!(config.white.evaluator, EvaluatorKind::Weighted);
        assert_eq!(config.white.time_limit_ms, 60_000);
        assert_eq!(config.black.evaluator, EvaluatorKind::Dynamic);
        assert_eq!(config.table.capacity, Some(1000));
        assert_eq!(config.table.eviction, EvictionPolicy::ClearWhenFull);
    }

    #[test]
    fn test_validation() {
        assert!(EngineConfig::default().with_depth(0).validate().is_err());
        assert!(EngineConfig::default()
            .with_time_limit(Player::Black, 0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_ponder_breadth(Some(0))
            .validate()
            .is_err());
        let mut config = EngineConfig::default();
        config.table.capacity = Some(0);
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_search_config_per_side() {
        let config = EngineConfig::default().with_depth(4);
        let black = config.search_config(Player::Black);
        assert_eq!(black.depth_limit, 4);
        assert_eq!(black.evaluator, EvaluatorKind::Dynamic);
        assert_eq!(
            config.search_config(Player::White).evaluator,
            EvaluatorKind::WeightedNormalized
        );
        assert_eq!(config.progress(7), GameProgress::new(7, 40));
    }
}
