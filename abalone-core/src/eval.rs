//! Position evaluation
//!
//! Every evaluator is a weighted sum of per-side features, each entered as
//! `weight * (feature(me) - feature(opponent))`. Summing in a fixed order
//! keeps `evaluate(b, s) == -evaluate(b, s.opponent())` exact after rounding,
//! except once a side has reached the win threshold.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::board::{Hex, BOARD_RADIUS};
use crate::game::{Board, Player, WIN_SCORE};

/// Search value, always from one side's point of view
pub type Score = i32;

/// A won position (stands in for +infinity)
pub const WIN_VALUE: Score = 1_000_000;

/// Bound wider than any reachable score
pub const INFINITY: Score = 2_000_000;

/// Named weighting schemes
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluatorKind {
    /// Fixed raw weights
    Weighted,
    /// Features mapped to [0, 1] with ceilings that follow the marble count
    #[default]
    WeightedNormalized,
    /// Centralization early, material late
    Dynamic,
    /// Rewards tight groups over long chains
    Clustered,
}

impl EvaluatorKind {
    pub const ALL: [EvaluatorKind; 4] = [
        EvaluatorKind::Weighted,
        EvaluatorKind::WeightedNormalized,
        EvaluatorKind::Dynamic,
        EvaluatorKind::Clustered,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EvaluatorKind::Weighted => "weighted",
            EvaluatorKind::WeightedNormalized => "weighted_normalized",
            EvaluatorKind::Dynamic => "dynamic",
            EvaluatorKind::Clustered => "clustered",
        }
    }

    pub fn evaluate(self, board: &Board, side: Player, progress: GameProgress) -> Score {
        evaluate(board, side, self, progress)
    }
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EvaluatorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EvaluatorKind::ALL
            .into_iter()
            .find(|kind| kind.name() == s.replace('-', "_"))
            .ok_or_else(|| format!("unknown evaluator: {}", s))
    }
}

/// How far the game has advanced, supplied by whoever drives the turns
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameProgress {
    pub turn: u32,
    pub max_turn: u32,
}

impl Default for GameProgress {
    fn default() -> Self {
        Self {
            turn: 0,
            max_turn: 40,
        }
    }
}

impl GameProgress {
    pub fn new(turn: u32, max_turn: u32) -> Self {
        Self { turn, max_turn }
    }

    /// Interpolation factor in [0, 1]
    pub fn factor(&self) -> f32 {
        if self.max_turn == 0 {
            return 1.0;
        }
        self.turn.min(self.max_turn) as f32 / self.max_turn as f32
    }

    /// Same game, one turn later
    pub fn next(self) -> Self {
        Self {
            turn: self.turn.saturating_add(1),
            ..self
        }
    }
}

// ============================================================================
// FEATURES
// ============================================================================

/// Raw features of one side, gathered in a single board pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct SideTally {
    marbles: i32,
    /// Opponent marbles pushed off
    score: i32,
    /// Sum of `BOARD_RADIUS - distance_to_center`
    centre: i32,
    /// Own neighbours, counted once from each end
    cohesion: i32,
    /// Sum over pieces of the squared own-neighbour count
    clustering: i32,
    /// Neighbours that are off the board or not own
    exposure: i32,
}

fn tally(board: &Board) -> [SideTally; 2] {
    let mut sides = [SideTally::default(); 2];
    for (cell, owner) in board.pieces() {
        let side = &mut sides[owner.index()];
        side.marbles += 1;
        side.centre += (BOARD_RADIUS - cell.distance_to_center()) as i32;

        let own = own_neighbours(board, cell, owner);
        side.cohesion += own;
        side.clustering += own * own;
        side.exposure += 6 - own;
    }
    for player in Player::ALL {
        sides[player.index()].score = board.score(player) as i32;
    }
    sides
}

fn own_neighbours(board: &Board, cell: Hex, owner: Player) -> i32 {
    cell.neighbors()
        .filter(|&n| board.get(n) == Some(owner))
        .count() as i32
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Static value of `board` for `side`
pub fn evaluate(board: &Board, side: Player, kind: EvaluatorKind, progress: GameProgress) -> Score {
    if board.score(side) >= WIN_SCORE {
        return WIN_VALUE;
    }
    if board.score(side.opponent()) >= WIN_SCORE {
        return -WIN_VALUE;
    }

    let sides = tally(board);
    let me = &sides[side.index()];
    let opp = &sides[side.opponent().index()];

    let value = match kind {
        EvaluatorKind::Weighted => weighted(me, opp),
        EvaluatorKind::WeightedNormalized => weighted_normalized(me, opp),
        EvaluatorKind::Dynamic => dynamic(me, opp, progress.factor()),
        EvaluatorKind::Clustered => clustered(me, opp),
    };
    value.round() as Score
}

#[inline]
fn diff(me: i32, opp: i32) -> f32 {
    (me - opp) as f32
}

fn weighted(me: &SideTally, opp: &SideTally) -> f32 {
    100.0 * diff(me.score, opp.score)
        + 4.0 * diff(me.centre, opp.centre)
        + 0.5 * diff(me.cohesion, opp.cohesion)
        + 0.5 * diff(opp.exposure, me.exposure)
}

fn dynamic(me: &SideTally, opp: &SideTally, t: f32) -> f32 {
    let material = 60.0 + 80.0 * t;
    let centre = 6.0 - 4.0 * t;
    material * diff(me.score, opp.score)
        + centre * diff(me.centre, opp.centre)
        + 0.5 * diff(me.cohesion, opp.cohesion)
        + 0.5 * diff(opp.exposure, me.exposure)
}

fn clustered(me: &SideTally, opp: &SideTally) -> f32 {
    100.0 * diff(me.score, opp.score)
        + 3.0 * diff(me.centre, opp.centre)
        + 0.25 * diff(me.clustering, opp.clustering)
        + 0.5 * diff(opp.exposure, me.exposure)
}

// Normalised features

const MIN_MARBLE_COUNT: f32 = 9.0;
const MAX_MARBLE_COUNT: f32 = 14.0;
const NORMALIZED_SCALE: f32 = 1000.0;

/// Bound that slides from `low` at 9 marbles to `high` at 14
fn limit_for_count(marbles: i32, low: f32, high: f32) -> f32 {
    let count = (marbles as f32).clamp(MIN_MARBLE_COUNT, MAX_MARBLE_COUNT);
    low + (count - MIN_MARBLE_COUNT) * (high - low) / (MAX_MARBLE_COUNT - MIN_MARBLE_COUNT)
}

fn unit(value: i32, floor: f32, ceiling: f32) -> f32 {
    ((value as f32 - floor) / (ceiling - floor)).clamp(0.0, 1.0)
}

#[derive(Clone, Copy)]
struct Normalized {
    score: f32,
    centre: f32,
    cohesion: f32,
    exposure: f32,
}

impl From<&SideTally> for Normalized {
    fn from(side: &SideTally) -> Self {
        let m = side.marbles;
        Self {
            score: unit(side.score, 0.0, WIN_SCORE as f32),
            centre: unit(side.centre, 0.0, limit_for_count(m, 26.0, 36.0)),
            cohesion: unit(side.cohesion, 0.0, limit_for_count(m, 32.0, 56.0)),
            exposure: unit(
                side.exposure,
                limit_for_count(m, 22.0, 28.0),
                limit_for_count(m, 54.0, 84.0),
            ),
        }
    }
}

fn weighted_normalized(me: &SideTally, opp: &SideTally) -> f32 {
    let me = Normalized::from(me);
    let opp = Normalized::from(opp);
    NORMALIZED_SCALE
        * (0.55 * (me.score - opp.score)
            + 0.275 * (me.centre - opp.centre)
            + 0.10 * (me.cohesion - opp.cohesion)
            + 0.075 * (opp.exposure - me.exposure))
}
