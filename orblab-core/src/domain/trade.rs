//! Stop/target levels, resolved outcomes and the per-trade persistence record.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::{Direction, Fill, OpeningRange};

/// Where the protective stop sits relative to the opening range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StopMode {
    /// Stop at the opposite boundary; risk basis is the full range size.
    Full,
    /// Stop at the range midpoint; risk basis is half the range size.
    Half,
}

impl StopMode {
    pub fn risk_basis(self, range: &OpeningRange) -> f64 {
        match self {
            StopMode::Full => range.size,
            StopMode::Half => range.size / 2.0,
        }
    }

    pub fn stop_price(self, range: &OpeningRange, direction: Direction) -> f64 {
        match self {
            StopMode::Full => range.boundary(direction.opposite()),
            StopMode::Half => range.midpoint(),
        }
    }
}

/// Stop and target derived once at fill time; never recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopTarget {
    pub stop_price: f64,
    pub target_price: f64,
    pub risk_points: f64,
    pub reward_points: f64,
}

impl StopTarget {
    /// Stop at the mode's level, target `rr` risk bases away from the fill.
    pub fn from_fill(fill: &Fill, range: &OpeningRange, stop_mode: StopMode, rr: f64) -> Self {
        let direction = fill.direction();
        let risk_points = stop_mode.risk_basis(range);
        let reward_points = rr * risk_points;
        Self {
            stop_price: stop_mode.stop_price(range, direction),
            target_price: fill.price() + direction.sign() * reward_points,
            risk_points,
            reward_points,
        }
    }

    /// Theoretical risk/reward ratio.
    pub fn rr(&self) -> f64 {
        if self.risk_points > 0.0 {
            self.reward_points / self.risk_points
        } else {
            0.0
        }
    }
}

/// Why a session was skipped without a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkipReason {
    /// The range window had fewer bars than expected (holiday, gap).
    InsufficientRangeData,
    /// Range size fell outside the candidate's size filter.
    RangeFilter,
    /// Friction exceeds the minimum-viable-risk threshold.
    CostGate,
}

/// Terminal result of simulating one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    NoSignal,
    NoFill,
    Skipped(SkipReason),
    Win,
    Loss,
    Unresolved,
}

impl Outcome {
    /// WIN or LOSS: the only outcomes that enter decision aggregates.
    pub fn is_resolved_trade(self) -> bool {
        matches!(self, Outcome::Win | Outcome::Loss)
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::NoSignal => "NO_SIGNAL",
            Outcome::NoFill => "NO_FILL",
            Outcome::Skipped(SkipReason::InsufficientRangeData) => "SKIPPED_INSUFFICIENT_DATA",
            Outcome::Skipped(SkipReason::RangeFilter) => "SKIPPED_RANGE_FILTER",
            Outcome::Skipped(SkipReason::CostGate) => "SKIPPED_COST_GATE",
            Outcome::Win => "WIN",
            Outcome::Loss => "LOSS",
            Outcome::Unresolved => "UNRESOLVED",
        }
    }
}

/// Resolved trade. Immutable once finalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TradeOutcome {
    pub outcome: Outcome,
    pub exit_price: f64,
    pub exit_timestamp: NaiveDateTime,
    /// Largest adverse move from the fill price, in points (>= 0).
    pub mae_points: f64,
    /// Largest favorable move from the fill price, in points (>= 0).
    pub mfe_points: f64,
    pub theoretical_r: f64,
    /// Index of the bar the trade resolved on (last walked bar if unresolved).
    pub exit_index: usize,
}

/// Flat per-session record handed to the persistence collaborator.
///
/// Non-trade sessions leave the trade fields empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub date: NaiveDate,
    pub outcome: Outcome,
    pub direction: Option<Direction>,
    pub entry_timestamp: Option<NaiveDateTime>,
    pub entry_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub target_price: Option<f64>,
    pub exit_timestamp: Option<NaiveDateTime>,
    pub exit_price: Option<f64>,
    pub mae_points: Option<f64>,
    pub mfe_points: Option<f64>,
    pub theoretical_rr: Option<f64>,
    pub realized_rr: Option<f64>,
    /// Trade result in realized-risk units (`+realized_rr` win, `-1` loss).
    pub realized_r: Option<f64>,
    pub passes_cost_gate: Option<bool>,
}

impl TradeRecord {
    /// Record for a session that never produced a fill.
    pub fn no_trade(date: NaiveDate, outcome: Outcome) -> Self {
        Self {
            date,
            outcome,
            direction: None,
            entry_timestamp: None,
            entry_price: None,
            stop_price: None,
            target_price: None,
            exit_timestamp: None,
            exit_price: None,
            mae_points: None,
            mfe_points: None,
            theoretical_rr: None,
            realized_rr: None,
            realized_r: None,
            passes_cost_gate: None,
        }
    }

    /// True when this record may contribute to expectancy and win rate.
    pub fn counts_toward_aggregates(&self) -> bool {
        self.outcome.is_resolved_trade() && self.passes_cost_gate == Some(true)
    }
}
