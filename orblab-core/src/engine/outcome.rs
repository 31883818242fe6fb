//! Outcome resolution — the post-fill state machine.
//!
//! ```text
//! Armed ──target touched, stop not──▶ Win
//!   │  ──stop touched (or both)─────▶ Loss
//!   └──data ends──────────────────▶ Unresolved
//! ```
//!
//! Stop and target touches are checked against each bar's high/low, never
//! the close. When both levels are inside the same bar the trade is a loss:
//! intrabar ordering is not inferred from OHLC.
//!
//! Limit fills happen inside a bar, so the fill bar is walked too. Its adverse
//! extreme counts against the trade (stop touch included); on the favorable
//! side only its close is known to come after the fill, and a target touch
//! on that bar is ignored. Market-on-close fills start on the next bar.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::{Bar, Direction, Fill, Outcome, StopTarget, TradeOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolverState {
    Armed,
    Win,
    Loss,
}

impl ResolverState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, ResolverState::Armed)
    }
}

/// Walks bars after the fill, tracking excursions until a level is touched.
#[derive(Debug, Clone)]
pub struct OutcomeResolver {
    entry_price: f64,
    entry_timestamp: NaiveDateTime,
    entry_index: usize,
    intrabar_fill: bool,
    direction: Direction,
    levels: StopTarget,
    state: ResolverState,
    mae_points: f64,
    mfe_points: f64,
    exit: Option<(usize, NaiveDateTime, f64)>,
    last_seen: Option<(usize, NaiveDateTime, f64)>,
}

impl OutcomeResolver {
    pub fn new(fill: &Fill, levels: StopTarget) -> Self {
        Self {
            entry_price: fill.price(),
            entry_timestamp: fill.timestamp(),
            entry_index: fill.bar_index(),
            intrabar_fill: fill.execution_mode().fills_intrabar(),
            direction: fill.direction(),
            levels,
            state: ResolverState::Armed,
            mae_points: 0.0,
            mfe_points: 0.0,
            exit: None,
            last_seen: None,
        }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn mae_points(&self) -> f64 {
        self.mae_points
    }

    pub fn mfe_points(&self) -> f64 {
        self.mfe_points
    }

    /// Feed the next bar. Bars before the fill bar are ignored, as is the
    /// fill bar itself for a market-on-close fill and anything after a
    /// terminal state.
    pub fn step(&mut self, index: usize, bar: &Bar) -> ResolverState {
        if self.state.is_terminal() || index < self.entry_index {
            return self.state;
        }
        let on_fill_bar = index == self.entry_index;
        if on_fill_bar && !self.intrabar_fill {
            return self.state;
        }

        let sign = self.direction.sign();
        let (worst, best) = match self.direction {
            Direction::Up => (bar.low, bar.high),
            Direction::Down => (bar.high, bar.low),
        };
        // Only the close of the fill bar is known to trade after the fill.
        let best = if on_fill_bar { bar.close } else { best };
        self.mae_points = self.mae_points.max((self.entry_price - worst) * sign);
        self.mfe_points = self.mfe_points.max((best - self.entry_price) * sign);
        self.last_seen = Some((index, bar.timestamp, bar.close));

        let stop_hit = (self.levels.stop_price - worst) * sign >= 0.0;
        let target_hit = !on_fill_bar && (best - self.levels.target_price) * sign >= 0.0;

        if stop_hit {
            // A bar opening through the stop exits at its open.
            let gapped = !on_fill_bar && (self.levels.stop_price - bar.open) * sign > 0.0;
            let exit_price = if gapped { bar.open } else { self.levels.stop_price };
            self.state = ResolverState::Loss;
            self.exit = Some((index, bar.timestamp, exit_price));
        } else if target_hit {
            self.state = ResolverState::Win;
            self.exit = Some((index, bar.timestamp, self.levels.target_price));
        }
        self.state
    }

    /// Finalize. An armed trade becomes `Unresolved`, marked at the last
    /// walked close (or the entry if no bar was walked).
    pub fn finish(self) -> TradeOutcome {
        let risk = self.levels.risk_points;
        let (outcome, (exit_index, exit_timestamp, exit_price)) = match self.state {
            ResolverState::Win => (Outcome::Win, self.exit_or_entry()),
            ResolverState::Loss => (Outcome::Loss, self.exit_or_entry()),
            ResolverState::Armed => (
                Outcome::Unresolved,
                self.last_seen
                    .unwrap_or((self.entry_index, self.entry_timestamp, self.entry_price)),
            ),
        };

        let theoretical_r = match outcome {
            Outcome::Win => self.levels.rr(),
            Outcome::Loss => -1.0,
            _ if risk > 0.0 => (exit_price - self.entry_price) * self.direction.sign() / risk,
            _ => 0.0,
        };

        TradeOutcome {
            outcome,
            exit_price,
            exit_timestamp,
            mae_points: self.mae_points,
            mfe_points: self.mfe_points,
            theoretical_r,
            exit_index,
        }
    }

    fn exit_or_entry(&self) -> (usize, NaiveDateTime, f64) {
        self.exit
            .unwrap_or((self.entry_index, self.entry_timestamp, self.entry_price))
    }
}

/// Walk `bars` from the fill bar to a terminal state.
pub fn resolve_outcome(bars: &[Bar], fill: &Fill, levels: StopTarget) -> TradeOutcome {
    let mut resolver = OutcomeResolver::new(fill, levels);
    for (index, bar) in bars.iter().enumerate().skip(fill.bar_index()) {
        if resolver.step(index, bar).is_terminal() {
            break;
        }
    }
    resolver.finish()
}
