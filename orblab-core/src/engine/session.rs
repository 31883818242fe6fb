//! Session simulator — one trading day, one parameter set, one outcome.
//!
//! Chains range → breakout → fill → cost gate → outcome. Pure: reads the
//! session and the cost model, writes nothing shared.

use chrono::NaiveDate;
use serde::Serialize;
use tracing::debug;

use crate::domain::{
    Direction, ExecutionMode, Fill, OpeningRange, Outcome, Session, Signal, SkipReason,
    StopTarget, StrategyParams, TradeOutcome, TradeRecord,
};

use super::breakout::detect_breakout;
use super::cost_model::{CostModel, RealizedResult};
use super::fill::{forced_market_entry, resolve_fill, FillResolution};
use super::outcome::resolve_outcome;
use super::range::compute_opening_range;

/// Everything derived while simulating one session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionResult {
    pub date: NaiveDate,
    pub outcome: Outcome,
    pub range: Option<OpeningRange>,
    pub signal: Option<Signal>,
    pub fill: Option<Fill>,
    pub stop_target: Option<StopTarget>,
    pub trade: Option<TradeOutcome>,
    pub realized: Option<RealizedResult>,
    pub realized_r: Option<f64>,
}

impl SessionResult {
    fn skipped(date: NaiveDate, outcome: Outcome) -> Self {
        Self {
            date,
            outcome,
            range: None,
            signal: None,
            fill: None,
            stop_target: None,
            trade: None,
            realized: None,
            realized_r: None,
        }
    }

    /// Flatten into the per-trade persistence record.
    pub fn to_record(&self) -> TradeRecord {
        let mut record = TradeRecord::no_trade(self.date, self.outcome);
        if let (Some(fill), Some(levels)) = (self.fill, self.stop_target) {
            record.direction = Some(fill.direction());
            record.entry_timestamp = Some(fill.timestamp());
            record.entry_price = Some(fill.price());
            record.stop_price = Some(levels.stop_price);
            record.target_price = Some(levels.target_price);
            record.theoretical_rr = Some(levels.rr());
            record.passes_cost_gate = Some(self.outcome != Outcome::Skipped(SkipReason::CostGate));
        }
        if let Some(trade) = self.trade {
            record.exit_timestamp = Some(trade.exit_timestamp);
            record.exit_price = Some(trade.exit_price);
            record.mae_points = Some(trade.mae_points);
            record.mfe_points = Some(trade.mfe_points);
        }
        if let Some(realized) = self.realized {
            record.realized_rr = Some(realized.realized_rr);
        }
        record.realized_r = self.realized_r;
        record
    }
}

/// A caller-chosen market entry, used by the random-entry control baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForcedEntry {
    pub bar_index: usize,
    pub direction: Direction,
}

/// Simulate one session under `params`.
pub fn simulate_session(
    session: &Session,
    params: &StrategyParams,
    cost: &CostModel,
) -> SessionResult {
    let range = match prepare_range(session, params) {
        Ok(range) => range,
        Err(result) => return result,
    };

    let bars = &session.bars;
    let signal = detect_breakout(bars, &range, params.confirm_bars);
    let resolution = resolve_fill(bars, &range, signal.as_ref(), params.execution_mode);

    let fill = match resolution {
        FillResolution::Filled(fill) => fill,
        FillResolution::NoSignal => {
            return SessionResult {
                range: Some(range),
                ..SessionResult::skipped(session.date, Outcome::NoSignal)
            }
        }
        FillResolution::NoFill => {
            return SessionResult {
                range: Some(range),
                signal,
                ..SessionResult::skipped(session.date, Outcome::NoFill)
            }
        }
    };

    finish_trade(session, params, cost, range, signal, fill)
}

/// Simulate a session with a forced market entry instead of the breakout
/// rule. Stop/target structure, filters and costs match `simulate_session`.
pub fn simulate_forced_entry(
    session: &Session,
    params: &StrategyParams,
    cost: &CostModel,
    entry: ForcedEntry,
) -> SessionResult {
    let range = match prepare_range(session, params) {
        Ok(range) => range,
        Err(result) => return result,
    };

    let slippage = match params.execution_mode {
        ExecutionMode::MarketOnClose { slippage_points } => slippage_points,
        _ => 0.0,
    };
    match forced_market_entry(&session.bars, &range, entry.bar_index, entry.direction, slippage) {
        Some(fill) => finish_trade(session, params, cost, range, None, fill),
        None => SessionResult {
            range: Some(range),
            ..SessionResult::skipped(session.date, Outcome::NoFill)
        },
    }
}

fn prepare_range(
    session: &Session,
    params: &StrategyParams,
) -> Result<OpeningRange, SessionResult> {
    let range = compute_opening_range(&session.bars, &params.window).map_err(|err| {
        debug!(date = %session.date, %err, "session skipped");
        SessionResult::skipped(
            session.date,
            Outcome::Skipped(SkipReason::InsufficientRangeData),
        )
    })?;

    if let Some(filter) = params.candidate.size_filter {
        if !filter.accepts(range.size) {
            debug!(date = %session.date, size = range.size, "range size filtered");
            return Err(SessionResult {
                range: Some(range),
                ..SessionResult::skipped(session.date, Outcome::Skipped(SkipReason::RangeFilter))
            });
        }
    }
    Ok(range)
}

fn finish_trade(
    session: &Session,
    params: &StrategyParams,
    cost: &CostModel,
    range: OpeningRange,
    signal: Option<Signal>,
    fill: Fill,
) -> SessionResult {
    // A limit-at-range fill may precede confirmation; only a signal already
    // known at fill time belongs to the trade.
    let signal = signal.filter(|s| s.bar_index <= fill.bar_index());
    let levels = StopTarget::from_fill(
        &fill,
        &range,
        params.candidate.stop_mode,
        params.candidate.risk_reward_ratio,
    );

    // Gate before the walk: a rejected trade never gets an R-multiple.
    if !cost.passes_gate(levels.risk_points) {
        debug!(
            date = %session.date,
            friction_ratio = cost.friction_ratio(levels.risk_points),
            "cost gate rejected trade"
        );
        return SessionResult {
            range: Some(range),
            signal,
            fill: Some(fill),
            stop_target: Some(levels),
            ..SessionResult::skipped(session.date, Outcome::Skipped(SkipReason::CostGate))
        };
    }

    let trade = resolve_outcome(&session.bars, &fill, levels);
    let realized = cost.realize(levels.risk_points, levels.reward_points);
    let realized_r = cost.realized_r(&trade, &realized, levels.risk_points);

    SessionResult {
        date: session.date,
        outcome: trade.outcome,
        range: Some(range),
        signal,
        fill: Some(fill),
        stop_target: Some(levels),
        trade: Some(trade),
        realized: Some(realized),
        realized_r,
    }
}
