//! Fill resolution for the three execution modes.
//!
//! Signal detection and fill resolution are separate steps: the detector says
//! *whether* price broke out, the resolver decides *if and where* an order
//! would actually have filled.

use crate::domain::{Bar, Direction, ExecutionMode, Fill, OpeningRange, Signal};

/// Result of trying to fill an entry for one session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillResolution {
    Filled(Fill),
    /// The mode needs a confirmed breakout and none occurred.
    NoSignal,
    /// An order existed (or could have) but price never reached it.
    NoFill,
}

impl FillResolution {
    pub fn fill(&self) -> Option<&Fill> {
        match self {
            FillResolution::Filled(fill) => Some(fill),
            _ => None,
        }
    }
}

/// Resolve the entry fill for a session under `mode`.
///
/// `signal` is the session's confirmed breakout, if any. `LimitAtRange` does
/// not need one but uses it to disambiguate a bar that touches both
/// boundaries.
pub fn resolve_fill(
    bars: &[Bar],
    range: &OpeningRange,
    signal: Option<&Signal>,
    mode: ExecutionMode,
) -> FillResolution {
    if mode.requires_signal() && signal.is_none() {
        return FillResolution::NoSignal;
    }
    match (mode, signal) {
        (ExecutionMode::MarketOnClose { slippage_points }, Some(signal)) => {
            FillResolution::Filled(market_on_close(signal, slippage_points, mode))
        }
        (ExecutionMode::LimitRetrace, Some(signal)) => limit_retrace(bars, range, signal, mode),
        (ExecutionMode::LimitAtRange, _) => limit_at_range(bars, range, signal, mode),
        (_, None) => FillResolution::NoSignal,
    }
}

fn market_on_close(signal: &Signal, slippage_points: f64, mode: ExecutionMode) -> Fill {
    let price = signal.confirmation_price + signal.direction.sign() * slippage_points;
    Fill::new(
        signal.confirmation_timestamp,
        price,
        signal.direction,
        signal.bar_index,
        mode,
    )
}

fn limit_at_range(
    bars: &[Bar],
    range: &OpeningRange,
    signal: Option<&Signal>,
    mode: ExecutionMode,
) -> FillResolution {
    for (index, bar) in bars.iter().enumerate().skip(range.next_index) {
        if bar.timestamp <= range.end {
            continue;
        }
        let touched_high = bar.high >= range.high;
        let touched_low = bar.low <= range.low;

        let direction = match (touched_high, touched_low) {
            (false, false) => continue,
            (true, false) => Direction::Up,
            (false, true) => Direction::Down,
            // Gap-through: only a breakout already confirmed by this bar's
            // close may pick the side.
            (true, true) => match signal {
                Some(s) if s.bar_index <= index => s.direction,
                _ => return FillResolution::NoFill,
            },
        };

        return FillResolution::Filled(Fill::new(
            bar.timestamp,
            range.boundary(direction),
            direction,
            index,
            mode,
        ));
    }
    FillResolution::NoFill
}

fn limit_retrace(
    bars: &[Bar],
    range: &OpeningRange,
    signal: &Signal,
    mode: ExecutionMode,
) -> FillResolution {
    let direction = signal.direction;
    let level = range.boundary(direction);

    let retrace = bars
        .iter()
        .enumerate()
        .skip(signal.bar_index + 1)
        .find(|(_, bar)| match direction {
            Direction::Up => bar.low <= level,
            Direction::Down => bar.high >= level,
        });

    match retrace {
        Some((index, bar)) => {
            FillResolution::Filled(Fill::new(bar.timestamp, level, direction, index, mode))
        }
        None => FillResolution::NoFill,
    }
}

/// Market entry at the close of `bar_index`, used by the random-entry control
/// baseline. Returns `None` for bars inside or before the range window.
pub fn forced_market_entry(
    bars: &[Bar],
    range: &OpeningRange,
    bar_index: usize,
    direction: Direction,
    slippage_points: f64,
) -> Option<Fill> {
    let bar = bars.get(bar_index)?;
    if bar_index < range.next_index || bar.timestamp <= range.end {
        return None;
    }
    Some(Fill::new(
        bar.timestamp,
        bar.close + direction.sign() * slippage_points,
        direction,
        bar_index,
        ExecutionMode::MarketOnClose { slippage_points },
    ))
}
