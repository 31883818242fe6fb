use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::Direction;

/// How an entry is turned into a fill. Exactly one mode is active per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionMode {
    /// Fill at the confirming close, worsened by `slippage_points` in the
    /// direction of the trade.
    MarketOnClose { slippage_points: f64 },
    /// Resting order at the range boundary; fills on the first touch.
    LimitAtRange,
    /// Wait for a confirmed breakout, then fill when price comes back to the
    /// broken boundary.
    LimitRetrace,
}

impl ExecutionMode {
    pub fn name(&self) -> &'static str {
        match self {
            ExecutionMode::MarketOnClose { .. } => "market_on_close",
            ExecutionMode::LimitAtRange => "limit_at_range",
            ExecutionMode::LimitRetrace => "limit_retrace",
        }
    }

    /// Whether the mode waits for a close-based confirmation.
    pub fn requires_signal(&self) -> bool {
        !matches!(self, ExecutionMode::LimitAtRange)
    }

    /// Whether the fill happens at a resting price inside a bar rather than
    /// at its close.
    pub fn fills_intrabar(&self) -> bool {
        !matches!(self, ExecutionMode::MarketOnClose { .. })
    }
}

impl Default for ExecutionMode {
    fn default() -> Self {
        ExecutionMode::MarketOnClose {
            slippage_points: 0.0,
        }
    }
}

/// An entry fill. Only the fill resolver constructs these, and it always
/// stamps the mode that produced the fill.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Fill {
    timestamp: NaiveDateTime,
    price: f64,
    direction: Direction,
    bar_index: usize,
    execution_mode: ExecutionMode,
}

impl Fill {
    pub(crate) fn new(
        timestamp: NaiveDateTime,
        price: f64,
        direction: Direction,
        bar_index: usize,
        execution_mode: ExecutionMode,
    ) -> Self {
        Self {
            timestamp,
            price,
            direction,
            bar_index,
            execution_mode,
        }
    }

    pub fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    pub fn price(&self) -> f64 {
        self.price
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Index into the session's bars of the bar the fill happened on.
    pub fn bar_index(&self) -> usize {
        self.bar_index
    }

    pub fn execution_mode(&self) -> ExecutionMode {
        self.execution_mode
    }
}
