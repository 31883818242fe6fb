//! Bar and Session — the fundamental market data units.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// OHLC bar for one instrument at one intraday timestamp.
///
/// Timestamps are session-local and mark the bar open. Bars are produced by
/// the bar feed and are read-only to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl Bar {
    pub fn new(timestamp: NaiveDateTime, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
        }
    }

    /// Returns true if any OHLC field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.open > 0.0
            && self.close > 0.0
    }
}

/// One trading day of bars for one instrument, ordered by timestamp.
///
/// Gaps stay gaps: the feed never forward-fills, so a missing minute shows up
/// as a missing bar rather than a synthetic one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub date: NaiveDate,
    pub bars: Vec<Bar>,
}

impl Session {
    pub fn new(date: NaiveDate, bars: Vec<Bar>) -> Self {
        Self { date, bars }
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Copy of this session cut after `len` bars.
    pub fn truncated(&self, len: usize) -> Self {
        let len = len.min(self.bars.len());
        Self {
            date: self.date,
            bars: self.bars[..len].to_vec(),
        }
    }
}
