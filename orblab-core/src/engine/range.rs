//! Opening-range calculation.
//!
//! The range is taken from the bars whose timestamps fall inside the window.
//! A window with fewer bars than expected (holiday, feed gap) yields no range:
//! missing bars are never synthesized.

use thiserror::Error;

use crate::domain::{Bar, OpeningRange, RangeWindow};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum RangeError {
    #[error("opening range window holds {found} bars, expected {expected}")]
    InsufficientRangeData { expected: usize, found: usize },
}

/// Compute the opening range for one session's bars.
pub fn compute_opening_range(
    bars: &[Bar],
    window: &RangeWindow,
) -> Result<OpeningRange, RangeError> {
    let expected = window.expected_bars();

    let Some(first) = bars.iter().position(|b| window.contains(b.timestamp)) else {
        return Err(RangeError::InsufficientRangeData { expected, found: 0 });
    };
    let found = bars[first..]
        .iter()
        .take_while(|b| window.contains(b.timestamp))
        .count();

    if found < expected || expected == 0 {
        return Err(RangeError::InsufficientRangeData { expected, found });
    }

    let in_window = &bars[first..first + found];
    let high = in_window
        .iter()
        .map(|b| b.high)
        .fold(f64::NEG_INFINITY, f64::max);
    let low = in_window.iter().map(|b| b.low).fold(f64::INFINITY, f64::min);

    Ok(OpeningRange {
        start: in_window[0].timestamp,
        end: in_window[found - 1].timestamp,
        high,
        low,
        size: high - low,
        next_index: first + found,
    })
}
