//! Close-based breakout confirmation.
//!
//! Scans bars after the opening range, counting consecutive closes beyond
//! each boundary. A close on one side resets the other side's counter; a close
//! back inside resets both. The first direction to reach the confirmation
//! count wins and the detector never re-arms.

use crate::domain::{Bar, Direction, OpeningRange, Signal};

/// Detect the first confirmed breakout after the range window closes.
///
/// Only bars strictly after `range.end` are inspected.
pub fn detect_breakout(bars: &[Bar], range: &OpeningRange, confirm_bars: u32) -> Option<Signal> {
    let needed = confirm_bars.max(1);
    let mut up_run = 0u32;
    let mut down_run = 0u32;

    for (index, bar) in bars.iter().enumerate().skip(range.next_index) {
        if bar.timestamp <= range.end {
            continue;
        }

        if bar.close > range.high {
            up_run += 1;
            down_run = 0;
        } else if bar.close < range.low {
            down_run += 1;
            up_run = 0;
        } else {
            up_run = 0;
            down_run = 0;
        }

        let direction = if up_run >= needed {
            Direction::Up
        } else if down_run >= needed {
            Direction::Down
        } else {
            continue;
        };

        return Some(Signal {
            direction,
            bar_index: index,
            confirmation_timestamp: bar.timestamp,
            confirmation_price: bar.close,
        });
    }

    None
}
