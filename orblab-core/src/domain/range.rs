//! Opening-range window definition and the derived range.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::Direction;

/// The `[start, start + duration)` window the opening range is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RangeWindow {
    /// Session-local start time, e.g. 09:30.
    pub start: NaiveTime,
    pub duration_minutes: u32,
    /// Bar interval of the feed, used to derive the expected bar count.
    pub bar_minutes: u32,
}

impl RangeWindow {
    pub fn new(start: NaiveTime, duration_minutes: u32, bar_minutes: u32) -> Self {
        Self {
            start,
            duration_minutes,
            bar_minutes,
        }
    }

    /// Number of bars a complete window holds.
    pub fn expected_bars(&self) -> usize {
        if self.bar_minutes == 0 {
            return 0;
        }
        (self.duration_minutes / self.bar_minutes) as usize
    }

    /// Window end (exclusive) as a time of day.
    pub fn end(&self) -> NaiveTime {
        self.start + chrono::Duration::minutes(i64::from(self.duration_minutes))
    }

    /// Whether `start + duration` reaches the next calendar day.
    pub fn wraps_midnight(&self) -> bool {
        let duration = chrono::Duration::minutes(i64::from(self.duration_minutes));
        self.start.overflowing_add_signed(duration).1 != 0
    }

    pub fn contains(&self, ts: NaiveDateTime) -> bool {
        let t = ts.time();
        t >= self.start && t < self.end()
    }
}

impl Default for RangeWindow {
    /// 09:30 five-minute range on one-minute bars.
    fn default() -> Self {
        Self {
            start: NaiveTime::from_hms_opt(9, 30, 0).unwrap_or(NaiveTime::MIN),
            duration_minutes: 5,
            bar_minutes: 1,
        }
    }
}

/// High/low of the leading bars of a session. Immutable once computed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OpeningRange {
    /// Timestamp of the first bar inside the window.
    pub start: NaiveDateTime,
    /// Timestamp of the last bar inside the window.
    pub end: NaiveDateTime,
    pub high: f64,
    pub low: f64,
    pub size: f64,
    /// Index of the first bar after the window.
    pub next_index: usize,
}

impl OpeningRange {
    pub fn midpoint(&self) -> f64 {
        (self.high + self.low) / 2.0
    }

    /// The boundary a breakout in `direction` leaves through.
    pub fn boundary(&self, direction: Direction) -> f64 {
        match direction {
            Direction::Up => self.high,
            Direction::Down => self.low,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn default_window_expects_five_bars() {
        let window = RangeWindow::default();
        assert_eq!(window.expected_bars(), 5);
        assert_eq!(window.end(), NaiveTime::from_hms_opt(9, 35, 0).unwrap());
    }

    #[test]
    fn window_contains_is_half_open() {
        let window = RangeWindow::default();
        let day = NaiveDate::from_ymd_opt(2024, 3, 4).unwrap();
        assert!(window.contains(day.and_hms_opt(9, 30, 0).unwrap()));
        assert!(window.contains(day.and_hms_opt(9, 34, 0).unwrap()));
        assert!(!window.contains(day.and_hms_opt(9, 35, 0).unwrap()));
        assert!(!window.contains(day.and_hms_opt(9, 29, 0).unwrap()));
    }

    #[test]
    fn late_window_wraps_midnight() {
        let late = RangeWindow::new(NaiveTime::from_hms_opt(23, 58, 0).unwrap(), 5, 1);
        assert!(late.wraps_midnight());
        let to_midnight = RangeWindow::new(NaiveTime::from_hms_opt(23, 55, 0).unwrap(), 5, 1);
        assert!(to_midnight.wraps_midnight());
        assert!(!RangeWindow::default().wraps_midnight());
    }

    #[test]
    fn aggregated_bars_shrink_expected_count() {
        let window = RangeWindow::new(NaiveTime::from_hms_opt(9, 30, 0).unwrap(), 15, 5);
        assert_eq!(window.expected_bars(), 3);
    }

    #[test]
    fn boundary_and_midpoint() {
        let ts = NaiveDate::from_ymd_opt(2024, 3, 4)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap();
        let range = OpeningRange {
            start: ts,
            end: ts,
            high: 100.60,
            low: 99.80,
            size: 0.80,
            next_index: 5,
        };
        assert_eq!(range.boundary(Direction::Up), 100.60);
        assert_eq!(range.boundary(Direction::Down), 99.80);
        assert!((range.midpoint() - 100.20).abs() < 1e-10);
    }
}
