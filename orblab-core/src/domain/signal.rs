//! Breakout direction and confirmed signals.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Side of the opening range a breakout leaves through.
///
/// `Up` trades long, `Down` trades short.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    /// +1.0 for long, -1.0 for short.
    pub fn sign(self) -> f64 {
        match self {
            Direction::Up => 1.0,
            Direction::Down => -1.0,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
        }
    }
}

/// A confirmed close-based breakout. At most one per session.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub direction: Direction,
    /// Index into the session's bars of the confirming bar.
    pub bar_index: usize,
    pub confirmation_timestamp: NaiveDateTime,
    pub confirmation_price: f64,
}
