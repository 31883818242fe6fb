//! Walk-forward split — chronological train / validation / test windows.
//!
//! Sessions are ordered by date and cut by count into three disjoint,
//! contiguous windows (oldest → newest). Tuning only ever sees the train
//! window; the test window stays untouched until the selected candidate is
//! final.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orblab_core::domain::{ParamError, Session};

use crate::data_loader::DateRange;

// ─── Configuration ───────────────────────────────────────────────────

/// Fractions of the session history assigned to each window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Oldest share, used for grid search (default 0.60).
    pub train_fraction: f64,
    /// Middle share, used for the concept check (default 0.20).
    pub validation_fraction: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            train_fraction: 0.60,
            validation_fraction: 0.20,
        }
    }
}

impl SplitConfig {
    /// Share left for the test window.
    pub fn test_fraction(&self) -> f64 {
        1.0 - self.train_fraction - self.validation_fraction
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        let ok = self.train_fraction > 0.0
            && self.validation_fraction > 0.0
            && self.test_fraction() > 1e-9;
        if !ok {
            return Err(ParamError::Invalid(format!(
                "split fractions must be positive and leave room for a test window \
                 (train={}, validation={})",
                self.train_fraction, self.validation_fraction
            )));
        }
        Ok(())
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// Date bounds of the three windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationSplit {
    pub train: DateRange,
    pub validation: DateRange,
    pub test: DateRange,
}

/// Borrowed session slices for each window.
#[derive(Debug, Clone, Copy)]
pub struct SplitSessions<'a> {
    pub train: &'a [Session],
    pub validation: &'a [Session],
    pub test: &'a [Session],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalkForwardError {
    #[error("insufficient history: {sessions} sessions cannot fill train, validation and test windows")]
    InsufficientHistory { sessions: usize },
    #[error("sessions are not in strictly increasing date order")]
    Unordered,
}

// ─── Splitting ───────────────────────────────────────────────────────

/// Cut date-ordered sessions into train / validation / test.
///
/// Window sizes are `floor(n × fraction)` for train and validation; the
/// remainder goes to test. Every window must hold at least one session.
pub fn split_sessions<'a>(
    sessions: &'a [Session],
    config: &SplitConfig,
) -> Result<(ValidationSplit, SplitSessions<'a>), WalkForwardError> {
    if sessions.windows(2).any(|w| w[0].date >= w[1].date) {
        return Err(WalkForwardError::Unordered);
    }

    let n = sessions.len();
    let train_end = (n as f64 * config.train_fraction).floor() as usize;
    let validation_end =
        (n as f64 * (config.train_fraction + config.validation_fraction)).floor() as usize;
    if train_end == 0 || validation_end <= train_end || validation_end >= n {
        return Err(WalkForwardError::InsufficientHistory { sessions: n });
    }

    let train = &sessions[..train_end];
    let validation = &sessions[train_end..validation_end];
    let test = &sessions[validation_end..];

    let split = ValidationSplit {
        train: window_range(train),
        validation: window_range(validation),
        test: window_range(test),
    };
    Ok((
        split,
        SplitSessions {
            train,
            validation,
            test,
        },
    ))
}

/// Caller guarantees `window` is non-empty.
fn window_range(window: &[Session]) -> DateRange {
    DateRange::new(window[0].date, window[window.len() - 1].date)
}

/// Relative drop from train to test expectancy: `1 − test / train`.
///
/// `None` when train expectancy is not positive, because the ratio has no
/// meaning there; callers treat that as a failed gate.
pub fn degradation(train_expectancy: f64, test_expectancy: f64) -> Option<f64> {
    if train_expectancy > 0.0 {
        Some(1.0 - test_expectancy / train_expectancy)
    } else {
        None
    }
}
