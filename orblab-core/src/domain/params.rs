//! Strategy knobs: the closed parameter set of the ORB family.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{ExecutionMode, RangeWindow, StopMode};

/// Inclusive bounds on opening-range size, in points. Either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct SizeFilter {
    pub min_points: Option<f64>,
    pub max_points: Option<f64>,
}

impl SizeFilter {
    pub fn accepts(&self, size: f64) -> bool {
        self.min_points.map_or(true, |min| size >= min)
            && self.max_points.map_or(true, |max| size <= max)
    }
}

/// One point of the parameter grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterCandidate {
    pub risk_reward_ratio: f64,
    pub stop_mode: StopMode,
    #[serde(default)]
    pub size_filter: Option<SizeFilter>,
}

impl ParameterCandidate {
    pub fn new(risk_reward_ratio: f64, stop_mode: StopMode) -> Self {
        Self {
            risk_reward_ratio,
            stop_mode,
            size_filter: None,
        }
    }

    pub fn with_size_filter(mut self, filter: SizeFilter) -> Self {
        self.size_filter = Some(filter);
        self
    }

    /// Short human-readable label, e.g. `rr=1.50 stop=FULL size=[2.00,8.00]`.
    pub fn label(&self) -> String {
        let stop = match self.stop_mode {
            StopMode::Full => "FULL",
            StopMode::Half => "HALF",
        };
        let mut label = format!("rr={:.2} stop={stop}", self.risk_reward_ratio);
        if let Some(filter) = self.size_filter {
            let bound = |b: Option<f64>| b.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"));
            label.push_str(&format!(
                " size=[{},{}]",
                bound(filter.min_points),
                bound(filter.max_points)
            ));
        }
        label
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if !(self.risk_reward_ratio > 0.0) || !self.risk_reward_ratio.is_finite() {
            return Err(ParamError::Invalid(format!(
                "risk_reward_ratio must be positive, got {}",
                self.risk_reward_ratio
            )));
        }
        if let Some(SizeFilter {
            min_points: Some(min),
            max_points: Some(max),
        }) = self.size_filter
        {
            if min > max {
                return Err(ParamError::Invalid(format!(
                    "size filter min {min} exceeds max {max}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for ParameterCandidate {
    /// 1.5R target with the stop at the opposite boundary, no size filter.
    fn default() -> Self {
        Self::new(1.5, StopMode::Full)
    }
}

/// Everything the session simulator needs besides bars and costs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyParams {
    pub window: RangeWindow,
    /// Consecutive closes outside the range needed to confirm a breakout.
    pub confirm_bars: u32,
    pub execution_mode: ExecutionMode,
    pub candidate: ParameterCandidate,
}

impl StrategyParams {
    pub fn with_candidate(&self, candidate: ParameterCandidate) -> Self {
        Self { candidate, ..*self }
    }

    /// Configuration-time checks. Runs before any simulation work.
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.window.bar_minutes == 0 || self.window.duration_minutes == 0 {
            return Err(ParamError::Invalid(
                "range duration and bar interval must be positive".into(),
            ));
        }
        if self.window.duration_minutes % self.window.bar_minutes != 0 {
            return Err(ParamError::Invalid(format!(
                "range duration {}m is not a multiple of the {}m bar interval",
                self.window.duration_minutes, self.window.bar_minutes
            )));
        }
        if self.window.wraps_midnight() {
            return Err(ParamError::Invalid(format!(
                "range window starting {} for {}m runs past midnight",
                self.window.start, self.window.duration_minutes
            )));
        }
        if self.confirm_bars == 0 {
            return Err(ParamError::Invalid("confirm_bars must be at least 1".into()));
        }
        match self.execution_mode {
            ExecutionMode::LimitAtRange if self.confirm_bars > 1 => {
                return Err(ParamError::Invalid(format!(
                    "limit_at_range ignores close confirmation; confirm_bars={} is incompatible",
                    self.confirm_bars
                )));
            }
            ExecutionMode::MarketOnClose { slippage_points }
                if !(slippage_points >= 0.0) || !slippage_points.is_finite() =>
            {
                return Err(ParamError::Invalid(format!(
                    "market slippage must be a non-negative number of points, got {slippage_points}"
                )));
            }
            _ => {}
        }
        self.candidate.validate()
    }
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            window: RangeWindow::default(),
            confirm_bars: 1,
            execution_mode: ExecutionMode::default(),
            candidate: ParameterCandidate::default(),
        }
    }
}

/// Configuration-level error, raised before any simulation runs.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParamError {
    #[error("invalid parameter: {0}")]
    Invalid(String),
}
