//! Single entry point: one request in, trades or a verdict out.
//!
//! Every parameter is validated before the feed is touched, so a bad request
//! fails without simulating anything.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use orblab_core::domain::{
    ExecutionMode, InstrumentError, InstrumentSpec, ParamError, ParameterCandidate, StrategyParams,
};
use orblab_core::engine::CostModel;

use crate::config::{ConfigError, RunConfig};
use crate::data_loader::{BarFeed, DateRange, LoadError};
use crate::runner::CandidateTrades;
use crate::sweep::ParamGrid;
use crate::validator::{run_validation, ValidationReport, ValidatorConfig, ValidatorError};

/// Top-level error for a run.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("validation error: {0}")]
    Validator(#[from] ValidatorError),
    #[error(transparent)]
    InvalidParameter(#[from] ParamError),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
    #[error("no sessions for {symbol} between {} and {}", .range.start, .range.end)]
    NoSessions { symbol: String, range: DateRange },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CandidateSet {
    Single(ParameterCandidate),
    Grid(ParamGrid),
}

impl CandidateSet {
    pub fn candidates(&self) -> Vec<ParameterCandidate> {
        match self {
            CandidateSet::Single(candidate) => vec![*candidate],
            CandidateSet::Grid(grid) => grid.candidates(),
        }
    }

    /// Grid view; a single candidate becomes a one-point grid.
    pub fn grid(&self) -> ParamGrid {
        match self {
            CandidateSet::Single(candidate) => ParamGrid::single(*candidate),
            CandidateSet::Grid(grid) => grid.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunMode {
    /// Simulate every candidate over the whole range.
    Engine,
    /// Full walk-forward validation.
    Validate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub instrument: InstrumentSpec,
    pub date_range: DateRange,
    pub candidates: CandidateSet,
    pub execution_mode: ExecutionMode,
    pub mode: RunMode,
    /// Window, confirmation and default candidate; `execution_mode` above
    /// overrides the one held here.
    pub strategy: StrategyParams,
    pub validator: ValidatorConfig,
}

impl RunRequest {
    /// Request built from a loaded config. Engine mode runs the strategy's
    /// candidate; validate mode runs the configured grid.
    pub fn from_config(config: &RunConfig, mode: RunMode) -> Result<Self, ConfigError> {
        let candidates = match mode {
            RunMode::Engine => CandidateSet::Single(config.strategy.candidate),
            RunMode::Validate => CandidateSet::Grid(config.grid.clone()),
        };
        Ok(Self {
            instrument: config.instrument_spec()?,
            date_range: config.date_range.unwrap_or_else(DateRange::unbounded),
            candidates,
            execution_mode: config.strategy.execution_mode,
            mode,
            strategy: config.strategy,
            validator: config.validator.clone(),
        })
    }

    fn base_params(&self) -> StrategyParams {
        StrategyParams {
            execution_mode: self.execution_mode,
            ..self.strategy
        }
    }

    /// Fail-fast checks. Runs before any data is loaded.
    pub fn validate(&self) -> Result<(), RunError> {
        self.instrument.validate()?;
        self.base_params().validate()?;
        self.candidates.grid().validate()?;
        if self.mode == RunMode::Validate {
            self.validator.validate()?;
        }
        if self.date_range.start > self.date_range.end {
            return Err(ParamError::Invalid(format!(
                "date range start {} is after end {}",
                self.date_range.start, self.date_range.end
            ))
            .into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RunOutput {
    /// Per-session records for each candidate, in candidate order.
    Trades(Vec<CandidateTrades>),
    Verdict(Box<ValidationReport>),
}

/// Execute a request against a bar feed.
pub fn execute(feed: &dyn BarFeed, request: &RunRequest) -> Result<RunOutput, RunError> {
    request.validate()?;

    let symbol = request.instrument.symbol.as_str();
    let sessions = feed.load_sessions(symbol, &request.date_range)?;
    if sessions.is_empty() {
        return Err(RunError::NoSessions {
            symbol: symbol.to_string(),
            range: request.date_range,
        });
    }
    info!(symbol, sessions = sessions.len(), mode = ?request.mode, "run started");

    let cost = CostModel::new(request.instrument.clone());
    let base = request.base_params();
    match request.mode {
        RunMode::Engine => {
            let batches = request
                .candidates
                .candidates()
                .into_iter()
                .map(|candidate| CandidateTrades::run(&sessions, &base, candidate, &cost))
                .collect();
            Ok(RunOutput::Trades(batches))
        }
        RunMode::Validate => {
            let report = run_validation(
                &sessions,
                &base,
                &request.candidates.grid(),
                &cost,
                &request.validator,
            )?;
            Ok(RunOutput::Verdict(Box::new(report)))
        }
    }
}
