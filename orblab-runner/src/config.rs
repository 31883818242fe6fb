//! Serializable run configuration.
//!
//! One TOML file describes a complete run: instrument, strategy knobs, the
//! parameter grid and validator thresholds. Every section except `symbol`
//! and `instrument` is optional and falls back to the defaults below.
//!
//! ```toml
//! symbol = "ES"
//!
//! [instrument]
//! preset = "ES"
//!
//! [strategy]
//! confirm_bars = 1
//! window = { start = "09:30:00", duration_minutes = 5, bar_minutes = 1 }
//! execution_mode = { type = "MARKET_ON_CLOSE", slippage_points = 0.25 }
//! candidate = { risk_reward_ratio = 1.5, stop_mode = "FULL" }
//!
//! [grid]
//! risk_reward_ratios = [1.0, 1.5, 2.0]
//! stop_modes = ["FULL", "HALF"]
//!
//! [validator]
//! stage2_min_sample = 30
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orblab_core::domain::{InstrumentError, InstrumentSpec, ParamError, StrategyParams};
use orblab_core::engine::CostModel;

use crate::data_loader::DateRange;
use crate::sweep::ParamGrid;
use crate::validator::ValidatorConfig;

/// Unique identifier for a run (content-addressable hash).
pub type RunId = String;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error(transparent)]
    InvalidParameter(#[from] ParamError),
    #[error(transparent)]
    Instrument(#[from] InstrumentError),
}

/// Either a built-in preset name or a full inline spec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InstrumentConfig {
    Preset { preset: String },
    Custom(InstrumentSpec),
}

impl InstrumentConfig {
    pub fn resolve(&self) -> Result<InstrumentSpec, InstrumentError> {
        let spec = match self {
            InstrumentConfig::Preset { preset } => InstrumentSpec::preset(preset)?,
            InstrumentConfig::Custom(spec) => spec.clone(),
        };
        spec.validate()?;
        Ok(spec)
    }
}

/// Complete, reproducible description of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub symbol: String,
    pub instrument: InstrumentConfig,
    /// Restrict loaded sessions; everything the feed has when absent.
    #[serde(default)]
    pub date_range: Option<DateRange>,
    #[serde(default)]
    pub strategy: StrategyParams,
    #[serde(default)]
    pub grid: ParamGrid,
    #[serde(default)]
    pub validator: ValidatorConfig,
}

impl RunConfig {
    /// Default strategy, grid and validator for a preset instrument.
    pub fn for_preset(symbol: &str) -> Self {
        Self {
            symbol: symbol.to_string(),
            instrument: InstrumentConfig::Preset {
                preset: symbol.to_string(),
            },
            date_range: None,
            strategy: StrategyParams::default(),
            grid: ParamGrid::default(),
            validator: ValidatorConfig::default(),
        }
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: RunConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    /// Fail-fast checks, run before any session is simulated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.instrument.resolve()?;
        self.strategy.validate()?;
        self.grid.validate()?;
        self.validator.validate()?;
        if let Some(range) = self.date_range {
            if range.start > range.end {
                return Err(ParamError::Invalid(format!(
                    "date range start {} is after end {}",
                    range.start, range.end
                ))
                .into());
            }
        }
        Ok(())
    }

    pub fn instrument_spec(&self) -> Result<InstrumentSpec, ConfigError> {
        Ok(self.instrument.resolve()?)
    }

    pub fn cost_model(&self) -> Result<CostModel, ConfigError> {
        Ok(CostModel::new(self.instrument_spec()?))
    }

    /// Deterministic hash of the canonical JSON form. Identical configs share
    /// a run id, so exported artifacts can be matched to their inputs.
    pub fn run_id(&self) -> RunId {
        let json = serde_json::to_vec(self).unwrap_or_default();
        blake3::hash(&json).to_hex().to_string()
    }
}
