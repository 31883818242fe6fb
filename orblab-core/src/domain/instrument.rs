use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Contract metadata and flat per-contract friction for one instrument.
///
/// Loaded once per run and passed explicitly into every engine call. There is
/// no process-wide registry: `preset()` is a pure constructor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub tick_size: f64,
    pub tick_value: f64,
    /// Dollar value of a one-point move for one contract.
    pub point_value: f64,
    pub commission_round_trip: f64,
    pub spread_cost: f64,
    pub slippage_cost: f64,
}

impl InstrumentSpec {
    /// Built-in specs for the index futures the strategy is usually run on.
    pub fn preset(symbol: &str) -> Result<Self, InstrumentError> {
        let spec = match symbol.to_ascii_uppercase().as_str() {
            "ES" => Self::future("ES", 0.25, 12.50, 50.0, 4.20),
            "MES" => Self::future("MES", 0.25, 1.25, 5.0, 1.24),
            "NQ" => Self::future("NQ", 0.25, 5.00, 20.0, 4.20),
            "MNQ" => Self::future("MNQ", 0.25, 0.50, 2.0, 1.24),
            _ => {
                return Err(InstrumentError::UnknownPreset {
                    symbol: symbol.to_string(),
                })
            }
        };
        Ok(spec)
    }

    pub fn preset_symbols() -> &'static [&'static str] {
        &["ES", "MES", "NQ", "MNQ"]
    }

    /// One tick of spread and one tick of slippage on top of commission.
    fn future(
        symbol: &str,
        tick_size: f64,
        tick_value: f64,
        point_value: f64,
        commission_round_trip: f64,
    ) -> Self {
        Self {
            symbol: symbol.to_string(),
            tick_size,
            tick_value,
            point_value,
            commission_round_trip,
            spread_cost: tick_value,
            slippage_cost: tick_value,
        }
    }

    /// Commission + spread + slippage for one round-trip contract.
    pub fn total_friction(&self) -> f64 {
        self.commission_round_trip + self.spread_cost + self.slippage_cost
    }

    pub fn validate(&self) -> Result<(), InstrumentError> {
        let positive = [
            ("tick_size", self.tick_size),
            ("tick_value", self.tick_value),
            ("point_value", self.point_value),
        ];
        for (field, value) in positive {
            if !(value > 0.0) {
                return Err(InstrumentError::NonPositive { field, value });
            }
        }
        let costs = [
            ("commission_round_trip", self.commission_round_trip),
            ("spread_cost", self.spread_cost),
            ("slippage_cost", self.slippage_cost),
        ];
        for (field, value) in costs {
            if !(value >= 0.0) {
                return Err(InstrumentError::NegativeCost { field, value });
            }
        }
        let implied = self.tick_value / self.tick_size;
        if (implied - self.point_value).abs() > 1e-6 * self.point_value {
            return Err(InstrumentError::InconsistentTickValue {
                tick_size: self.tick_size,
                tick_value: self.tick_value,
                point_value: self.point_value,
            });
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum InstrumentError {
    #[error("unknown instrument preset '{symbol}'")]
    UnknownPreset { symbol: String },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must not be negative, got {value}")]
    NegativeCost { field: &'static str, value: f64 },

    #[error("tick_value {tick_value} / tick_size {tick_size} does not match point_value {point_value}")]
    InconsistentTickValue {
        tick_size: f64,
        tick_value: f64,
        point_value: f64,
    },
}
