//! Friction stress test — rerun a window with inflated per-contract costs.
//!
//! Each multiplier scales the whole friction figure (commission, spread and
//! slippage together). The gate and realized RR are recomputed under the
//! inflated figure, so a trade that cleared the gate at base cost can be
//! rejected under stress.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use orblab_core::domain::{ParamError, Session, StrategyParams};
use orblab_core::engine::CostModel;

use crate::metrics::SampleStats;
use crate::runner::evaluate;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StressConfig {
    pub friction_multipliers: Vec<f64>,
}

impl Default for StressConfig {
    fn default() -> Self {
        Self {
            friction_multipliers: vec![1.25, 1.50],
        }
    }
}

impl StressConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.friction_multipliers.is_empty() {
            return Err(ParamError::Invalid("no stress multipliers configured".into()));
        }
        if let Some(&bad) = self
            .friction_multipliers
            .iter()
            .find(|&&m| !(m >= 1.0) || !m.is_finite())
        {
            return Err(ParamError::Invalid(format!(
                "stress multiplier must be at least 1.0, got {bad}"
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StressRun {
    pub friction_multiplier: f64,
    pub stats: SampleStats,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressResult {
    pub runs: Vec<StressRun>,
    /// At least one inflated run kept positive expectancy.
    pub passed: bool,
}

pub fn run_stress(
    sessions: &[Session],
    params: &StrategyParams,
    cost: &CostModel,
    config: &StressConfig,
) -> StressResult {
    let runs: Vec<StressRun> = config
        .friction_multipliers
        .par_iter()
        .map(|&friction_multiplier| StressRun {
            friction_multiplier,
            stats: evaluate(
                sessions,
                params,
                &cost.with_friction_multiplier(friction_multiplier),
            ),
        })
        .collect();
    let passed = runs
        .iter()
        .any(|run| run.stats.sample_size > 0 && run.stats.expectancy_r > 0.0);
    StressResult { runs, passed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{breakout_session, test_cost};

    #[test]
    fn inflated_friction_lowers_expectancy() {
        let sessions: Vec<Session> = (0..20).map(|i| breakout_session(i, i % 4 != 0)).collect();
        let params = StrategyParams::default();
        let cost = test_cost();
        let base = evaluate(&sessions, &params, &cost);
        let result = run_stress(&sessions, &params, &cost, &StressConfig::default());

        assert_eq!(result.runs.len(), 2);
        assert_eq!(result.runs[0].friction_multiplier, 1.25);
        assert!(result.runs[0].stats.expectancy_r < base.expectancy_r);
        assert!(result.runs[1].stats.expectancy_r < result.runs[0].stats.expectancy_r);
        assert!(result.passed);
    }

    #[test]
    fn all_losers_fail_stress() {
        let sessions: Vec<Session> = (0..10).map(|i| breakout_session(i, false)).collect();
        let result = run_stress(
            &sessions,
            &StrategyParams::default(),
            &test_cost(),
            &StressConfig::default(),
        );
        assert!(!result.passed);
    }

    #[test]
    fn multipliers_below_one_are_invalid() {
        let config = StressConfig {
            friction_multipliers: vec![0.8],
        };
        assert!(config.validate().is_err());
        StressConfig::default().validate().unwrap();
    }
}
