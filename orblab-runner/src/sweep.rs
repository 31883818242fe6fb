//! Parameter grid search over the ORB knob set.
//!
//! The grid is the Cartesian product of risk/reward ratios, stop modes and
//! optional range-size filters. Candidates are evaluated in parallel; results
//! keep grid order so ties break the same way on every run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use orblab_core::domain::{ParamError, ParameterCandidate, Session, SizeFilter, StopMode, StrategyParams};
use orblab_core::engine::CostModel;

use crate::metrics::SampleStats;
use crate::runner::evaluate;

/// Parameter grid specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParamGrid {
    pub risk_reward_ratios: Vec<f64>,
    pub stop_modes: Vec<StopMode>,
    /// An empty filter (both bounds open) means "no size filter".
    pub size_filters: Vec<SizeFilter>,
}

impl Default for ParamGrid {
    /// 1.0–3.0R in half steps, both stop modes, unfiltered.
    fn default() -> Self {
        Self {
            risk_reward_ratios: vec![1.0, 1.5, 2.0, 2.5, 3.0],
            stop_modes: vec![StopMode::Full, StopMode::Half],
            size_filters: vec![SizeFilter::default()],
        }
    }
}

impl ParamGrid {
    /// Grid holding exactly one candidate.
    pub fn single(candidate: ParameterCandidate) -> Self {
        Self {
            risk_reward_ratios: vec![candidate.risk_reward_ratio],
            stop_modes: vec![candidate.stop_mode],
            size_filters: vec![candidate.size_filter.unwrap_or_default()],
        }
    }

    /// Total number of candidates in this grid.
    pub fn size(&self) -> usize {
        self.risk_reward_ratios.len() * self.stop_modes.len() * self.size_filters.len()
    }

    /// All candidates, rr-major.
    pub fn candidates(&self) -> Vec<ParameterCandidate> {
        let mut candidates = Vec::with_capacity(self.size());
        for &rr in &self.risk_reward_ratios {
            for &stop_mode in &self.stop_modes {
                for &filter in &self.size_filters {
                    let candidate = ParameterCandidate::new(rr, stop_mode);
                    candidates.push(if filter == SizeFilter::default() {
                        candidate
                    } else {
                        candidate.with_size_filter(filter)
                    });
                }
            }
        }
        candidates
    }

    pub fn validate(&self) -> Result<(), ParamError> {
        if self.size() == 0 {
            return Err(ParamError::Invalid(
                "parameter grid has an empty axis".into(),
            ));
        }
        self.candidates().iter().try_for_each(ParameterCandidate::validate)
    }
}

/// One candidate's statistics over one window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    pub candidate: ParameterCandidate,
    pub stats: SampleStats,
}

/// Evaluate every grid candidate over `sessions`.
pub fn evaluate_grid(
    sessions: &[Session],
    base: &StrategyParams,
    grid: &ParamGrid,
    cost: &CostModel,
) -> Vec<CandidateScore> {
    grid.candidates()
        .par_iter()
        .map(|&candidate| CandidateScore {
            candidate,
            stats: evaluate(sessions, &base.with_candidate(candidate), cost),
        })
        .collect()
}

/// Highest-expectancy candidate among those with at least `min_sample` trades.
/// Ties keep the earlier grid position.
pub fn select_best(scores: &[CandidateScore], min_sample: usize) -> Option<&CandidateScore> {
    scores
        .iter()
        .filter(|score| score.stats.sample_size >= min_sample)
        .fold(None, |best: Option<&CandidateScore>, score| match best {
            Some(b) if b.stats.expectancy_r >= score.stats.expectancy_r => Some(b),
            _ => Some(score),
        })
}
