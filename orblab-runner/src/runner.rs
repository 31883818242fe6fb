//! Engine runner — applies the session simulator across a history.
//!
//! Sessions are independent, so the runner fans out with rayon. `collect()`
//! keeps input order: results come back date-ordered regardless of which
//! worker finished first.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use orblab_core::domain::{ParameterCandidate, Session, StrategyParams, TradeRecord};
use orblab_core::engine::{simulate_session, CostModel, SessionResult};

use crate::metrics::SampleStats;

/// Per-session records of one candidate over a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrades {
    pub candidate: ParameterCandidate,
    pub records: Vec<TradeRecord>,
    pub stats: SampleStats,
}

impl CandidateTrades {
    pub fn run(
        sessions: &[Session],
        base: &StrategyParams,
        candidate: ParameterCandidate,
        cost: &CostModel,
    ) -> Self {
        let records = run_records(sessions, &base.with_candidate(candidate), cost);
        let stats = SampleStats::from_records(&records);
        Self {
            candidate,
            records,
            stats,
        }
    }
}

/// Simulate every session under one parameter set.
pub fn run_engine(
    sessions: &[Session],
    params: &StrategyParams,
    cost: &CostModel,
) -> Vec<SessionResult> {
    sessions
        .par_iter()
        .map(|session| simulate_session(session, params, cost))
        .collect()
}

/// Simulate and flatten straight into persistence records.
pub fn run_records(
    sessions: &[Session],
    params: &StrategyParams,
    cost: &CostModel,
) -> Vec<TradeRecord> {
    run_engine(sessions, params, cost)
        .iter()
        .map(SessionResult::to_record)
        .collect()
}

/// Simulate and reduce to sample statistics.
pub fn evaluate(sessions: &[Session], params: &StrategyParams, cost: &CostModel) -> SampleStats {
    SampleStats::from_records(&run_records(sessions, params, cost))
}
