//! Random-entry control baseline.
//!
//! A control run enters at a random post-range bar of a random session, in a
//! random direction, and manages the trade exactly like the strategy would:
//! same stop/target structure, same size filter, same cost model. Runs draw
//! until they hold as many counted trades as the candidate did (or the
//! attempt budget runs out), and the baseline is the mean over all runs.
//!
//! Each run gets its own RNG from the seed hierarchy, so the baseline is
//! reproducible and independent of thread scheduling.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use orblab_core::domain::{Direction, ParamError, Session, StrategyParams, TradeRecord};
use orblab_core::engine::{compute_opening_range, simulate_forced_entry, CostModel, ForcedEntry};
use orblab_core::rng::RngHierarchy;

use crate::metrics::SampleStats;

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Number of independent random-entry runs averaged into the baseline.
    pub runs: usize,
    pub seed: u64,
    /// Required win-rate edge over the baseline (absolute, 0.05 = 5 points).
    pub min_win_rate_margin: f64,
    /// Required expectancy edge over the baseline, in R.
    pub min_expectancy_edge: f64,
    /// Draw budget per requested trade before a run gives up.
    pub max_attempts_per_trade: usize,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            runs: 20,
            seed: 42,
            min_win_rate_margin: 0.05,
            min_expectancy_edge: 0.15,
            max_attempts_per_trade: 20,
        }
    }
}

impl ControlConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        if self.runs == 0 || self.max_attempts_per_trade == 0 {
            return Err(ParamError::Invalid(
                "control runs and attempt budget must be positive".into(),
            ));
        }
        Ok(())
    }
}

// ─── Result types ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlBaseline {
    pub runs: Vec<SampleStats>,
    pub mean: SampleStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlComparison {
    pub candidate_win_rate: f64,
    pub control_win_rate: f64,
    pub candidate_expectancy_r: f64,
    pub control_expectancy_r: f64,
    pub control_sample_size: usize,
    pub passed: bool,
}

impl ControlComparison {
    pub fn win_rate_edge(&self) -> f64 {
        self.candidate_win_rate - self.control_win_rate
    }

    pub fn expectancy_edge(&self) -> f64 {
        self.candidate_expectancy_r - self.control_expectancy_r
    }
}

// ─── Baseline generation ─────────────────────────────────────────────

/// Session index and the half-open bar span a random entry may use.
#[derive(Debug, Clone, Copy)]
struct EntrySlot {
    session: usize,
    first_bar: usize,
    end_bar: usize,
}

fn entry_slots(sessions: &[Session], params: &StrategyParams) -> Vec<EntrySlot> {
    sessions
        .iter()
        .enumerate()
        .filter_map(|(i, session)| {
            let range = compute_opening_range(&session.bars, &params.window).ok()?;
            let accepted = params
                .candidate
                .size_filter
                .map_or(true, |f| f.accepts(range.size));
            (accepted && range.next_index < session.len()).then_some(EntrySlot {
                session: i,
                first_bar: range.next_index,
                end_bar: session.len(),
            })
        })
        .collect()
}

/// Build the random-entry baseline for `target_sample` counted trades.
pub fn generate_control(
    sessions: &[Session],
    params: &StrategyParams,
    cost: &CostModel,
    target_sample: usize,
    config: &ControlConfig,
) -> ControlBaseline {
    let slots = entry_slots(sessions, params);
    if slots.is_empty() || target_sample == 0 {
        return ControlBaseline {
            runs: Vec::new(),
            mean: SampleStats::default(),
        };
    }

    let hierarchy = RngHierarchy::new(config.seed);
    let budget = target_sample.saturating_mul(config.max_attempts_per_trade);

    let runs: Vec<SampleStats> = (0..config.runs)
        .into_par_iter()
        .map(|run| {
            let mut rng = hierarchy.rng_for("control", run as u64);
            let mut counted: Vec<TradeRecord> = Vec::with_capacity(target_sample);
            let mut attempts = 0;
            while counted.len() < target_sample && attempts < budget {
                attempts += 1;
                let slot = slots[rng.gen_range(0..slots.len())];
                let entry = ForcedEntry {
                    bar_index: rng.gen_range(slot.first_bar..slot.end_bar),
                    direction: if rng.gen_bool(0.5) {
                        Direction::Up
                    } else {
                        Direction::Down
                    },
                };
                let record =
                    simulate_forced_entry(&sessions[slot.session], params, cost, entry).to_record();
                if record.counts_toward_aggregates() {
                    counted.push(record);
                }
            }
            if counted.len() < target_sample {
                debug!(run, drawn = counted.len(), target_sample, "control run hit attempt budget");
            }
            SampleStats::from_records(&counted)
        })
        .collect();

    let mean = SampleStats::mean_of(&runs);
    ControlBaseline { runs, mean }
}

/// Candidate versus baseline. Fails when the baseline holds no trades.
pub fn compare_to_control(
    candidate: &SampleStats,
    baseline: &ControlBaseline,
    config: &ControlConfig,
) -> ControlComparison {
    let mut comparison = ControlComparison {
        candidate_win_rate: candidate.win_rate,
        control_win_rate: baseline.mean.win_rate,
        candidate_expectancy_r: candidate.expectancy_r,
        control_expectancy_r: baseline.mean.expectancy_r,
        control_sample_size: baseline.mean.sample_size,
        passed: false,
    };
    comparison.passed = baseline.mean.sample_size > 0
        && comparison.win_rate_edge() >= config.min_win_rate_margin
        && comparison.expectancy_edge() >= config.min_expectancy_edge;
    comparison
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{breakout_session, flat_session, test_cost};

    fn history() -> Vec<Session> {
        (0..30).map(|i| breakout_session(i, i % 2 == 0)).collect()
    }

    #[test]
    fn baseline_is_reproducible() {
        let sessions = history();
        let config = ControlConfig::default();
        let params = StrategyParams::default();
        let a = generate_control(&sessions, &params, &test_cost(), 15, &config);
        let b = generate_control(&sessions, &params, &test_cost(), 15, &config);
        assert_eq!(a, b);
        assert_eq!(a.runs.len(), config.runs);
    }

    #[test]
    fn seed_changes_baseline() {
        let sessions = history();
        let params = StrategyParams::default();
        let a = generate_control(&sessions, &params, &test_cost(), 15, &ControlConfig::default());
        let b = generate_control(
            &sessions,
            &params,
            &test_cost(),
            15,
            &ControlConfig {
                seed: 7,
                ..Default::default()
            },
        );
        assert_ne!(a.runs, b.runs);
    }

    #[test]
    fn runs_stop_at_target_sample() {
        let sessions = history();
        let baseline = generate_control(
            &sessions,
            &StrategyParams::default(),
            &test_cost(),
            10,
            &ControlConfig::default(),
        );
        for run in &baseline.runs {
            assert!(run.sample_size <= 10);
        }
    }

    #[test]
    fn no_eligible_sessions_gives_empty_baseline() {
        let sessions: Vec<Session> = (0..5)
            .map(|i| Session::new(flat_session(i).date, Vec::new()))
            .collect();
        let baseline = generate_control(
            &sessions,
            &StrategyParams::default(),
            &test_cost(),
            10,
            &ControlConfig::default(),
        );
        assert!(baseline.runs.is_empty());
        let comparison = compare_to_control(
            &SampleStats {
                sample_size: 10,
                win_rate: 0.9,
                expectancy_r: 1.0,
                ..Default::default()
            },
            &baseline,
            &ControlConfig::default(),
        );
        assert!(!comparison.passed);
    }

    #[test]
    fn comparison_requires_both_edges() {
        let config = ControlConfig::default();
        let baseline = ControlBaseline {
            runs: Vec::new(),
            mean: SampleStats {
                sample_size: 30,
                win_rate: 0.40,
                expectancy_r: 0.0,
                ..Default::default()
            },
        };
        let strong = SampleStats {
            win_rate: 0.50,
            expectancy_r: 0.20,
            ..Default::default()
        };
        assert!(compare_to_control(&strong, &baseline, &config).passed);

        let thin_win_rate = SampleStats {
            win_rate: 0.43,
            ..strong
        };
        assert!(!compare_to_control(&thin_win_rate, &baseline, &config).passed);

        let thin_expectancy = SampleStats {
            expectancy_r: 0.10,
            ..strong
        };
        assert!(!compare_to_control(&thin_expectancy, &baseline, &config).passed);
    }
}
