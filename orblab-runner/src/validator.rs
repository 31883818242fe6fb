//! Three-stage walk-forward validator.
//!
//! - **Stage 1 (Concept):** the default candidate on the validation window.
//! - **Stage 2 (Optimization):** grid search on the train window only.
//! - **Stage 3 (Out-of-sample):** the selected candidate on the untouched
//!   test window, checked for absolute expectancy and train→test degradation.
//!
//! A selected candidate is additionally stress-tested at inflated friction
//! and compared against a random-entry control baseline, both on the test
//! window. Every failed gate is named in the verdict with a reason; the
//! candidate passes only when none failed.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use orblab_core::domain::{ParamError, ParameterCandidate, Session, StopMode, StrategyParams};
use orblab_core::engine::CostModel;

use crate::control::{compare_to_control, generate_control, ControlBaseline, ControlComparison, ControlConfig};
use crate::metrics::SampleStats;
use crate::runner::evaluate;
use crate::stress::{run_stress, StressConfig, StressResult};
use crate::sweep::{evaluate_grid, select_best, CandidateScore, ParamGrid};
use crate::walk_forward::{degradation, split_sessions, SplitConfig, ValidationSplit, WalkForwardError};

// ─── Configuration ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    pub split: SplitConfig,
    /// Minimum validation-window expectancy for the concept check (R).
    pub stage1_min_expectancy: f64,
    pub stage1_min_sample: usize,
    /// Minimum train-window sample for a grid candidate to be selectable.
    pub stage2_min_sample: usize,
    /// Minimum test-window expectancy (R).
    pub stage3_min_expectancy: f64,
    /// Largest tolerated `1 − test/train` (fraction).
    pub max_degradation: f64,
    pub stress: StressConfig,
    pub control: ControlConfig,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            split: SplitConfig::default(),
            stage1_min_expectancy: 0.10,
            stage1_min_sample: 20,
            stage2_min_sample: 30,
            stage3_min_expectancy: 0.15,
            max_degradation: 0.50,
            stress: StressConfig::default(),
            control: ControlConfig::default(),
        }
    }
}

impl ValidatorConfig {
    pub fn validate(&self) -> Result<(), ParamError> {
        self.split.validate()?;
        self.stress.validate()?;
        self.control.validate()?;
        if !(self.max_degradation >= 0.0) {
            return Err(ParamError::Invalid(format!(
                "max_degradation must be non-negative, got {}",
                self.max_degradation
            )));
        }
        Ok(())
    }
}

// ─── Result types ────────────────────────────────────────────────────

/// A gate the candidate did not clear, with a human-readable reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gate")]
pub enum GateFailure {
    Stage1Concept { reason: String },
    /// No grid candidate reached the minimum train sample.
    Stage2Sample { reason: String },
    Stage3Expectancy { reason: String },
    Stage3Degradation { reason: String },
    StressTest { reason: String },
    ControlComparison { reason: String },
}

impl GateFailure {
    pub fn gate(&self) -> &'static str {
        match self {
            GateFailure::Stage1Concept { .. } => "Stage1Concept",
            GateFailure::Stage2Sample { .. } => "Stage2Sample",
            GateFailure::Stage3Expectancy { .. } => "Stage3Expectancy",
            GateFailure::Stage3Degradation { .. } => "Stage3Degradation",
            GateFailure::StressTest { .. } => "StressTest",
            GateFailure::ControlComparison { .. } => "ControlComparison",
        }
    }

    pub fn reason(&self) -> &str {
        match self {
            GateFailure::Stage1Concept { reason }
            | GateFailure::Stage2Sample { reason }
            | GateFailure::Stage3Expectancy { reason }
            | GateFailure::Stage3Degradation { reason }
            | GateFailure::StressTest { reason }
            | GateFailure::ControlComparison { reason } => reason,
        }
    }
}

/// Final decision for one `(instrument, grid)` validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    pub stage1_pass: bool,
    pub stage2_optimal_candidate: Option<ParameterCandidate>,
    pub stage3_test_expectancy: Option<f64>,
    /// `100 × (1 − test/train)`; `None` when not computed or undefined.
    pub degradation_pct: Option<f64>,
    pub stress_pass: Option<bool>,
    pub control_comparison_result: Option<ControlComparison>,
    pub gate_failures: Vec<GateFailure>,
    pub passed: bool,
}

/// Verdict plus the evidence behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub split: ValidationSplit,
    pub default_candidate: ParameterCandidate,
    /// Default candidate on the validation window.
    pub stage1: SampleStats,
    /// Every grid candidate on the train window, grid order. Empty when
    /// Stage 1 failed.
    pub train_scores: Vec<CandidateScore>,
    pub selected: Option<CandidateScore>,
    /// Selected candidate on the test window.
    pub test: Option<SampleStats>,
    pub stress: Option<StressResult>,
    pub control: Option<ControlBaseline>,
    pub verdict: ValidationVerdict,
}

/// Per-candidate row of the aggregate export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub parameter_candidate: String,
    pub risk_reward_ratio: f64,
    pub stop_mode: StopMode,
    pub min_range_points: Option<f64>,
    pub max_range_points: Option<f64>,
    pub sample_size: usize,
    pub win_rate: f64,
    pub expectancy_r: f64,
    pub stage1_pass: bool,
    pub stage2_optimal: bool,
    pub stage3_pass: Option<bool>,
    pub degradation_pct: Option<f64>,
    pub stress_pass: Option<bool>,
    pub control_verdict: Option<String>,
}

impl ValidationReport {
    /// One row per evaluated candidate. Sample figures are train-window
    /// figures; the out-of-sample columns are filled only for the selected
    /// candidate. When Stage 1 failed, the single row is the default
    /// candidate's validation-window result.
    pub fn aggregates(&self) -> Vec<AggregateRecord> {
        let verdict = &self.verdict;
        if self.train_scores.is_empty() {
            return vec![aggregate_row(&self.default_candidate, &self.stage1, verdict.stage1_pass)];
        }
        let stage3_pass = !verdict.gate_failures.iter().any(|f| {
            matches!(
                f,
                GateFailure::Stage3Expectancy { .. } | GateFailure::Stage3Degradation { .. }
            )
        });
        self.train_scores
            .iter()
            .map(|score| {
                let mut row = aggregate_row(&score.candidate, &score.stats, verdict.stage1_pass);
                if verdict.stage2_optimal_candidate == Some(score.candidate) {
                    row.stage2_optimal = true;
                    row.stage3_pass = Some(stage3_pass);
                    row.degradation_pct = verdict.degradation_pct;
                    row.stress_pass = verdict.stress_pass;
                    row.control_verdict = verdict
                        .control_comparison_result
                        .map(|c| if c.passed { "BEATS_CONTROL" } else { "FAILS_CONTROL" }.to_string());
                }
                row
            })
            .collect()
    }
}

fn aggregate_row(candidate: &ParameterCandidate, stats: &SampleStats, stage1_pass: bool) -> AggregateRecord {
    let filter = candidate.size_filter.unwrap_or_default();
    AggregateRecord {
        parameter_candidate: candidate.label(),
        risk_reward_ratio: candidate.risk_reward_ratio,
        stop_mode: candidate.stop_mode,
        min_range_points: filter.min_points,
        max_range_points: filter.max_points,
        sample_size: stats.sample_size,
        win_rate: stats.win_rate,
        expectancy_r: stats.expectancy_r,
        stage1_pass,
        stage2_optimal: false,
        stage3_pass: None,
        degradation_pct: None,
        stress_pass: None,
        control_verdict: None,
    }
}

#[derive(Debug, Error)]
pub enum ValidatorError {
    #[error(transparent)]
    WalkForward(#[from] WalkForwardError),
    #[error(transparent)]
    InvalidParameter(#[from] ParamError),
}

// ─── Gate checks ─────────────────────────────────────────────────────

/// Stage 1 gate. `None` when the concept holds.
pub fn check_stage1(stats: &SampleStats, config: &ValidatorConfig) -> Option<GateFailure> {
    if stats.sample_size < config.stage1_min_sample {
        return Some(GateFailure::Stage1Concept {
            reason: format!(
                "insufficient sample: {} trades < {} on the validation window",
                stats.sample_size, config.stage1_min_sample
            ),
        });
    }
    if stats.expectancy_r < config.stage1_min_expectancy {
        return Some(GateFailure::Stage1Concept {
            reason: format!(
                "validation expectancy {:+.3}R < {:+.3}R",
                stats.expectancy_r, config.stage1_min_expectancy
            ),
        });
    }
    None
}

/// Stage 3 gates: absolute test expectancy and train→test degradation.
/// Returns the degradation fraction (if defined) and any failures.
pub fn check_stage3(
    train_expectancy: f64,
    test_expectancy: f64,
    config: &ValidatorConfig,
) -> (Option<f64>, Vec<GateFailure>) {
    let mut failures = Vec::new();
    if test_expectancy < config.stage3_min_expectancy {
        failures.push(GateFailure::Stage3Expectancy {
            reason: format!(
                "test expectancy {test_expectancy:+.3}R < {:+.3}R",
                config.stage3_min_expectancy
            ),
        });
    }
    let drop = degradation(train_expectancy, test_expectancy);
    match drop {
        Some(d) if d > config.max_degradation => failures.push(GateFailure::Stage3Degradation {
            reason: format!(
                "degradation {:.1}% > {:.1}%",
                d * 100.0,
                config.max_degradation * 100.0
            ),
        }),
        Some(_) => {}
        None => failures.push(GateFailure::Stage3Degradation {
            reason: format!(
                "train expectancy {train_expectancy:+.3}R is not positive; degradation undefined"
            ),
        }),
    }
    (drop, failures)
}

// ─── Orchestration ───────────────────────────────────────────────────

/// Run the full validation pipeline over date-ordered sessions.
///
/// `base` supplies the window, confirmation and execution mode shared by all
/// candidates; `base.candidate` is the Stage 1 default.
pub fn run_validation(
    sessions: &[Session],
    base: &StrategyParams,
    grid: &ParamGrid,
    cost: &CostModel,
    config: &ValidatorConfig,
) -> Result<ValidationReport, ValidatorError> {
    base.validate()?;
    grid.validate()?;
    config.validate()?;

    let (split, windows) = split_sessions(sessions, &config.split)?;
    info!(
        train = windows.train.len(),
        validation = windows.validation.len(),
        test = windows.test.len(),
        "walk-forward split"
    );

    let mut verdict = ValidationVerdict {
        stage1_pass: false,
        stage2_optimal_candidate: None,
        stage3_test_expectancy: None,
        degradation_pct: None,
        stress_pass: None,
        control_comparison_result: None,
        gate_failures: Vec::new(),
        passed: false,
    };

    // ── Stage 1: concept ──
    let stage1 = evaluate(windows.validation, base, cost);
    info!(
        candidate = %base.candidate.label(),
        sample = stage1.sample_size,
        expectancy_r = stage1.expectancy_r,
        "stage 1 (validation window)"
    );
    let mut report = ValidationReport {
        split,
        default_candidate: base.candidate,
        stage1,
        train_scores: Vec::new(),
        selected: None,
        test: None,
        stress: None,
        control: None,
        verdict: verdict.clone(),
    };
    if let Some(failure) = check_stage1(&stage1, config) {
        return Ok(finish(report, verdict, vec![failure]));
    }
    verdict.stage1_pass = true;

    // ── Stage 2: optimization (train only) ──
    let train_scores = evaluate_grid(windows.train, base, grid, cost);
    let selected = select_best(&train_scores, config.stage2_min_sample).copied();
    report.train_scores = train_scores;
    let Some(selected) = selected else {
        let best_sample = report
            .train_scores
            .iter()
            .map(|s| s.stats.sample_size)
            .max()
            .unwrap_or(0);
        let failure = GateFailure::Stage2Sample {
            reason: format!(
                "insufficient sample: no candidate reached {} train trades (best had {best_sample})",
                config.stage2_min_sample
            ),
        };
        return Ok(finish(report, verdict, vec![failure]));
    };
    info!(
        candidate = %selected.candidate.label(),
        sample = selected.stats.sample_size,
        expectancy_r = selected.stats.expectancy_r,
        "stage 2 selected candidate (train window)"
    );
    verdict.stage2_optimal_candidate = Some(selected.candidate);
    report.selected = Some(selected);

    // ── Stage 3: out-of-sample ──
    let params = base.with_candidate(selected.candidate);
    let test = evaluate(windows.test, &params, cost);
    let (drop, mut failures) = check_stage3(selected.stats.expectancy_r, test.expectancy_r, config);
    info!(
        sample = test.sample_size,
        expectancy_r = test.expectancy_r,
        degradation = ?drop,
        "stage 3 (test window)"
    );
    verdict.stage3_test_expectancy = Some(test.expectancy_r);
    verdict.degradation_pct = drop.map(|d| d * 100.0);
    report.test = Some(test);

    // ── Stress ──
    let stress = run_stress(windows.test, &params, cost, &config.stress);
    if !stress.passed {
        failures.push(GateFailure::StressTest {
            reason: format!(
                "expectancy not positive at any friction multiplier {:?}",
                config.stress.friction_multipliers
            ),
        });
    }
    verdict.stress_pass = Some(stress.passed);
    report.stress = Some(stress);

    // ── Control ──
    let baseline = generate_control(windows.test, &params, cost, test.sample_size, &config.control);
    let comparison = compare_to_control(&test, &baseline, &config.control);
    if !comparison.passed {
        failures.push(GateFailure::ControlComparison {
            reason: control_failure_reason(&test, &baseline, &comparison, &config.control),
        });
    }
    verdict.control_comparison_result = Some(comparison);
    report.control = Some(baseline);

    Ok(finish(report, verdict, failures))
}

fn control_failure_reason(
    test: &SampleStats,
    baseline: &ControlBaseline,
    comparison: &ControlComparison,
    config: &ControlConfig,
) -> String {
    if test.sample_size == 0 {
        return "test window has no counted trades (sample 0); nothing to match a control against"
            .to_string();
    }
    if baseline.mean.sample_size == 0 {
        return format!(
            "control baseline produced no trades for a target sample of {}",
            test.sample_size
        );
    }
    format!(
        "win rate edge {:+.3} (need {:+.3}), expectancy edge {:+.3}R (need {:+.3}R)",
        comparison.win_rate_edge(),
        config.min_win_rate_margin,
        comparison.expectancy_edge(),
        config.min_expectancy_edge
    )
}

fn finish(
    mut report: ValidationReport,
    mut verdict: ValidationVerdict,
    failures: Vec<GateFailure>,
) -> ValidationReport {
    for failure in &failures {
        warn!(gate = failure.gate(), reason = failure.reason(), "gate failed");
    }
    verdict.gate_failures = failures;
    verdict.passed = verdict.gate_failures.is_empty();
    info!(passed = verdict.passed, "validation verdict");
    report.verdict = verdict;
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{breakout_session, flat_session, test_cost};

    #[test]
    fn scenario_e_stage3_passes_with_modest_degradation() {
        let (drop, failures) = check_stage3(0.48, 0.32, &ValidatorConfig::default());
        assert!((drop.unwrap() - 1.0 / 3.0).abs() < 1e-9);
        assert!(failures.is_empty());
    }

    #[test]
    fn scenario_e_stage3_fails_on_heavy_degradation() {
        let (drop, failures) = check_stage3(0.52, 0.05, &ValidatorConfig::default());
        assert!((drop.unwrap() - 0.904).abs() < 1e-3);
        let gates: Vec<&str> = failures.iter().map(GateFailure::gate).collect();
        assert_eq!(gates, vec!["Stage3Expectancy", "Stage3Degradation"]);
    }

    #[test]
    fn non_positive_train_expectancy_fails_degradation() {
        let (drop, failures) = check_stage3(-0.05, 0.40, &ValidatorConfig::default());
        assert!(drop.is_none());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].gate(), "Stage3Degradation");
    }

    #[test]
    fn stage1_checks_sample_then_expectancy() {
        let config = ValidatorConfig::default();
        let small = SampleStats {
            sample_size: 12,
            expectancy_r: 0.5,
            ..Default::default()
        };
        assert!(check_stage1(&small, &config).unwrap().reason().contains("insufficient sample"));

        let weak = SampleStats {
            sample_size: 25,
            expectancy_r: 0.05,
            ..Default::default()
        };
        assert!(check_stage1(&weak, &config).is_some());

        let good = SampleStats {
            sample_size: 25,
            expectancy_r: 0.10,
            ..Default::default()
        };
        assert!(check_stage1(&good, &config).is_none());
    }

    #[test]
    fn stage1_failure_skips_later_stages() {
        let sessions: Vec<Session> = (0..50).map(flat_session).collect();
        let report = run_validation(
            &sessions,
            &StrategyParams::default(),
            &ParamGrid::default(),
            &test_cost(),
            &ValidatorConfig::default(),
        )
        .unwrap();
        assert!(!report.verdict.passed);
        assert!(!report.verdict.stage1_pass);
        assert!(report.train_scores.is_empty());
        assert!(report.verdict.stage2_optimal_candidate.is_none());
        assert_eq!(report.verdict.gate_failures.len(), 1);
        assert_eq!(report.verdict.gate_failures[0].gate(), "Stage1Concept");
        assert_eq!(report.aggregates().len(), 1);
    }

    #[test]
    fn empty_test_window_is_named_in_control_failure() {
        // 80 winning sessions, then 20 sessions that never break out.
        let sessions: Vec<Session> = (0..100)
            .map(|i| if i < 80 { breakout_session(i, true) } else { flat_session(i) })
            .collect();
        let report = run_validation(
            &sessions,
            &StrategyParams::default(),
            &ParamGrid::default(),
            &test_cost(),
            &ValidatorConfig::default(),
        )
        .unwrap();
        assert_eq!(report.test.unwrap().sample_size, 0);
        let control = report
            .verdict
            .gate_failures
            .iter()
            .find(|f| f.gate() == "ControlComparison")
            .unwrap();
        assert!(control.reason().contains("test window has no counted trades"));
    }

    #[test]
    fn stage2_sample_failure_is_named() {
        // Every session wins: Stage 1 passes on 20 validation sessions, but
        // the 60-session train window cannot reach a 100-trade minimum.
        let sessions: Vec<Session> = (0..100).map(|i| breakout_session(i, true)).collect();
        let config = ValidatorConfig {
            stage2_min_sample: 100,
            ..Default::default()
        };
        let report = run_validation(
            &sessions,
            &StrategyParams::default(),
            &ParamGrid::single(Default::default()),
            &test_cost(),
            &config,
        )
        .unwrap();
        assert!(report.verdict.stage1_pass);
        assert_eq!(report.verdict.gate_failures.len(), 1);
        assert_eq!(report.verdict.gate_failures[0].gate(), "Stage2Sample");
        assert!(report.test.is_none());
    }

    #[test]
    fn invalid_grid_fails_fast() {
        let sessions: Vec<Session> = (0..10).map(flat_session).collect();
        let grid = ParamGrid {
            risk_reward_ratios: vec![],
            ..Default::default()
        };
        let err = run_validation(
            &sessions,
            &StrategyParams::default(),
            &grid,
            &test_cost(),
            &ValidatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidParameter(_)));
    }

    #[test]
    fn tiny_history_is_an_error() {
        let sessions: Vec<Session> = (0..2).map(flat_session).collect();
        let err = run_validation(
            &sessions,
            &StrategyParams::default(),
            &ParamGrid::default(),
            &test_cost(),
            &ValidatorConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ValidatorError::WalkForward(_)));
    }
}
