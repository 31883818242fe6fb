//! Integration tests for the walk-forward validator.
//!
//! Synthetic histories with a known shape: a trending history where every
//! breakout runs far past any target, a regime change where the test window
//! reverses, and a seeded random walk used only for reproducibility checks.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use orblab_core::domain::{Bar, InstrumentSpec, Session, StopMode, StrategyParams};
use orblab_core::engine::CostModel;
use orblab_runner::walk_forward::split_sessions;
use orblab_runner::{run_validation, ParamGrid, SplitConfig, ValidatorConfig};

// ── Fixtures ─────────────────────────────────────────────────────────

fn cost() -> CostModel {
    CostModel::new(InstrumentSpec {
        symbol: "SYN".into(),
        tick_size: 0.01,
        tick_value: 1.0,
        point_value: 100.0,
        commission_round_trip: 2.0,
        spread_cost: 1.0,
        slippage_cost: 1.0,
    })
}

fn build(day: usize, rows: &[(f64, f64, f64, f64)]) -> Session {
    let date = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap() + Duration::days(day as i64);
    let open = date.and_hms_opt(9, 30, 0).unwrap();
    let bars = rows
        .iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar::new(open + Duration::minutes(i as i64), o, h, l, c))
        .collect();
    Session::new(date, bars)
}

/// Range 99.80–100.60 and an upside breakout close at 100.70 (bar 5).
fn opening() -> Vec<(f64, f64, f64, f64)> {
    vec![
        (100.00, 100.40, 99.90, 100.20),
        (100.20, 100.60, 100.10, 100.50),
        (100.50, 100.55, 99.80, 99.95),
        (99.95, 100.30, 99.85, 100.25),
        (100.25, 100.45, 100.00, 100.40),
        (100.50, 100.75, 100.45, 100.70),
    ]
}

/// Breakout followed by fifteen bars climbing 0.40 each.
fn rally(day: usize) -> Session {
    let mut rows = opening();
    let mut close = 100.70;
    for _ in 0..15 {
        let open = close;
        close += 0.40;
        rows.push((open, close + 0.10, open - 0.10, close));
    }
    build(day, &rows)
}

/// Breakout that immediately collapses through the range low.
fn reversal(day: usize) -> Session {
    let mut rows = opening();
    rows.extend([
        (100.70, 100.72, 99.40, 99.50),
        (99.50, 99.60, 99.00, 99.10),
        (99.10, 99.20, 98.70, 98.80),
    ]);
    build(day, &rows)
}

fn random_walk(day: usize, rng: &mut StdRng) -> Session {
    let mut price: f64 = 100.0;
    let rows: Vec<(f64, f64, f64, f64)> = (0..60)
        .map(|_| {
            let open = price;
            let close = open + rng.gen_range(-0.5..0.5);
            price = close;
            (
                open,
                open.max(close) + rng.gen_range(0.0..0.3),
                open.min(close) - rng.gen_range(0.0..0.3),
                close,
            )
        })
        .collect();
    build(day, &rows)
}

// ── Pipeline ─────────────────────────────────────────────────────────

#[test]
fn persistent_edge_passes_every_gate() {
    let sessions: Vec<Session> = (0..100).map(rally).collect();
    let report = run_validation(
        &sessions,
        &StrategyParams::default(),
        &ParamGrid::default(),
        &cost(),
        &ValidatorConfig::default(),
    )
    .unwrap();
    let verdict = &report.verdict;

    assert!(verdict.stage1_pass);
    assert_eq!(report.stage1.sample_size, 20);

    // Every target is reached, so the widest full-stop target has the best
    // realized expectancy.
    let selected = verdict.stage2_optimal_candidate.unwrap();
    assert_eq!(selected.risk_reward_ratio, 3.0);
    assert_eq!(selected.stop_mode, StopMode::Full);

    assert!(verdict.degradation_pct.unwrap().abs() < 1e-9);
    assert!(verdict.stage3_test_expectancy.unwrap() > 2.0);
    assert_eq!(verdict.stress_pass, Some(true));
    let control = verdict.control_comparison_result.unwrap();
    assert!(control.passed, "control comparison: {control:?}");
    assert!(verdict.gate_failures.is_empty(), "{:?}", verdict.gate_failures);
    assert!(verdict.passed);

    let aggregates = report.aggregates();
    assert_eq!(aggregates.len(), ParamGrid::default().size());
    assert_eq!(aggregates.iter().filter(|a| a.stage2_optimal).count(), 1);
    let optimal = aggregates.iter().find(|a| a.stage2_optimal).unwrap();
    assert_eq!(optimal.stage3_pass, Some(true));
    assert_eq!(optimal.control_verdict.as_deref(), Some("BEATS_CONTROL"));
}

#[test]
fn regime_change_fails_out_of_sample() {
    let sessions: Vec<Session> = (0..100)
        .map(|day| if day < 80 { rally(day) } else { reversal(day) })
        .collect();
    let report = run_validation(
        &sessions,
        &StrategyParams::default(),
        &ParamGrid::default(),
        &cost(),
        &ValidatorConfig::default(),
    )
    .unwrap();
    let verdict = &report.verdict;

    assert!(verdict.stage1_pass);
    assert!(verdict.stage2_optimal_candidate.is_some());
    assert_eq!(verdict.stage3_test_expectancy, Some(-1.0));
    assert!(!verdict.passed);

    let gates: Vec<&str> = verdict.gate_failures.iter().map(|f| f.gate()).collect();
    assert!(gates.contains(&"Stage3Expectancy"));
    assert!(gates.contains(&"Stage3Degradation"));
    assert!(gates.contains(&"StressTest"));
    assert!(gates.contains(&"ControlComparison"));
}

#[test]
fn validation_is_reproducible() {
    let mut rng = StdRng::seed_from_u64(11);
    let sessions: Vec<Session> = (0..60).map(|day| random_walk(day, &mut rng)).collect();
    let config = ValidatorConfig {
        stage1_min_sample: 1,
        stage1_min_expectancy: f64::NEG_INFINITY,
        stage2_min_sample: 1,
        ..Default::default()
    };
    let run = || {
        run_validation(
            &sessions,
            &StrategyParams::default(),
            &ParamGrid::default(),
            &cost(),
            &config,
        )
        .unwrap()
    };
    let first = run();
    for _ in 0..3 {
        assert_eq!(run(), first);
    }
}

// ── Split properties ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn split_windows_are_disjoint_and_ordered(n in 3usize..400) {
        let sessions: Vec<Session> = (0..n).map(|day| build(day, &[])).collect();
        let (split, windows) = split_sessions(&sessions, &SplitConfig::default()).unwrap();
        prop_assert_eq!(
            windows.train.len() + windows.validation.len() + windows.test.len(),
            n
        );
        prop_assert!(!windows.train.is_empty());
        prop_assert!(!windows.validation.is_empty());
        prop_assert!(!windows.test.is_empty());
        prop_assert!(split.train.end < split.validation.start);
        prop_assert!(split.validation.end < split.test.start);
    }
}
