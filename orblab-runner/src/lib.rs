//! ORB Lab Runner — orchestration, walk-forward validation, export.
//!
//! This crate builds on `orblab-core` to provide:
//! - TOML run configuration with content-addressed run ids
//! - A bar-feed trait with a CSV adapter
//! - Parallel engine runs and sample statistics
//! - Parameter grid search, friction stress and a random-entry control
//! - The three-stage walk-forward validator
//! - A result-sink trait with a CSV/JSON file adapter
//! - `api::execute`, the single entry point used by the CLI

pub mod api;
pub mod config;
pub mod control;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod stress;
pub mod sweep;
pub mod validator;
pub mod walk_forward;

pub use api::{execute, CandidateSet, RunError, RunMode, RunOutput, RunRequest};
pub use config::{ConfigError, InstrumentConfig, RunConfig, RunId};
pub use control::{ControlBaseline, ControlComparison, ControlConfig};
pub use data_loader::{BarFeed, CsvBarFeed, DateRange, LoadError, MemoryFeed};
pub use export::{ExportError, FileSink, ResultSink};
pub use metrics::SampleStats;
pub use runner::{run_engine, run_records, CandidateTrades};
pub use stress::{StressConfig, StressResult};
pub use sweep::{CandidateScore, ParamGrid};
pub use validator::{
    run_validation, AggregateRecord, GateFailure, ValidationReport, ValidationVerdict,
    ValidatorConfig, ValidatorError,
};
pub use walk_forward::{SplitConfig, ValidationSplit};

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate};

    use orblab_core::domain::{Bar, InstrumentSpec, Session};
    use orblab_core::engine::CostModel;

    /// $100 per point, $4 round-trip friction.
    pub fn test_cost() -> CostModel {
        CostModel::new(InstrumentSpec {
            symbol: "TEST".into(),
            tick_size: 0.01,
            tick_value: 1.0,
            point_value: 100.0,
            commission_round_trip: 2.0,
            spread_cost: 1.0,
            slippage_cost: 1.0,
        })
    }

    fn session(day: usize, rows: &[(f64, f64, f64, f64)]) -> Session {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(day as i64);
        let open = date.and_hms_opt(9, 30, 0).unwrap();
        let bars = rows
            .iter()
            .enumerate()
            .map(|(i, &(o, h, l, c))| Bar::new(open + Duration::minutes(i as i64), o, h, l, c))
            .collect();
        Session::new(date, bars)
    }

    /// Range 99.80–100.60 from five bars.
    const RANGE: [(f64, f64, f64, f64); 5] = [
        (100.00, 100.40, 99.90, 100.20),
        (100.20, 100.60, 100.10, 100.50),
        (100.50, 100.55, 99.80, 99.95),
        (99.95, 100.30, 99.85, 100.25),
        (100.25, 100.45, 100.00, 100.40),
    ];

    /// Upside breakout closing at 100.70, then a clean hit of the 1.5R target
    /// (`win`) or of the full stop.
    pub fn breakout_session(day: usize, win: bool) -> Session {
        let mut rows = RANGE.to_vec();
        rows.push((100.50, 100.75, 100.45, 100.70));
        if win {
            rows.extend([
                (100.70, 102.00, 100.60, 101.80),
                (101.80, 102.10, 101.40, 101.50),
                (101.50, 101.70, 101.20, 101.30),
            ]);
        } else {
            rows.extend([
                (100.70, 100.75, 99.00, 99.10),
                (99.10, 99.40, 98.90, 99.20),
                (99.20, 99.50, 99.00, 99.30),
            ]);
        }
        session(day, &rows)
    }

    /// Every post-range close stays inside the range: no signal.
    pub fn flat_session(day: usize) -> Session {
        let mut rows = RANGE.to_vec();
        rows.extend([
            (100.40, 100.55, 100.00, 100.30),
            (100.30, 100.50, 99.90, 100.10),
        ]);
        session(day, &rows)
    }
}
