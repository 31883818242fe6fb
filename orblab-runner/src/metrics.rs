//! Sample statistics — pure reductions over per-session trade records.
//!
//! Only resolved trades that passed the cost gate count toward win rate and
//! expectancy. Everything else is tallied separately so a report can show why
//! a sample is small.

use serde::{Deserialize, Serialize};

use orblab_core::domain::{Outcome, SkipReason, TradeRecord};

/// Aggregate statistics for one candidate over one window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SampleStats {
    /// Resolved, gate-passing trades.
    pub sample_size: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    /// Mean realized R per counted trade.
    pub expectancy_r: f64,
    pub total_r: f64,
    pub sessions: usize,
    pub no_signal: usize,
    pub no_fill: usize,
    /// Range-data, size-filter and cost-gate skips.
    pub skipped: usize,
    pub cost_gated: usize,
    /// Open at the close; marked to market but not counted.
    pub unresolved: usize,
}

impl SampleStats {
    pub fn from_records(records: &[TradeRecord]) -> Self {
        let mut stats = Self {
            sessions: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.outcome {
                Outcome::NoSignal => stats.no_signal += 1,
                Outcome::NoFill => stats.no_fill += 1,
                Outcome::Skipped(reason) => {
                    stats.skipped += 1;
                    if reason == SkipReason::CostGate {
                        stats.cost_gated += 1;
                    }
                }
                Outcome::Unresolved => stats.unresolved += 1,
                Outcome::Win | Outcome::Loss => {}
            }
            if !record.counts_toward_aggregates() {
                continue;
            }
            stats.sample_size += 1;
            match record.outcome {
                Outcome::Win => stats.wins += 1,
                _ => stats.losses += 1,
            }
            stats.total_r += record.realized_r.unwrap_or(0.0);
        }
        if stats.sample_size > 0 {
            let n = stats.sample_size as f64;
            stats.win_rate = stats.wins as f64 / n;
            stats.expectancy_r = stats.total_r / n;
        }
        stats
    }

    /// Mean of several runs' win rate and expectancy, sample sizes summed.
    pub fn mean_of(runs: &[SampleStats]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }
        let n = runs.len() as f64;
        let mut mean = Self::default();
        for run in runs {
            mean.sample_size += run.sample_size;
            mean.wins += run.wins;
            mean.losses += run.losses;
            mean.total_r += run.total_r;
            mean.sessions += run.sessions;
            mean.win_rate += run.win_rate / n;
            mean.expectancy_r += run.expectancy_r / n;
        }
        mean
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(outcome: Outcome, r: Option<f64>, gate: Option<bool>) -> TradeRecord {
        let mut record = TradeRecord::no_trade(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), outcome);
        record.realized_r = r;
        record.passes_cost_gate = gate;
        record
    }

    #[test]
    fn only_counted_trades_enter_expectancy() {
        let records = vec![
            record(Outcome::Win, Some(1.4), Some(true)),
            record(Outcome::Loss, Some(-1.0), Some(true)),
            record(Outcome::Win, Some(1.4), Some(true)),
            record(Outcome::Unresolved, Some(0.3), Some(true)),
            record(Outcome::Skipped(SkipReason::CostGate), None, Some(false)),
            record(Outcome::NoSignal, None, None),
            record(Outcome::NoFill, None, None),
        ];
        let stats = SampleStats::from_records(&records);
        assert_eq!(stats.sessions, 7);
        assert_eq!(stats.sample_size, 3);
        assert_eq!(stats.wins, 2);
        assert_eq!(stats.losses, 1);
        assert!((stats.win_rate - 2.0 / 3.0).abs() < 1e-12);
        assert!((stats.expectancy_r - 1.8 / 3.0).abs() < 1e-12);
        assert_eq!(stats.unresolved, 1);
        assert_eq!(stats.cost_gated, 1);
        assert_eq!(stats.skipped, 1);
        assert_eq!(stats.no_signal, 1);
        assert_eq!(stats.no_fill, 1);
    }

    #[test]
    fn empty_sample_has_zero_expectancy() {
        let stats = SampleStats::from_records(&[record(Outcome::NoSignal, None, None)]);
        assert_eq!(stats.sample_size, 0);
        assert_eq!(stats.expectancy_r, 0.0);
        assert_eq!(stats.win_rate, 0.0);
    }

    #[test]
    fn mean_of_runs() {
        let a = SampleStats {
            sample_size: 10,
            win_rate: 0.4,
            expectancy_r: 0.1,
            ..Default::default()
        };
        let b = SampleStats {
            sample_size: 10,
            win_rate: 0.6,
            expectancy_r: -0.1,
            ..Default::default()
        };
        let mean = SampleStats::mean_of(&[a, b]);
        assert!((mean.win_rate - 0.5).abs() < 1e-12);
        assert!(mean.expectancy_r.abs() < 1e-12);
        assert_eq!(mean.sample_size, 20);
        assert_eq!(SampleStats::mean_of(&[]), SampleStats::default());
    }
}
