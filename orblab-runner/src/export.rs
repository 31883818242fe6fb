//! Result export — the persistence seam and its file adapter.
//!
//! `FileSink` writes into one output directory:
//! - `trades.csv` — one row per (candidate, session)
//! - `aggregates.csv` — one row per evaluated candidate
//! - `verdict.json` — the full validation report, pretty-printed

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use orblab_core::domain::{Direction, TradeRecord};

use crate::runner::CandidateTrades;
use crate::validator::{AggregateRecord, ValidationReport};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Destination for run results.
pub trait ResultSink {
    fn write_trades(&self, batches: &[CandidateTrades]) -> Result<(), ExportError>;
    fn write_aggregates(&self, rows: &[AggregateRecord]) -> Result<(), ExportError>;
    fn write_verdict(&self, report: &ValidationReport) -> Result<(), ExportError>;
}

/// Flat CSV shape of a `TradeRecord`.
#[derive(Debug, Serialize)]
struct TradeRow<'a> {
    candidate: &'a str,
    date: NaiveDate,
    outcome: &'static str,
    direction: Option<Direction>,
    entry_timestamp: Option<NaiveDateTime>,
    entry_price: Option<f64>,
    stop_price: Option<f64>,
    target_price: Option<f64>,
    exit_timestamp: Option<NaiveDateTime>,
    exit_price: Option<f64>,
    mae_points: Option<f64>,
    mfe_points: Option<f64>,
    theoretical_rr: Option<f64>,
    realized_rr: Option<f64>,
    realized_r: Option<f64>,
    passes_cost_gate: Option<bool>,
}

impl<'a> TradeRow<'a> {
    fn new(candidate: &'a str, r: &TradeRecord) -> Self {
        Self {
            candidate,
            date: r.date,
            outcome: r.outcome.label(),
            direction: r.direction,
            entry_timestamp: r.entry_timestamp,
            entry_price: r.entry_price,
            stop_price: r.stop_price,
            target_price: r.target_price,
            exit_timestamp: r.exit_timestamp,
            exit_price: r.exit_price,
            mae_points: r.mae_points,
            mfe_points: r.mfe_points,
            theoretical_rr: r.theoretical_rr,
            realized_rr: r.realized_rr,
            realized_r: r.realized_r,
            passes_cost_gate: r.passes_cost_gate,
        }
    }
}

/// Writes CSV and JSON artifacts into a directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| ExportError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn trades_path(&self) -> PathBuf {
        self.dir.join("trades.csv")
    }

    pub fn aggregates_path(&self) -> PathBuf {
        self.dir.join("aggregates.csv")
    }

    pub fn verdict_path(&self) -> PathBuf {
        self.dir.join("verdict.json")
    }

    fn create(path: &Path) -> Result<BufWriter<File>, ExportError> {
        File::create(path)
            .map(BufWriter::new)
            .map_err(|source| ExportError::Io {
                path: path.to_path_buf(),
                source,
            })
    }
}

impl ResultSink for FileSink {
    fn write_trades(&self, batches: &[CandidateTrades]) -> Result<(), ExportError> {
        let path = self.trades_path();
        let mut writer = csv::Writer::from_writer(Self::create(&path)?);
        let mut rows = 0usize;
        for batch in batches {
            let label = batch.candidate.label();
            for record in &batch.records {
                writer.serialize(TradeRow::new(&label, record))?;
                rows += 1;
            }
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), rows, "wrote trades");
        Ok(())
    }

    fn write_aggregates(&self, rows: &[AggregateRecord]) -> Result<(), ExportError> {
        let path = self.aggregates_path();
        let mut writer = csv::Writer::from_writer(Self::create(&path)?);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush().map_err(|source| ExportError::Io {
            path: path.clone(),
            source,
        })?;
        info!(path = %path.display(), rows = rows.len(), "wrote aggregates");
        Ok(())
    }

    fn write_verdict(&self, report: &ValidationReport) -> Result<(), ExportError> {
        let path = self.verdict_path();
        let mut writer = Self::create(&path)?;
        serde_json::to_writer_pretty(&mut writer, report)?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|source| ExportError::Io {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), passed = report.verdict.passed, "wrote verdict");
        Ok(())
    }
}
