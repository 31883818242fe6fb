//! Bar feed interface and the CSV adapter.
//!
//! The engine consumes ordered, de-duplicated sessions. The feed never
//! forward-fills: a missing minute stays missing, and the engine decides what
//! a gap means (an incomplete opening-range window skips the day).
//!
//! CSV layout: a header row with at least `timestamp,open,high,low,close`
//! (extra columns such as `volume` are ignored). Timestamps are session-local,
//! `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use orblab_core::domain::{Bar, Session};

/// Inclusive calendar date interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Whole calendar, for "load everything".
    pub fn unbounded() -> Self {
        Self {
            start: NaiveDate::MIN,
            end: NaiveDate::MAX,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

/// Errors from the bar feed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open bar file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} line {line}: unparseable timestamp '{value}'")]
    Timestamp {
        path: PathBuf,
        line: u64,
        value: String,
    },

    #[error("{path} line {line}: timestamp {timestamp} is not after the previous bar")]
    OutOfOrder {
        path: PathBuf,
        line: u64,
        timestamp: NaiveDateTime,
    },

    #[error("{path} line {line}: inconsistent OHLC values")]
    InvalidBar { path: PathBuf, line: u64 },
}

/// Source of ordered intraday sessions for one instrument.
pub trait BarFeed: Send + Sync {
    /// Sessions for `symbol` whose dates fall inside `range`, oldest first.
    fn load_sessions(&self, symbol: &str, range: &DateRange) -> Result<Vec<Session>, LoadError>;
}

/// Reads `<dir>/<SYMBOL>.csv`, or one fixed file regardless of symbol.
#[derive(Debug, Clone)]
pub struct CsvBarFeed {
    source: CsvSource,
}

#[derive(Debug, Clone)]
enum CsvSource {
    Directory(PathBuf),
    File(PathBuf),
}

impl CsvBarFeed {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            source: CsvSource::Directory(dir.into()),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            source: CsvSource::File(path.into()),
        }
    }

    fn path_for(&self, symbol: &str) -> PathBuf {
        match &self.source {
            CsvSource::Directory(dir) => dir.join(format!("{}.csv", symbol.to_ascii_uppercase())),
            CsvSource::File(path) => path.clone(),
        }
    }
}

impl BarFeed for CsvBarFeed {
    fn load_sessions(&self, symbol: &str, range: &DateRange) -> Result<Vec<Session>, LoadError> {
        let path = self.path_for(symbol);
        let bars = read_bars(&path)?;
        let sessions: Vec<Session> = group_sessions(bars)
            .into_iter()
            .filter(|s| range.contains(s.date))
            .collect();
        debug!(symbol, path = %path.display(), sessions = sessions.len(), "loaded sessions");
        Ok(sessions)
    }
}

/// Sessions already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    sessions: Vec<Session>,
}

impl MemoryFeed {
    pub fn new(mut sessions: Vec<Session>) -> Self {
        sessions.sort_by_key(|s| s.date);
        Self { sessions }
    }
}

impl BarFeed for MemoryFeed {
    fn load_sessions(&self, _symbol: &str, range: &DateRange) -> Result<Vec<Session>, LoadError> {
        Ok(self
            .sessions
            .iter()
            .filter(|s| range.contains(s.date))
            .cloned()
            .collect())
    }
}

#[derive(Debug, Deserialize)]
struct CsvRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];
    let value = value.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}

/// Read and validate every bar in a CSV file.
pub fn read_bars(path: &Path) -> Result<Vec<Bar>, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);

    let mut bars: Vec<Bar> = Vec::new();
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        // Header is line 1.
        let line = i as u64 + 2;
        let row = row.map_err(|source| LoadError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
        let timestamp = parse_timestamp(&row.timestamp).ok_or_else(|| LoadError::Timestamp {
            path: path.to_path_buf(),
            line,
            value: row.timestamp.clone(),
        })?;

        let bar = Bar::new(timestamp, row.open, row.high, row.low, row.close);
        if !bar.is_sane() {
            warn!(path = %path.display(), line, "rejecting inconsistent bar");
            return Err(LoadError::InvalidBar {
                path: path.to_path_buf(),
                line,
            });
        }
        if let Some(prev) = bars.last() {
            if bar.timestamp <= prev.timestamp {
                return Err(LoadError::OutOfOrder {
                    path: path.to_path_buf(),
                    line,
                    timestamp: bar.timestamp,
                });
            }
        }
        bars.push(bar);
    }
    Ok(bars)
}

/// Group ordered bars into per-date sessions, oldest first.
pub fn group_sessions(bars: Vec<Bar>) -> Vec<Session> {
    let mut by_date: BTreeMap<NaiveDate, Vec<Bar>> = BTreeMap::new();
    for bar in bars {
        by_date.entry(bar.timestamp.date()).or_default().push(bar);
    }
    by_date
        .into_iter()
        .map(|(date, bars)| Session::new(date, bars))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn reads_and_groups_by_date() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(
            dir.path(),
            "ES.csv",
            "timestamp,open,high,low,close,volume\n\
             2024-03-04 09:30:00,100,101,99,100.5,10\n\
             2024-03-04 09:31:00,100.5,101.5,100,101,12\n\
             2024-03-05T09:30:00,101,102,100.5,101.5,9\n",
        );
        let feed = CsvBarFeed::from_dir(dir.path());
        let sessions = feed.load_sessions("es", &DateRange::unbounded()).unwrap();
        assert_eq!(sessions.len(), 2);
        assert_eq!(sessions[0].len(), 2);
        assert_eq!(sessions[1].len(), 1);
        assert_eq!(sessions[1].date, NaiveDate::from_ymd_opt(2024, 3, 5).unwrap());
    }

    #[test]
    fn date_range_filters_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "bars.csv",
            "timestamp,open,high,low,close\n\
             2024-03-04 09:30:00,100,101,99,100.5\n\
             2024-03-05 09:30:00,101,102,100.5,101.5\n\
             2024-03-06 09:30:00,101,102,100.5,101.5\n",
        );
        let feed = CsvBarFeed::from_file(path);
        let range = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 6).unwrap(),
        );
        let sessions = feed.load_sessions("ANY", &range).unwrap();
        assert_eq!(sessions.len(), 2);
    }

    #[test]
    fn duplicate_timestamp_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "dup.csv",
            "timestamp,open,high,low,close\n\
             2024-03-04 09:30:00,100,101,99,100.5\n\
             2024-03-04 09:30:00,100,101,99,100.5\n",
        );
        let err = read_bars(&path).unwrap_err();
        assert!(matches!(err, LoadError::OutOfOrder { line: 3, .. }));
    }

    #[test]
    fn insane_bar_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "bad.csv",
            "timestamp,open,high,low,close\n2024-03-04 09:30:00,100,99,101,100\n",
        );
        assert!(matches!(
            read_bars(&path).unwrap_err(),
            LoadError::InvalidBar { line: 2, .. }
        ));
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            dir.path(),
            "ts.csv",
            "timestamp,open,high,low,close\nyesterday,100,101,99,100\n",
        );
        assert!(matches!(
            read_bars(&path).unwrap_err(),
            LoadError::Timestamp { .. }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let feed = CsvBarFeed::from_dir("/nonexistent/orblab");
        assert!(matches!(
            feed.load_sessions("ES", &DateRange::unbounded()),
            Err(LoadError::Io { .. })
        ));
    }

    #[test]
    fn gaps_are_not_filled() {
        let bars = vec![
            Bar::new(
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(9, 30, 0).unwrap(),
                100.0,
                101.0,
                99.0,
                100.0,
            ),
            Bar::new(
                NaiveDate::from_ymd_opt(2024, 3, 4).unwrap().and_hms_opt(9, 33, 0).unwrap(),
                100.0,
                101.0,
                99.0,
                100.0,
            ),
        ];
        let sessions = group_sessions(bars);
        assert_eq!(sessions[0].len(), 2);
    }
}
