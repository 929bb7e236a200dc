use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rayon::prelude::*;
use serde::de::IgnoredAny;
use serde::Deserialize;
use tracing::{info, warn};

use super::errors::IngestError;
use crate::profile::Tick;

const NAIVE_TIMESTAMP_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// One headerless row: `timestamp,open,high,low,close,volume,trades,bid_volume,ask_volume`
///
/// Only the close price is used; the bar's open, high, low and trade count are
/// positional placeholders and are not validated.
#[derive(Debug, Clone, Deserialize)]
pub struct TickRow {
    pub timestamp: String,
    _open: IgnoredAny,
    _high: IgnoredAny,
    _low: IgnoredAny,
    pub close: f64,
    pub volume: f64,
    _trades: IgnoredAny,
    pub bid_volume: f64,
    pub ask_volume: f64,
}

impl TickRow {
    /// The tick trades at the row's close
    pub fn into_tick(self) -> Result<Tick, IngestError> {
        let timestamp = parse_timestamp(&self.timestamp)?;
        Ok(Tick::new(timestamp, self.close, self.volume, self.bid_volume, self.ask_volume))
    }
}

/// Ticks loaded from one file, sorted by timestamp
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub ticks: Vec<Tick>,
    /// Rows that failed to parse
    pub skipped_rows: u64,
}

/// Parse a UTC timestamp, naive (`2024-01-02 07:00:00`) or RFC3339
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, IngestError> {
    let raw = raw.trim();
    for format in NAIVE_TIMESTAMP_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| IngestError::InvalidTimestamp(raw.to_string()))
}

/// Parse tick rows from CSV bytes.
///
/// A leading header line starting with `Timestamp` is skipped. Malformed rows
/// are counted and skipped rather than failing the whole file.
pub fn parse_ticks_csv(csv_data: &[u8]) -> Result<LoadReport, IngestError> {
    let has_header = csv_data.len() > 9 && csv_data[..9].eq_ignore_ascii_case(b"timestamp");
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_reader(csv_data);

    let mut report = LoadReport::default();
    let rows = reader.deserialize::<TickRow>().enumerate().skip(usize::from(has_header));
    for (line, record) in rows {
        match record.map_err(IngestError::from).and_then(TickRow::into_tick) {
            Ok(tick) => report.ticks.push(tick),
            Err(e) => {
                if report.skipped_rows < 10 {
                    warn!(row = line + 1, error = %e, "Skipping malformed tick row");
                }
                report.skipped_rows += 1;
            }
        }
    }

    if report.ticks.is_empty() {
        return Err(IngestError::NoData("No ticks parsed".to_string()));
    }

    report.ticks.par_sort_by_key(|t| t.timestamp);
    Ok(report)
}

pub fn load_ticks_csv(path: &Path) -> Result<LoadReport, IngestError> {
    let csv_data = std::fs::read(path)?;
    let report = parse_ticks_csv(&csv_data)?;
    info!(
        "📂 Loaded {} ticks from {} ({} rows skipped)",
        report.ticks.len(),
        path.display(),
        report.skipped_rows
    );
    Ok(report)
}
