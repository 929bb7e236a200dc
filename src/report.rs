//! Flat output rows and the CSV/JSON files written after a run.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::profile::{BuildReport, SessionProfile};
use crate::revisit::{
    Direction, EngineCheckpoint, EngineRun, OriginPoc, PendingPoc, PocType, Reaction, RevisitEvent,
    RevisitStatistics,
};

pub const SESSION_PROFILES_FILE: &str = "session_profiles.csv";
pub const ORIGIN_POCS_FILE: &str = "origin_pocs.csv";
pub const REVISIT_EVENTS_FILE: &str = "revisit_events.csv";
pub const NAKED_POCS_FILE: &str = "naked_pocs.csv";
pub const STATISTICS_FILE: &str = "revisit_statistics.json";
pub const FAILURES_FILE: &str = "session_failures.csv";

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Session profile as one CSV row
#[derive(Debug, Clone, Serialize)]
pub struct SessionProfileFlat {
    pub date: String,
    pub session: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub total_volume: f64,
    pub delta: f64,
    pub tick_count: u32,
    pub dropped_ticks: u32,
    pub volume_poc: Option<f64>,
    pub tpo_poc: Option<f64>,
    pub vah: Option<f64>,
    pub val: Option<f64>,
    pub ib_high: Option<f64>,
    pub ib_low: Option<f64>,
    pub poor_high: bool,
    pub poor_high_price: Option<f64>,
    pub poor_low: bool,
    pub poor_low_price: Option<f64>,
    pub single_prints: bool,
    pub single_print_high: Option<f64>,
    pub single_print_low: Option<f64>,
    pub tpo_periods: u32,
}

impl From<&SessionProfile> for SessionProfileFlat {
    fn from(profile: &SessionProfile) -> Self {
        Self {
            date: profile.session_id.date.format("%Y-%m-%d").to_string(),
            session: profile.session_id.name.clone(),
            start: profile.start,
            end: profile.end,
            open: profile.open,
            high: profile.high,
            low: profile.low,
            close: profile.close,
            total_volume: profile.total_volume,
            delta: profile.delta,
            tick_count: profile.tick_count,
            dropped_ticks: profile.dropped_ticks,
            volume_poc: profile.volume_poc_price,
            tpo_poc: profile.tpo_poc_price,
            vah: profile.vah,
            val: profile.val,
            ib_high: profile.ib_high,
            ib_low: profile.ib_low,
            poor_high: profile.poor_high.is_poor,
            poor_high_price: profile.poor_high.price,
            poor_low: profile.poor_low.is_poor,
            poor_low_price: profile.poor_low.price,
            single_prints: profile.single_prints,
            single_print_high: profile.single_print_high,
            single_print_low: profile.single_print_low,
            tpo_periods: profile.tpo_period_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OriginPocFlat {
    pub poc_type: PocType,
    pub origin_session: String,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub price: f64,
    pub origin_close: Option<f64>,
    pub direction: Direction,
    pub distance_from_close: Option<f64>,
    pub revisited_within_session: bool,
}

impl From<&OriginPoc> for OriginPocFlat {
    fn from(origin: &OriginPoc) -> Self {
        Self {
            poc_type: origin.poc_type,
            origin_session: origin.origin_session_id.to_string(),
            session_start: origin.session_start,
            session_end: origin.session_end,
            price: origin.price,
            origin_close: origin.origin_close,
            direction: origin.direction,
            distance_from_close: origin.distance_from_close,
            revisited_within_session: origin.revisited_within_session,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RevisitEventFlat {
    pub poc_type: PocType,
    pub origin_session: String,
    pub price: f64,
    pub revisiting_session: String,
    pub revisit_session_start: DateTime<Utc>,
    pub sessions_elapsed: u64,
    pub minutes_elapsed: f64,
    pub direction: Direction,
    pub max_excursion: f64,
    pub close_offset: f64,
    pub reaction: Reaction,
}

impl From<&RevisitEvent> for RevisitEventFlat {
    fn from(event: &RevisitEvent) -> Self {
        Self {
            poc_type: event.poc_type,
            origin_session: event.origin_session_id.to_string(),
            price: event.price,
            revisiting_session: event.revisiting_session_id.to_string(),
            revisit_session_start: event.revisit_session_start,
            sessions_elapsed: event.sessions_elapsed,
            minutes_elapsed: event.minutes_elapsed,
            direction: event.direction,
            max_excursion: event.max_excursion,
            close_offset: event.close_offset,
            reaction: event.reaction,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NakedPocFlat {
    pub poc_type: PocType,
    pub origin_session: String,
    pub price: f64,
    pub created_at: DateTime<Utc>,
    pub direction: Direction,
}

impl From<&PendingPoc> for NakedPocFlat {
    fn from(poc: &PendingPoc) -> Self {
        Self {
            poc_type: poc.poc_type,
            origin_session: poc.origin_session_id.to_string(),
            price: poc.price,
            created_at: poc.created_at,
            direction: poc.direction,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionFailureFlat {
    pub session: String,
    pub error: String,
}

/// Paths of the files written by one run
#[derive(Debug, Clone, Default)]
pub struct WrittenReports {
    pub files: Vec<PathBuf>,
}

/// Writes run outputs into one directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ReportError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir)?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn write_csv<T, I>(&self, file_name: &str, rows: I) -> Result<PathBuf, ReportError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        let path = self.output_dir.join(file_name);
        let mut writer = csv::Writer::from_path(&path)?;
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        Ok(path)
    }

    pub fn write_profiles(&self, profiles: &[SessionProfile]) -> Result<PathBuf, ReportError> {
        self.write_csv(SESSION_PROFILES_FILE, profiles.iter().map(SessionProfileFlat::from))
    }

    pub fn write_failures(&self, build: &BuildReport) -> Result<PathBuf, ReportError> {
        self.write_csv(
            FAILURES_FILE,
            build.failures.iter().map(|(session_id, error)| SessionFailureFlat {
                session: session_id.to_string(),
                error: error.to_string(),
            }),
        )
    }

    pub fn write_origins(&self, run: &EngineRun) -> Result<PathBuf, ReportError> {
        let rows = PocType::ALL.iter().flat_map(|t| run.by_type(*t).origins.iter().map(OriginPocFlat::from));
        self.write_csv(ORIGIN_POCS_FILE, rows)
    }

    pub fn write_events(&self, run: &EngineRun) -> Result<PathBuf, ReportError> {
        let rows = PocType::ALL.iter().flat_map(|t| run.by_type(*t).events.iter().map(RevisitEventFlat::from));
        self.write_csv(REVISIT_EVENTS_FILE, rows)
    }

    pub fn write_naked(&self, run: &EngineRun) -> Result<PathBuf, ReportError> {
        let rows = PocType::ALL.iter().flat_map(|t| run.by_type(*t).naked.iter().map(NakedPocFlat::from));
        self.write_csv(NAKED_POCS_FILE, rows)
    }

    pub fn write_statistics(&self, run: &EngineRun) -> Result<PathBuf, ReportError> {
        let stats: Vec<&RevisitStatistics> = PocType::ALL.iter().map(|t| &run.by_type(*t).statistics).collect();
        let path = self.output_dir.join(STATISTICS_FILE);
        fs::write(&path, serde_json::to_string_pretty(&stats)?)?;
        Ok(path)
    }

    /// Write every report file for a completed run
    pub fn write_all(&self, build: &BuildReport, run: &EngineRun) -> Result<WrittenReports, ReportError> {
        let files = vec![
            self.write_profiles(&build.profiles)?,
            self.write_failures(build)?,
            self.write_origins(run)?,
            self.write_events(run)?,
            self.write_naked(run)?,
            self.write_statistics(run)?,
        ];
        info!("💾 Wrote {} report files to {}", files.len(), self.output_dir.display());
        Ok(WrittenReports { files })
    }
}

pub fn write_checkpoint(path: &Path, checkpoint: &EngineCheckpoint) -> Result<(), ReportError> {
    fs::write(path, serde_json::to_string_pretty(checkpoint)?)?;
    info!("💾 Tracker checkpoint saved to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{PoorExtreme, SessionId};
    use crate::revisit::RevisitEngine;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn profile(day: u32, low: f64, high: f64, poc: f64) -> SessionProfile {
        let start = Utc.with_ymd_and_hms(2024, 1, day, 7, 0, 0).unwrap();
        SessionProfile {
            session_id: SessionId::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), "London"),
            start,
            end: start + Duration::hours(9),
            open: Some(low),
            high: Some(high),
            low: Some(low),
            close: Some(high),
            total_volume: 12.5,
            delta: -1.5,
            tick_count: 4,
            dropped_ticks: 0,
            volume_poc_price: Some(poc),
            tpo_poc_price: None,
            vah: Some(high),
            val: Some(low),
            ib_high: Some(high),
            ib_low: Some(low),
            poor_high: PoorExtreme::poor(high),
            poor_low: PoorExtreme::default(),
            single_prints: false,
            single_print_high: None,
            single_print_low: None,
            tpo_period_count: 2,
        }
    }

    #[test]
    fn test_write_all_reports() {
        let dir = tempfile::tempdir().unwrap();
        let profiles = vec![profile(2, 90.0, 100.0, 95.0), profile(3, 94.0, 99.0, 97.0)];
        let build = BuildReport { profiles: profiles.clone(), ..BuildReport::default() };
        let run = RevisitEngine::new(0.5, vec![1, 2]).run(&profiles).unwrap();

        let writer = ReportWriter::new(dir.path().join("out")).unwrap();
        let written = writer.write_all(&build, &run).unwrap();
        assert_eq!(written.files.len(), 6);
        assert!(written.files.iter().all(|f| f.exists()));

        let profiles_csv = fs::read_to_string(writer.output_dir().join(SESSION_PROFILES_FILE)).unwrap();
        let mut lines = profiles_csv.lines();
        assert!(lines.next().unwrap().starts_with("date,session,start,end,open"));
        assert!(lines.next().unwrap().starts_with("2024-01-02,London,"));

        let events_csv = fs::read_to_string(writer.output_dir().join(REVISIT_EVENTS_FILE)).unwrap();
        assert_eq!(events_csv.lines().count(), 2);
        assert!(events_csv.contains("volume,2024-01-02_London,95.0,2024-01-03_London"));

        let stats: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(writer.output_dir().join(STATISTICS_FILE)).unwrap()).unwrap();
        assert_eq!(stats[0]["poc_type"], "volume");
        assert_eq!(stats[0]["resolved"], 1);
        assert_eq!(stats[1]["created"], 0);
    }

    #[test]
    fn test_checkpoint_file_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut engine = RevisitEngine::new(0.5, vec![1]);
        engine.run(&[profile(2, 90.0, 100.0, 95.0)]).unwrap();

        let path = dir.path().join("checkpoint.json");
        write_checkpoint(&path, &engine.checkpoint()).unwrap();
        let restored = EngineCheckpoint::from_json(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(restored, engine.checkpoint());
    }
}
