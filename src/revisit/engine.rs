use serde::{Deserialize, Serialize};
use tracing::info;

use super::errors::TrackerError;
use super::statistics::RevisitStatistics;
use super::structs::{OriginPoc, PendingPoc, PocType, RevisitEvent};
use super::tracker::{PocRevisitTracker, TrackerCheckpoint};
use crate::config::AnalysisConfig;
use crate::profile::SessionProfile;

/// Saved state of both trackers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineCheckpoint {
    pub volume: TrackerCheckpoint,
    pub tpo: TrackerCheckpoint,
}

impl EngineCheckpoint {
    pub fn to_json(&self) -> Result<String, TrackerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TrackerError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Output of one tracker over a batch of sessions
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerRun {
    pub poc_type: PocType,
    pub origins: Vec<OriginPoc>,
    pub events: Vec<RevisitEvent>,
    /// Still pending after the batch
    pub naked: Vec<PendingPoc>,
    pub statistics: RevisitStatistics,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineRun {
    pub volume: TrackerRun,
    pub tpo: TrackerRun,
}

impl EngineRun {
    pub fn by_type(&self, poc_type: PocType) -> &TrackerRun {
        match poc_type {
            PocType::Volume => &self.volume,
            PocType::Tpo => &self.tpo,
        }
    }
}

/// Drives the Volume and TPO trackers over the same chronological profiles
#[derive(Debug, Clone)]
pub struct RevisitEngine {
    volume: PocRevisitTracker,
    tpo: PocRevisitTracker,
    latency_buckets: Vec<u32>,
}

impl RevisitEngine {
    pub fn new(tolerance: f64, latency_buckets: Vec<u32>) -> Self {
        Self {
            volume: PocRevisitTracker::new(PocType::Volume, tolerance),
            tpo: PocRevisitTracker::new(PocType::Tpo, tolerance),
            latency_buckets,
        }
    }

    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self::new(config.tolerance(), config.revisit.latency_buckets.clone())
    }

    pub fn resume(checkpoint: EngineCheckpoint, latency_buckets: Vec<u32>) -> Result<Self, TrackerError> {
        Ok(Self {
            volume: PocRevisitTracker::resume(PocType::Volume, checkpoint.volume)?,
            tpo: PocRevisitTracker::resume(PocType::Tpo, checkpoint.tpo)?,
            latency_buckets,
        })
    }

    /// Feed chronologically ordered profiles to both trackers.
    ///
    /// The two trackers share no state and run concurrently; each stays
    /// strictly sequential over the sessions.
    pub fn run(&mut self, profiles: &[SessionProfile]) -> Result<EngineRun, TrackerError> {
        let buckets = &self.latency_buckets;
        let (volume, tpo) = rayon::join(
            || run_tracker(&mut self.volume, profiles, buckets),
            || run_tracker(&mut self.tpo, profiles, buckets),
        );
        let run = EngineRun { volume: volume?, tpo: tpo? };

        for tracker_run in [&run.volume, &run.tpo] {
            let stats = &tracker_run.statistics;
            info!(
                "🎯 {} POCs: {} created, {} revisited, {} naked (rate {:.1}%)",
                tracker_run.poc_type,
                stats.created,
                stats.resolved,
                stats.naked,
                stats.revisit_rate.unwrap_or(0.0) * 100.0
            );
        }

        Ok(run)
    }

    pub fn checkpoint(&self) -> EngineCheckpoint {
        EngineCheckpoint {
            volume: self.volume.checkpoint(),
            tpo: self.tpo.checkpoint(),
        }
    }

    pub fn tracker(&self, poc_type: PocType) -> &PocRevisitTracker {
        match poc_type {
            PocType::Volume => &self.volume,
            PocType::Tpo => &self.tpo,
        }
    }
}

fn run_tracker(
    tracker: &mut PocRevisitTracker,
    profiles: &[SessionProfile],
    latency_buckets: &[u32],
) -> Result<TrackerRun, TrackerError> {
    let mut origins = Vec::new();
    let mut events = Vec::new();
    for profile in profiles {
        let outcome = tracker.process(profile)?;
        events.extend(outcome.events);
        origins.extend(outcome.origin);
    }

    Ok(TrackerRun {
        poc_type: tracker.poc_type(),
        origins,
        events,
        naked: tracker.naked(),
        statistics: tracker.statistics(latency_buckets),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{PoorExtreme, SessionId};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn profile(day: u32, low: f64, high: f64, volume_poc: Option<f64>, tpo_poc: Option<f64>) -> SessionProfile {
        let start = Utc.with_ymd_and_hms(2024, 2, day, 0, 0, 0).unwrap();
        SessionProfile {
            session_id: SessionId::new(NaiveDate::from_ymd_opt(2024, 2, day).unwrap(), "Asia"),
            start,
            end: start + Duration::hours(9),
            open: Some(low),
            high: Some(high),
            low: Some(low),
            close: Some(high),
            total_volume: 1.0,
            delta: 0.0,
            tick_count: 1,
            dropped_ticks: 0,
            volume_poc_price: volume_poc,
            tpo_poc_price: tpo_poc,
            vah: None,
            val: None,
            ib_high: None,
            ib_low: None,
            poor_high: PoorExtreme::default(),
            poor_low: PoorExtreme::default(),
            single_prints: false,
            single_print_high: None,
            single_print_low: None,
            tpo_period_count: 1,
        }
    }

    #[test]
    fn test_poc_types_are_tracked_independently() {
        let profiles = vec![
            profile(1, 90.0, 100.0, Some(95.0), Some(91.0)),
            profile(2, 93.0, 97.0, Some(94.0), Some(96.0)),
        ];
        let mut engine = RevisitEngine::new(0.0, vec![1, 2]);
        let run = engine.run(&profiles).unwrap();

        assert_eq!(run.volume.events.len(), 1);
        assert_eq!(run.volume.events[0].price, 95.0);
        assert!(run.tpo.events.is_empty());
        assert_eq!(run.tpo.naked.len(), 2);
        assert_eq!(run.by_type(PocType::Volume).origins.len(), 2);
        assert_eq!(run.volume.statistics.created, 2);
        assert_eq!(run.volume.statistics.resolved, 1);
    }

    #[test]
    fn test_out_of_order_aborts_run() {
        let profiles = vec![
            profile(2, 90.0, 100.0, Some(95.0), Some(95.0)),
            profile(1, 90.0, 100.0, Some(95.0), Some(95.0)),
        ];
        let mut engine = RevisitEngine::new(0.0, vec![1]);
        assert!(matches!(engine.run(&profiles), Err(TrackerError::OutOfOrder { .. })));
    }

    #[test]
    fn test_checkpoint_json_resume() {
        let profiles: Vec<SessionProfile> = (1..=6)
            .map(|day| {
                let base = 90.0 + f64::from(day % 3) * 10.0;
                profile(day, base, base + 8.0, Some(base + 4.0), Some(base + 2.0))
            })
            .collect();

        let mut full = RevisitEngine::new(0.5, vec![1, 2, 3]);
        let expected = full.run(&profiles).unwrap();

        let mut partial = RevisitEngine::new(0.5, vec![1, 2, 3]);
        let head = partial.run(&profiles[..3]).unwrap();
        let json = partial.checkpoint().to_json().unwrap();
        let mut resumed = RevisitEngine::resume(EngineCheckpoint::from_json(&json).unwrap(), vec![1, 2, 3]).unwrap();
        let tail = resumed.run(&profiles[3..]).unwrap();

        let mut events = head.volume.events.clone();
        events.extend(tail.volume.events.clone());
        assert_eq!(events, expected.volume.events);
        assert_eq!(tail.tpo.naked, expected.tpo.naked);
        assert_eq!(tail.volume.statistics, expected.volume.statistics);
        assert_eq!(resumed.checkpoint(), full.checkpoint());
    }
}
