use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::errors::TrackerError;
use super::pending::PendingSet;
use super::statistics::{RevisitStatistics, StatisticsAccumulator};
use super::structs::{Direction, OriginPoc, PendingPoc, PocType, RevisitEvent};
use crate::profile::SessionProfile;

/// Everything needed to resume a tracker after a fully processed session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerCheckpoint {
    pub poc_type: PocType,
    pub tolerance: f64,
    pub pending: PendingSet,
    pub session_index: u64,
    pub last_start: Option<DateTime<Utc>>,
    pub statistics: StatisticsAccumulator,
}

/// Result of feeding one session to a tracker
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionOutcome {
    /// Earlier POCs resolved by this session, oldest first
    pub events: Vec<RevisitEvent>,
    /// The session's own POC of the tracked type, if it has one
    pub origin: Option<OriginPoc>,
}

/// Sequential revisit state machine for one POC type.
///
/// Sessions must arrive in strictly increasing `start` order.
#[derive(Debug, Clone)]
pub struct PocRevisitTracker {
    poc_type: PocType,
    tolerance: f64,
    pending: PendingSet,
    /// Index the next session will receive
    session_index: u64,
    last_start: Option<DateTime<Utc>>,
    statistics: StatisticsAccumulator,
}

impl PocRevisitTracker {
    pub fn new(poc_type: PocType, tolerance: f64) -> Self {
        Self {
            poc_type,
            tolerance,
            pending: PendingSet::new(),
            session_index: 0,
            last_start: None,
            statistics: StatisticsAccumulator::default(),
        }
    }

    pub fn poc_type(&self) -> PocType {
        self.poc_type
    }

    pub fn sessions_processed(&self) -> u64 {
        self.session_index
    }

    pub fn process(&mut self, profile: &SessionProfile) -> Result<SessionOutcome, TrackerError> {
        if let Some(previous_start) = self.last_start {
            if profile.start <= previous_start {
                return Err(TrackerError::OutOfOrder {
                    session_id: profile.session_id.clone(),
                    start: profile.start,
                    previous_start,
                });
            }
        }

        let index = self.session_index;
        let pending = std::mem::take(&mut self.pending);
        let (pending, events) = pending.resolve_against(profile, index, self.tolerance);
        self.pending = pending;

        for event in &events {
            debug!(
                poc_type = %event.poc_type,
                origin = %event.origin_session_id,
                revisited_by = %event.revisiting_session_id,
                price = event.price,
                sessions_elapsed = event.sessions_elapsed,
                minutes_elapsed = event.minutes_elapsed,
                "POC revisited"
            );
            self.statistics.record_event(event);
        }

        let origin = self.poc_type.price_of(profile).map(|price| {
            let direction = Direction::from_close(price, profile.close);
            let revisited_within_session = profile
                .range()
                .is_some_and(|(low, high)| low - self.tolerance <= price && price <= high + self.tolerance);

            self.pending.insert(PendingPoc {
                poc_type: self.poc_type,
                origin_session_id: profile.session_id.clone(),
                price,
                created_at: profile.end,
                created_session_index: index,
                direction,
            });
            self.statistics.record_created(profile.session_name());

            OriginPoc {
                poc_type: self.poc_type,
                origin_session_id: profile.session_id.clone(),
                session_start: profile.start,
                session_end: profile.end,
                price,
                origin_close: profile.close,
                direction,
                distance_from_close: profile.close.map(|close| price - close),
                revisited_within_session,
            }
        });

        self.session_index += 1;
        self.last_start = Some(profile.start);

        Ok(SessionOutcome { events, origin })
    }

    /// POCs still pending; naked once the input stream ends
    pub fn naked(&self) -> Vec<PendingPoc> {
        self.pending.iter().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn statistics(&self, latency_buckets: &[u32]) -> RevisitStatistics {
        self.statistics.summarize(self.poc_type, latency_buckets)
    }

    pub fn checkpoint(&self) -> TrackerCheckpoint {
        TrackerCheckpoint {
            poc_type: self.poc_type,
            tolerance: self.tolerance,
            pending: self.pending.clone(),
            session_index: self.session_index,
            last_start: self.last_start,
            statistics: self.statistics.clone(),
        }
    }

    pub fn resume(expected: PocType, checkpoint: TrackerCheckpoint) -> Result<Self, TrackerError> {
        if checkpoint.poc_type != expected {
            return Err(TrackerError::PocTypeMismatch { expected, found: checkpoint.poc_type });
        }
        Ok(Self {
            poc_type: checkpoint.poc_type,
            tolerance: checkpoint.tolerance,
            pending: checkpoint.pending,
            session_index: checkpoint.session_index,
            last_start: checkpoint.last_start,
            statistics: checkpoint.statistics,
        })
    }
}
