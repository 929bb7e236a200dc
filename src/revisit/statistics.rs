//! Aggregate revisit statistics per POC type.
//!
//! The accumulator is part of a tracker's checkpointed state; summaries are
//! derived on demand and never stored per entity.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::structs::{PocType, Reaction, RevisitEvent};

/// Latency of one resolved POC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct LatencySample {
    origin_session: String,
    sessions_elapsed: u64,
    minutes_elapsed: f64,
    rejected: bool,
}

/// Running counts sufficient to rebuild every statistic
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsAccumulator {
    created: u64,
    created_by_origin: BTreeMap<String, u64>,
    samples: Vec<LatencySample>,
}

/// Distribution of one latency measure over resolved events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatencySummary {
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub p25: f64,
    pub p75: f64,
    pub p90: f64,
}

impl LatencySummary {
    pub fn from_values(mut values: Vec<f64>) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        values.sort_by(f64::total_cmp);
        let count = values.len();
        Some(Self {
            count,
            mean: values.iter().sum::<f64>() / count as f64,
            median: quantile(&values, 0.5),
            p25: quantile(&values, 0.25),
            p75: quantile(&values, 0.75),
            p90: quantile(&values, 0.9),
        })
    }
}

/// Share of resolved events with `sessions_elapsed <= max_sessions`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BucketShare {
    pub max_sessions: u32,
    pub share: f64,
}

/// Counts and median latency for POCs born in one named session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginBreakdown {
    pub origin_session: String,
    pub created: u64,
    pub resolved: u64,
    pub revisit_rate: Option<f64>,
    pub median_sessions: Option<f64>,
    pub median_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisitStatistics {
    pub poc_type: PocType,
    pub created: u64,
    pub resolved: u64,
    pub naked: u64,
    /// resolved / (resolved + naked)
    pub revisit_rate: Option<f64>,
    pub sessions_elapsed: Option<LatencySummary>,
    pub minutes_elapsed: Option<LatencySummary>,
    pub latency_buckets: Vec<BucketShare>,
    /// Resolved by the very next session, over all created
    pub next_session_probability: Option<f64>,
    pub rejection_rate: Option<f64>,
    pub by_origin: Vec<OriginBreakdown>,
}

/// Linear interpolation between closest ranks over sorted values
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

fn ratio(numerator: u64, denominator: u64) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn median(values: Vec<f64>) -> Option<f64> {
    LatencySummary::from_values(values).map(|s| s.median)
}

impl StatisticsAccumulator {
    pub fn record_created(&mut self, origin_session: &str) {
        self.created += 1;
        *self.created_by_origin.entry(origin_session.to_string()).or_insert(0) += 1;
    }

    pub fn record_event(&mut self, event: &RevisitEvent) {
        self.samples.push(LatencySample {
            origin_session: event.origin_session_id.name.clone(),
            sessions_elapsed: event.sessions_elapsed,
            minutes_elapsed: event.minutes_elapsed,
            rejected: event.reaction == Reaction::Rejection,
        });
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn resolved(&self) -> u64 {
        self.samples.len() as u64
    }

    pub fn summarize(&self, poc_type: PocType, latency_buckets: &[u32]) -> RevisitStatistics {
        let resolved = self.resolved();
        let naked = self.created.saturating_sub(resolved);

        let latency_buckets = latency_buckets
            .iter()
            .map(|&max_sessions| {
                let hits = self.samples.iter().filter(|s| s.sessions_elapsed <= u64::from(max_sessions)).count();
                BucketShare {
                    max_sessions,
                    share: ratio(hits as u64, resolved).unwrap_or(0.0),
                }
            })
            .collect();

        let next_session = self.samples.iter().filter(|s| s.sessions_elapsed == 1).count() as u64;
        let rejected = self.samples.iter().filter(|s| s.rejected).count() as u64;

        let by_origin = self
            .created_by_origin
            .iter()
            .map(|(name, &created)| {
                let samples: Vec<&LatencySample> = self.samples.iter().filter(|s| &s.origin_session == name).collect();
                let resolved = samples.len() as u64;
                OriginBreakdown {
                    origin_session: name.clone(),
                    created,
                    resolved,
                    revisit_rate: ratio(resolved, created),
                    median_sessions: median(samples.iter().map(|s| s.sessions_elapsed as f64).collect()),
                    median_minutes: median(samples.iter().map(|s| s.minutes_elapsed).collect()),
                }
            })
            .collect();

        RevisitStatistics {
            poc_type,
            created: self.created,
            resolved,
            naked,
            revisit_rate: ratio(resolved, resolved + naked),
            sessions_elapsed: LatencySummary::from_values(
                self.samples.iter().map(|s| s.sessions_elapsed as f64).collect(),
            ),
            minutes_elapsed: LatencySummary::from_values(self.samples.iter().map(|s| s.minutes_elapsed).collect()),
            latency_buckets,
            next_session_probability: ratio(next_session, self.created),
            rejection_rate: ratio(rejected, resolved),
            by_origin,
        }
    }
}
