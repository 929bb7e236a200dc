use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single trade print, validated at the ingestion boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
    pub volume: f64,
    pub bid_volume: f64,
    pub ask_volume: f64,
}

impl Tick {
    pub fn new(timestamp: DateTime<Utc>, price: f64, volume: f64, bid_volume: f64, ask_volume: f64) -> Self {
        Self { timestamp, price, volume, bid_volume, ask_volume }
    }

    /// Price and every volume field are finite, volumes non-negative
    pub fn is_valid(&self) -> bool {
        self.price.is_finite()
            && self.volume.is_finite()
            && self.bid_volume.is_finite()
            && self.ask_volume.is_finite()
            && self.volume >= 0.0
            && self.bid_volume >= 0.0
            && self.ask_volume >= 0.0
    }
}

/// Session identity: calendar date plus session name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId {
    pub date: NaiveDate,
    pub name: String,
}

impl SessionId {
    pub fn new(date: NaiveDate, name: impl Into<String>) -> Self {
        Self { date, name: name.into() }
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.date.format("%Y-%m-%d"), self.name)
    }
}

/// One labelled session's ticks as handed over by the ingestion layer
#[derive(Debug, Clone)]
pub struct SessionTicks {
    pub session_id: SessionId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub ticks: Vec<Tick>,
}

impl SessionTicks {
    pub fn new(session_id: SessionId, start: DateTime<Utc>, end: DateTime<Utc>, ticks: Vec<Tick>) -> Self {
        Self { session_id, start, end, ticks }
    }
}

/// Session OHLC, volume and delta over the accepted ticks
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SessionSummary {
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub total_volume: f64,
    pub delta: f64,
    pub tick_count: u32,
}

impl SessionSummary {
    pub fn from_ticks(ticks: &[Tick]) -> Self {
        let mut summary = SessionSummary::default();
        let mut first: Option<&Tick> = None;
        let mut last: Option<&Tick> = None;

        for tick in ticks {
            if first.map_or(true, |f| tick.timestamp < f.timestamp) {
                first = Some(tick);
            }
            if last.map_or(true, |l| tick.timestamp >= l.timestamp) {
                last = Some(tick);
            }
            summary.high = Some(summary.high.map_or(tick.price, |h| h.max(tick.price)));
            summary.low = Some(summary.low.map_or(tick.price, |l| l.min(tick.price)));
            summary.total_volume += tick.volume;
            summary.delta += tick.ask_volume - tick.bid_volume;
            summary.tick_count += 1;
        }

        summary.open = first.map(|t| t.price);
        summary.close = last.map(|t| t.price);
        summary
    }

    pub fn midpoint(&self) -> Option<f64> {
        match (self.high, self.low) {
            (Some(high), Some(low)) => Some((high + low) / 2.0),
            _ => None,
        }
    }
}

/// A flagged session extreme
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoorExtreme {
    pub is_poor: bool,
    /// Extreme price when poor
    pub price: Option<f64>,
}

impl PoorExtreme {
    pub fn poor(price: f64) -> Self {
        Self { is_poor: true, price: Some(price) }
    }
}

/// Value area bounds in price terms
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueArea {
    pub high: f64,
    pub low: f64,
    /// TPO count inside [low, high]
    pub tpo_count: u32,
    /// Share of the session's total TPO count inside [low, high]
    pub coverage: f64,
}

/// Output of the volume builder
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct VolumeProfileResult {
    pub poc_price: Option<f64>,
    pub total_volume: f64,
    pub level_count: usize,
}

/// Output of the TPO builder
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TpoProfileResult {
    pub poc_price: Option<f64>,
    pub value_area: Option<ValueArea>,
    pub ib_high: Option<f64>,
    pub ib_low: Option<f64>,
    pub poor_high: PoorExtreme,
    pub poor_low: PoorExtreme,
    pub single_prints: bool,
    pub single_print_high: Option<f64>,
    pub single_print_low: Option<f64>,
    pub period_count: u32,
}

/// Immutable per-session market profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionProfile {
    pub session_id: SessionId,
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
    pub volume_poc_price: Option<f64>,
    pub tpo_poc_price: Option<f64>,
    pub vah: Option<f64>,
    pub val: Option<f64>,
    pub ib_high: Option<f64>,
    pub ib_low: Option<f64>,
    pub poor_high: PoorExtreme,
    pub poor_low: PoorExtreme,
    pub single_prints: bool,
    pub single_print_high: Option<f64>,
    pub single_print_low: Option<f64>,
    pub tpo_period_count: u32,
}

impl SessionProfile {
    /// Traded range, when the session has any ticks
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.low, self.high) {
            (Some(low), Some(high)) => Some((low, high)),
            _ => None,
        }
    }

    pub fn session_name(&self) -> &str {
        &self.session_id.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn tick(minute: u32, price: f64, volume: f64) -> Tick {
        let ts = Utc.with_ymd_and_hms(2024, 3, 4, 7, minute, 0).unwrap();
        Tick::new(ts, price, volume, volume * 0.4, volume * 0.6)
    }

    #[test]
    fn test_session_id_display() {
        let id = SessionId::new(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap(), "London");
        assert_eq!(id.to_string(), "2024-03-04_London");
    }

    #[test]
    fn test_summary_from_unordered_ticks() {
        let ticks = vec![tick(5, 101.0, 2.0), tick(1, 100.0, 1.0), tick(9, 99.5, 3.0)];
        let summary = SessionSummary::from_ticks(&ticks);

        assert_eq!(summary.open, Some(100.0));
        assert_eq!(summary.close, Some(99.5));
        assert_eq!(summary.high, Some(101.0));
        assert_eq!(summary.low, Some(99.5));
        assert_eq!(summary.tick_count, 3);
        assert!((summary.total_volume - 6.0).abs() < 1e-9);
        assert!((summary.delta - 1.2).abs() < 1e-9);
        assert_eq!(summary.midpoint(), Some(100.25));
    }

    #[test]
    fn test_empty_summary_has_no_range() {
        let summary = SessionSummary::from_ticks(&[]);
        assert_eq!(summary.high, None);
        assert_eq!(summary.midpoint(), None);
        assert_eq!(summary.tick_count, 0);
    }

    #[test]
    fn test_tick_validation() {
        assert!(tick(0, 100.0, 1.0).is_valid());
        assert!(!tick(0, f64::NAN, 1.0).is_valid());
        assert!(!tick(0, 100.0, f64::INFINITY).is_valid());
        assert!(!tick(0, 100.0, -1.0).is_valid());
    }
}
