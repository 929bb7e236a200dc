use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::structs::{PendingPoc, RevisitEvent};
use crate::profile::SessionProfile;

/// Unresolved POCs keyed by creation sequence, so iteration is oldest first
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingSet {
    entries: BTreeMap<u64, PendingPoc>,
    next_seq: u64,
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, poc: PendingPoc) -> u64 {
        let seq = self.next_seq;
        self.entries.insert(seq, poc);
        self.next_seq += 1;
        seq
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pending entries, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &PendingPoc> {
        self.entries.values()
    }

    /// Test every pending POC against `session`'s range widened by `tolerance`.
    ///
    /// Consumes the set: resolved entries become events, the rest are carried
    /// into the returned set. A session without a traded range resolves nothing.
    pub fn resolve_against(
        self,
        session: &SessionProfile,
        session_index: u64,
        tolerance: f64,
    ) -> (PendingSet, Vec<RevisitEvent>) {
        let (Some((low, high)), Some(close)) = (session.range(), session.close) else {
            return (self, Vec::new());
        };

        let mut retained = BTreeMap::new();
        let mut events = Vec::new();
        for (seq, poc) in self.entries {
            let overlaps = low - tolerance <= poc.price && poc.price <= high + tolerance;
            if overlaps && poc.origin_session_id != session.session_id {
                events.push(RevisitEvent::resolve(poc, session, session_index, (low, high), close));
            } else {
                retained.insert(seq, poc);
            }
        }

        (PendingSet { entries: retained, next_seq: self.next_seq }, events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::SessionId;
    use crate::revisit::structs::{Direction, PocType};
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    fn pending(day: u32, price: f64) -> PendingPoc {
        PendingPoc {
            poc_type: PocType::Volume,
            origin_session_id: SessionId::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), "London"),
            price,
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 16, 0, 0).unwrap(),
            created_session_index: u64::from(day),
            direction: Direction::Lower,
        }
    }

    fn profile(day: u32, low: f64, high: f64) -> SessionProfile {
        let start = Utc.with_ymd_and_hms(2024, 1, day, 7, 0, 0).unwrap();
        SessionProfile {
            session_id: SessionId::new(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), "London"),
            start,
            end: start + Duration::hours(9),
            open: Some(low),
            high: Some(high),
            low: Some(low),
            close: Some(high),
            total_volume: 10.0,
            delta: 0.0,
            tick_count: 2,
            dropped_ticks: 0,
            volume_poc_price: Some(low),
            tpo_poc_price: Some(low),
            vah: None,
            val: None,
            ib_high: None,
            ib_low: None,
            poor_high: Default::default(),
            poor_low: Default::default(),
            single_prints: false,
            single_print_high: None,
            single_print_low: None,
            tpo_period_count: 1,
        }
    }

    #[test]
    fn test_resolves_overlapping_and_keeps_the_rest_in_order() {
        let mut set = PendingSet::new();
        set.insert(pending(2, 95.0));
        set.insert(pending(3, 120.0));
        set.insert(pending(4, 99.0));

        let (set, events) = set.resolve_against(&profile(5, 90.0, 100.0), 5, 0.0);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].price, 95.0);
        assert_eq!(events[1].price, 99.0);
        assert_eq!(events[0].sessions_elapsed, 3);
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().map(|p| p.price), Some(120.0));
    }

    #[test]
    fn test_tolerance_widens_range() {
        let mut set = PendingSet::new();
        set.insert(pending(2, 100.5));

        let (set, events) = set.clone().resolve_against(&profile(5, 90.0, 100.0), 5, 0.0);
        assert!(events.is_empty());
        assert_eq!(set.len(), 1);

        let (set, events) = set.resolve_against(&profile(5, 90.0, 100.0), 5, 0.5);
        assert_eq!(events.len(), 1);
        assert!(set.is_empty());
    }

    #[test]
    fn test_origin_session_never_resolves_itself() {
        let mut set = PendingSet::new();
        set.insert(pending(5, 95.0));
        let (set, events) = set.resolve_against(&profile(5, 90.0, 100.0), 5, 0.0);
        assert!(events.is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_session_without_range_resolves_nothing() {
        let mut set = PendingSet::new();
        set.insert(pending(2, 95.0));
        let mut empty = profile(5, 90.0, 100.0);
        empty.high = None;
        empty.low = None;
        let (set, events) = set.resolve_against(&empty, 5, 10.0);
        assert!(events.is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_sequence_survives_resolution() {
        let mut set = PendingSet::new();
        set.insert(pending(2, 95.0));
        let (mut set, _) = set.resolve_against(&profile(3, 90.0, 100.0), 3, 0.0);
        assert_eq!(set.insert(pending(3, 200.0)), 1);
    }
}
