//! Assigns ticks to named session windows.
//!
//! A tick belongs to every window active at its timestamp, so overlapping
//! windows (London and the London/New York overlap) see the same ticks. A
//! window that wraps midnight, or spans a full day, belongs to the date it
//! starts on; weekday filters are checked against that start date.
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rustc_hash::FxHashMap;
use tracing::info;

use crate::config::SessionWindow;
use crate::profile::{SessionId, SessionTicks, Tick};

/// Labelled sessions in chronological order
#[derive(Debug, Clone, Default)]
pub struct LabelReport {
    pub sessions: Vec<SessionTicks>,
    /// Ticks outside every configured window
    pub unlabeled_ticks: u64,
}

/// A concrete occurrence of a window on one date
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSlot {
    pub session_id: SessionId,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionLabeler<'a> {
    windows: &'a [SessionWindow],
}

impl<'a> SessionLabeler<'a> {
    pub fn new(windows: &'a [SessionWindow]) -> Self {
        Self { windows }
    }

    /// Start and end instants of `window` opening on `date`
    pub fn window_bounds(window: &SessionWindow, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = date.and_time(window.start).and_utc();
        let end_date = if window.wraps_midnight() { date.succ_opt()? } else { date };
        Some((start, end_date.and_time(window.end).and_utc()))
    }

    /// Every window occurrence containing `timestamp` in `[start, end)`
    pub fn slots_at(&self, timestamp: DateTime<Utc>) -> Vec<SessionSlot> {
        let date = timestamp.date_naive();
        let mut slots = Vec::new();

        for window in self.windows {
            let candidates = [Some(date), date.pred_opt().filter(|_| window.wraps_midnight())];
            for opening in candidates.into_iter().flatten() {
                if !window.weekdays.contains(&opening.weekday()) {
                    continue;
                }
                let Some((start, end)) = Self::window_bounds(window, opening) else {
                    continue;
                };
                if start <= timestamp && timestamp < end {
                    slots.push(SessionSlot {
                        session_id: SessionId::new(opening, window.name.as_str()),
                        start,
                        end,
                    });
                    break;
                }
            }
        }

        slots
    }

    /// Group ticks into sessions sorted by `(start, session_id)`
    pub fn label(&self, ticks: &[Tick]) -> LabelReport {
        let mut groups: FxHashMap<SessionId, SessionTicks> = FxHashMap::default();
        let mut unlabeled_ticks = 0u64;

        for tick in ticks {
            let slots = self.slots_at(tick.timestamp);
            if slots.is_empty() {
                unlabeled_ticks += 1;
                continue;
            }
            for slot in slots {
                groups
                    .entry(slot.session_id.clone())
                    .or_insert_with(|| SessionTicks::new(slot.session_id, slot.start, slot.end, Vec::new()))
                    .ticks
                    .push(*tick);
            }
        }

        let mut sessions: Vec<SessionTicks> = groups.into_values().collect();
        sessions.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.session_id.cmp(&b.session_id)));

        info!(
            "🗓️ Labelled {} sessions from {} ticks ({} outside any window)",
            sessions.len(),
            ticks.len(),
            unlabeled_ticks
        );

        LabelReport { sessions, unlabeled_ticks }
    }
}
