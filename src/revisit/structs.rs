use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::profile::{SessionId, SessionProfile};

/// Which point of control a tracker follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PocType {
    Volume,
    Tpo,
}

impl PocType {
    pub const ALL: [PocType; 2] = [PocType::Volume, PocType::Tpo];

    /// The POC price of this type on a profile
    pub fn price_of(self, profile: &SessionProfile) -> Option<f64> {
        match self {
            PocType::Volume => profile.volume_poc_price,
            PocType::Tpo => profile.tpo_poc_price,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PocType::Volume => "volume",
            PocType::Tpo => "tpo",
        }
    }
}

impl fmt::Display for PocType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side of the origin session's close the POC sits on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    /// POC above the close: a revisit comes from below
    Upper,
    /// POC at or below the close
    Lower,
}

impl Direction {
    pub fn from_close(price: f64, close: Option<f64>) -> Self {
        match close {
            Some(close) if price > close => Direction::Upper,
            _ => Direction::Lower,
        }
    }
}

/// How the revisiting session closed relative to the level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Reaction {
    /// Closed back on the side it came from
    Rejection,
    Acceptance,
}

impl Reaction {
    pub fn classify(direction: Direction, price: f64, close: f64) -> Self {
        match direction {
            Direction::Upper if close < price => Reaction::Rejection,
            Direction::Lower if close > price => Reaction::Rejection,
            _ => Reaction::Acceptance,
        }
    }
}

/// A POC not yet traded through by a later session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingPoc {
    pub poc_type: PocType,
    pub origin_session_id: SessionId,
    pub price: f64,
    /// End of the origin session
    pub created_at: DateTime<Utc>,
    pub created_session_index: u64,
    pub direction: Direction,
}

/// First revisit of a pending POC
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevisitEvent {
    pub poc_type: PocType,
    pub origin_session_id: SessionId,
    pub price: f64,
    pub revisiting_session_id: SessionId,
    pub revisit_session_start: DateTime<Utc>,
    /// 1 when revisited by the immediately following session
    pub sessions_elapsed: u64,
    /// Minutes from the origin session's end to the revisiting session's start
    pub minutes_elapsed: f64,
    pub direction: Direction,
    /// Furthest the revisiting session traded beyond the level on either side
    pub max_excursion: f64,
    /// Revisiting close minus the level
    pub close_offset: f64,
    pub reaction: Reaction,
}

impl RevisitEvent {
    /// Resolve `pending` against a revisiting session with traded range `[low, high]`
    pub fn resolve(
        pending: PendingPoc,
        session: &SessionProfile,
        session_index: u64,
        (low, high): (f64, f64),
        close: f64,
    ) -> Self {
        let elapsed_ms = (session.start - pending.created_at).num_milliseconds().max(0);
        let price = pending.price;
        RevisitEvent {
            poc_type: pending.poc_type,
            revisiting_session_id: session.session_id.clone(),
            revisit_session_start: session.start,
            sessions_elapsed: session_index.saturating_sub(pending.created_session_index),
            minutes_elapsed: elapsed_ms as f64 / 60_000.0,
            direction: pending.direction,
            max_excursion: (high - price).max(price - low),
            close_offset: close - price,
            reaction: Reaction::classify(pending.direction, price, close),
            origin_session_id: pending.origin_session_id,
            price,
        }
    }
}

/// A POC as created by its own session, with the within-session check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OriginPoc {
    pub poc_type: PocType,
    pub origin_session_id: SessionId,
    pub session_start: DateTime<Utc>,
    pub session_end: DateTime<Utc>,
    pub price: f64,
    pub origin_close: Option<f64>,
    pub direction: Direction,
    /// POC minus origin close
    pub distance_from_close: Option<f64>,
    /// Origin session's own range covers the POC within tolerance
    pub revisited_within_session: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_relative_to_close() {
        assert_eq!(Direction::from_close(101.0, Some(100.0)), Direction::Upper);
        assert_eq!(Direction::from_close(100.0, Some(100.0)), Direction::Lower);
        assert_eq!(Direction::from_close(99.0, Some(100.0)), Direction::Lower);
        assert_eq!(Direction::from_close(99.0, None), Direction::Lower);
    }

    #[test]
    fn test_reaction_classification() {
        assert_eq!(Reaction::classify(Direction::Upper, 100.0, 98.0), Reaction::Rejection);
        assert_eq!(Reaction::classify(Direction::Upper, 100.0, 102.0), Reaction::Acceptance);
        assert_eq!(Reaction::classify(Direction::Lower, 100.0, 102.0), Reaction::Rejection);
        assert_eq!(Reaction::classify(Direction::Lower, 100.0, 98.0), Reaction::Acceptance);
        assert_eq!(Reaction::classify(Direction::Lower, 100.0, 100.0), Reaction::Acceptance);
    }

    #[test]
    fn test_poc_type_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&PocType::Tpo).unwrap(), "\"tpo\"");
        assert_eq!(PocType::Volume.to_string(), "volume");
    }
}
