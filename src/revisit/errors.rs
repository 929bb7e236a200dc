use chrono::{DateTime, Utc};
use thiserror::Error;

use super::structs::PocType;
use crate::profile::SessionId;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Session {session_id} starts at {start}, not after previously processed start {previous_start}")]
    OutOfOrder {
        session_id: SessionId,
        start: DateTime<Utc>,
        previous_start: DateTime<Utc>,
    },
    #[error("Checkpoint holds {found} tracker state where {expected} was expected")]
    PocTypeMismatch { expected: PocType, found: PocType },
    #[error("Checkpoint serialization error: {0}")]
    Checkpoint(#[from] serde_json::Error),
}
