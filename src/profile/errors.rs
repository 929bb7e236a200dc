use thiserror::Error;

use super::structs::SessionId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProfileError {
    #[error("Non-finite price: {0}")]
    NonFinitePrice(f64),
    #[error("Data integrity error in session {session_id}: {reason}")]
    DataIntegrity { session_id: SessionId, reason: String },
}

impl ProfileError {
    pub fn integrity(session_id: &SessionId, reason: impl Into<String>) -> Self {
        ProfileError::DataIntegrity {
            session_id: session_id.clone(),
            reason: reason.into(),
        }
    }
}
