//! Session market profiles and POC revisit tracking.
//!
//! Ticks are grouped into labelled sessions, each session is turned into an
//! immutable [`profile::SessionProfile`] (volume POC, TPO POC, value area,
//! initial balance, poor extremes, single prints), and the chronological stream
//! of profiles is fed to the [`revisit::RevisitEngine`], which records when
//! each session's points of control are traded through again.
pub mod config;
pub mod errors;
pub mod ingest;
pub mod logging;
pub mod profile;
pub mod report;
pub mod revisit;

pub use config::{AnalysisConfig, ProfileConfig, RevisitConfig, SessionWindow};
pub use errors::AnalysisError;
pub use profile::{SessionId, SessionProfile, SessionTicks, Tick};
pub use revisit::{PocType, RevisitEngine, RevisitEvent};
