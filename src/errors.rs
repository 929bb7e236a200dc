use thiserror::Error;

use crate::config::ConfigError;
use crate::ingest::errors::IngestError;
use crate::profile::errors::ProfileError;
use crate::report::ReportError;
use crate::revisit::errors::TrackerError;

/// Top-level error for a full analysis run
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),
    #[error("Profile error: {0}")]
    Profile(#[from] ProfileError),
    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),
    #[error("Report error: {0}")]
    Report(#[from] ReportError),
}
