pub mod engine;
pub mod errors;
pub mod pending;
pub mod statistics;
pub mod structs;
pub mod tracker;

pub use engine::{EngineCheckpoint, EngineRun, RevisitEngine, TrackerRun};
pub use errors::TrackerError;
pub use pending::PendingSet;
pub use statistics::{LatencySummary, RevisitStatistics, StatisticsAccumulator};
pub use structs::{Direction, OriginPoc, PendingPoc, PocType, Reaction, RevisitEvent};
pub use tracker::{PocRevisitTracker, SessionOutcome, TrackerCheckpoint};
