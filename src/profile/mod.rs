pub mod assembler;
pub mod batch;
pub mod binner;
pub mod errors;
pub mod structs;
pub mod tpo;
pub mod volume;

pub use assembler::SessionProfileAssembler;
pub use batch::{build_session_profiles, BuildReport};
pub use binner::{PriceBin, PriceBinner};
pub use errors::ProfileError;
pub use structs::{
    PoorExtreme, SessionId, SessionProfile, SessionSummary, SessionTicks, Tick, ValueArea,
};
pub use tpo::{TpoHistogram, TpoProfileBuilder};
pub use volume::VolumeProfileBuilder;
