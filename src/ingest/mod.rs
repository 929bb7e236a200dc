pub mod csv_loader;
pub mod errors;
pub mod sessions;

pub use csv_loader::{load_ticks_csv, parse_ticks_csv, parse_timestamp, LoadReport, TickRow};
pub use errors::IngestError;
pub use sessions::{LabelReport, SessionLabeler, SessionSlot};
