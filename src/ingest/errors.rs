use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
    #[error("No data found: {0}")]
    NoData(String),
}
