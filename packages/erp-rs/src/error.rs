use crate::types::Condition;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ErpError {
    #[error("Input file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Required column missing from input: {0}")]
    MissingColumn(String),

    #[error("Calibration flashes not found: expected {expected} grouped flash events, found {found}")]
    CalibrationNotFound { found: usize, expected: usize },

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Channel not found: {0}")]
    ChannelNotFound(String),

    #[error("Channel shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("No {0} events found, rejection statistics are undefined")]
    EmptyCondition(Condition),

    #[error("All {found} {condition} epochs were rejected, nothing to average")]
    AllEpochsRejected { condition: Condition, found: usize },

    #[error("CSV export failed: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ErpError>;
