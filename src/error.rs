use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error("No configuration table found among the first {scanned} candidate tables")]
    NoConfigurationTable { scanned: usize },

    #[error("Table '{table}' is missing required column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Period {0} is not present in the usage log")]
    UnknownPeriod(String),

    #[error("Invalid period '{0}': expected YYYY-MM")]
    InvalidPeriod(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Data source unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ReconciliationError>;
