//! Error types for the demand_forecast crate

use thiserror::Error;

/// Custom error types for the demand_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// No rows loaded, no file chosen, or no injected dataset available
    #[error("Missing input: {0}")]
    MissingInput(String),

    /// Too few windows to train, or a series shorter than the sequence length
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Prediction or evaluation requested before a model was trained
    #[error("Model not ready: {0}")]
    NotReady(String),

    /// A value could not be parsed
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from series calculations
    #[error("Math error: {0}")]
    MathError(#[from] series_math::MathError),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV decoding
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from JSON decoding
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}
