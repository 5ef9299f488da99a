//! # Series Math
//!
//! Numeric building blocks for univariate demand series.
//! This crate provides the z-score normalizer used before training, the
//! error metrics used to score forecasts, and the read-only exploratory
//! statistics shown next to the aggregated series.

use thiserror::Error;

pub mod analytics;
pub mod metrics;
pub mod normalize;

pub use analytics::{Histogram, SummaryStats};
pub use metrics::ErrorMetrics;
pub use normalize::ZScoreNormalizer;

/// Errors that can occur in series calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Length mismatch: expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// Result type for series math operations
pub type Result<T> = std::result::Result<T, MathError>;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Arithmetic mean, or `None` for an empty slice
pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}
