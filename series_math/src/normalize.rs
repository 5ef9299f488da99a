//! Z-score normalization
//!
//! The normalizer is fitted once over the whole aggregated series and then
//! used to move values in and out of the space the model is trained in.

use serde::{Deserialize, Serialize};

/// Standard deviation used when the fitted series has no spread
pub const DEGENERATE_STD: f64 = 1.0;

/// Population z-score transform `(x - mean) / std`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZScoreNormalizer {
    mean: f64,
    std: f64,
}

impl Default for ZScoreNormalizer {
    fn default() -> Self {
        Self {
            mean: 0.0,
            std: DEGENERATE_STD,
        }
    }
}

impl ZScoreNormalizer {
    /// Fit mean and population standard deviation (divide by N).
    ///
    /// An empty series yields mean 0. A zero or non-finite standard deviation
    /// is replaced with [`DEGENERATE_STD`] so the transform never divides by zero.
    pub fn fit(values: &[f64]) -> Self {
        let Some(mean) = crate::mean(values) else {
            return Self::default();
        };

        let variance =
            values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
        let std = variance.sqrt();

        Self {
            mean,
            std: if std > 0.0 && std.is_finite() {
                std
            } else {
                DEGENERATE_STD
            },
        }
    }

    /// Fitted mean
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Fitted standard deviation (never zero)
    pub fn std(&self) -> f64 {
        self.std
    }

    /// Map a raw value into normalized space
    pub fn transform(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }

    /// Map a normalized value back to the original scale
    pub fn inverse(&self, value: f64) -> f64 {
        value * self.std + self.mean
    }

    pub fn transform_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.transform(v)).collect()
    }

    pub fn inverse_all(&self, values: &[f64]) -> Vec<f64> {
        values.iter().map(|&v| self.inverse(v)).collect()
    }
}
