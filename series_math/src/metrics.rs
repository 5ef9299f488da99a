//! Error metrics for scoring forecasts
//!
//! The free functions take `(actual, predicted)` slices of equal length and
//! return `NaN` when the input is empty or the lengths differ. Use
//! [`ErrorMetrics::evaluate`] for a validated, all-in-one computation.

use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Pairs whose actual magnitude is below this are left out of MAPE
pub const MAPE_EPSILON: f64 = 1e-8;

/// Added to the SMAPE denominator so zero/zero pairs stay defined
pub const SMAPE_EPSILON: f64 = 1e-8;

fn comparable(actual: &[f64], predicted: &[f64]) -> bool {
    !actual.is_empty() && actual.len() == predicted.len()
}

/// Mean Absolute Error
pub fn mean_absolute_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !comparable(actual, predicted) {
        return f64::NAN;
    }

    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).abs())
        .sum::<f64>()
        / actual.len() as f64
}

/// Mean Squared Error
pub fn mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !comparable(actual, predicted) {
        return f64::NAN;
    }

    actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum::<f64>()
        / actual.len() as f64
}

/// Root Mean Squared Error
pub fn root_mean_squared_error(actual: &[f64], predicted: &[f64]) -> f64 {
    mean_squared_error(actual, predicted).sqrt()
}

/// Mean Absolute Percentage Error, as a fraction.
///
/// Pairs with `|actual| < MAPE_EPSILON` are excluded from both the sum and
/// the count. Returns 0 when no pair qualifies.
pub fn mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !comparable(actual, predicted) {
        return f64::NAN;
    }

    let (sum, count) = actual
        .iter()
        .zip(predicted)
        .filter(|(a, _)| a.abs() >= MAPE_EPSILON)
        .fold((0.0, 0usize), |(sum, count), (a, p)| {
            (sum + ((p - a) / a).abs(), count + 1)
        });

    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Symmetric Mean Absolute Percentage Error, as a fraction in `[0, 2]`
pub fn symmetric_mean_absolute_percentage_error(actual: &[f64], predicted: &[f64]) -> f64 {
    if !comparable(actual, predicted) {
        return f64::NAN;
    }

    let sum: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (p - a).abs() / (a.abs() + p.abs() + SMAPE_EPSILON))
        .sum();

    2.0 / actual.len() as f64 * sum
}

/// Coefficient of determination.
///
/// When the actual series has zero variance the total sum of squares is
/// taken as 1, so the result stays finite.
pub fn r_squared(actual: &[f64], predicted: &[f64]) -> f64 {
    if !comparable(actual, predicted) {
        return f64::NAN;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_res: f64 = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p).powi(2))
        .sum();
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();

    1.0 - ss_res / if ss_tot == 0.0 { 1.0 } else { ss_tot }
}

/// Forecast error metrics on the original (de-normalized) scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErrorMetrics {
    /// Mean Absolute Error
    pub mae: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error (fraction)
    pub mape: f64,
    /// Symmetric Mean Absolute Percentage Error (fraction)
    pub smape: f64,
    /// Coefficient of determination
    pub r2: f64,
}

impl ErrorMetrics {
    /// Compute every metric for paired actual and predicted values
    pub fn evaluate(actual: &[f64], predicted: &[f64]) -> Result<Self> {
        if actual.len() != predicted.len() {
            return Err(MathError::LengthMismatch {
                expected: actual.len(),
                actual: predicted.len(),
            });
        }
        if actual.is_empty() {
            return Err(MathError::InsufficientData(
                "Cannot score an empty set of predictions".to_string(),
            ));
        }

        Ok(Self {
            mae: mean_absolute_error(actual, predicted),
            rmse: root_mean_squared_error(actual, predicted),
            mape: mean_absolute_percentage_error(actual, predicted),
            smape: symmetric_mean_absolute_percentage_error(actual, predicted),
            r2: r_squared(actual, predicted),
        })
    }
}

impl std::fmt::Display for ErrorMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  R2:    {:.3}", self.r2)?;
        writeln!(f, "  MAE:   {:.3}", self.mae)?;
        writeln!(f, "  RMSE:  {:.3}", self.rmse)?;
        writeln!(f, "  MAPE:  {:.2}%", self.mape * 100.0)?;
        writeln!(f, "  SMAPE: {:.2}%", self.smape * 100.0)?;
        Ok(())
    }
}
