//! Recursive multi-step forecasting

use crate::error::{ForecastError, Result};
use crate::models::SequencePredictor;
use crate::utils::future_dates;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt;

/// One forecast value and the day it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl fmt::Display for ForecastPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {:.2}", self.date.format("%Y-%m-%d"), self.value)
    }
}

/// Predict `horizon` steps ahead, feeding each prediction back as input.
///
/// Starts from the last `L` values of `history`.
pub fn rollout<P>(predictor: &P, history: &[f64], horizon: usize) -> Result<Vec<f64>>
where
    P: SequencePredictor + ?Sized,
{
    let length = predictor.sequence_length();
    if history.len() < length {
        return Err(ForecastError::InsufficientData(format!(
            "Need at least {} values to forecast, got {}",
            length,
            history.len()
        )));
    }

    let mut window = history[history.len() - length..].to_vec();
    let mut predictions = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let next = predictor.predict_one(&window)?;
        predictions.push(next);
        window.remove(0);
        window.push(next);
    }
    Ok(predictions)
}

/// The `horizon` consecutive calendar days after `last_date`
pub fn forecast_dates(last_date: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    future_dates(last_date, horizon)
}
