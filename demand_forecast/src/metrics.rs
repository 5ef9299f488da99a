//! Scoring a trained model on its held-out windows

use crate::error::{ForecastError, Result};
use crate::models::SequencePredictor;
use crate::window::WindowSample;
use chrono::NaiveDate;
use series_math::{ErrorMetrics, ZScoreNormalizer};
use serde::Serialize;

/// One test window's outcome on the original scale
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvaluationPoint {
    /// Date of the predicted value; `None` where the source date was unparseable
    pub date: Option<NaiveDate>,
    pub actual: f64,
    pub predicted: f64,
}

/// Metrics over the test windows plus the per-window comparison
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub metrics: ErrorMetrics,
    pub points: Vec<EvaluationPoint>,
}

impl Evaluation {
    pub fn actual(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.actual).collect()
    }

    pub fn predicted(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted).collect()
    }
}

/// Predict every test window, de-normalize and score.
///
/// `dates` are the series dates; the target of test sample `k` sits at
/// index `split_index + L + k`.
pub fn evaluate_test_set<P>(
    predictor: &P,
    normalizer: &ZScoreNormalizer,
    test: &[WindowSample],
    dates: &[Option<NaiveDate>],
    split_index: usize,
) -> Result<Evaluation>
where
    P: SequencePredictor + ?Sized,
{
    if test.is_empty() {
        return Err(ForecastError::InsufficientData(
            "No test samples to evaluate".to_string(),
        ));
    }

    let offset = split_index + predictor.sequence_length();
    let points = test
        .iter()
        .enumerate()
        .map(|(k, sample)| {
            let predicted = predictor.predict_one(&sample.input)?;
            Ok(EvaluationPoint {
                date: dates.get(offset + k).copied().flatten(),
                actual: normalizer.inverse(sample.target),
                predicted: normalizer.inverse(predicted),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let actual: Vec<f64> = points.iter().map(|p| p.actual).collect();
    let predicted: Vec<f64> = points.iter().map(|p| p.predicted).collect();
    let metrics = ErrorMetrics::evaluate(&actual, &predicted)?;

    Ok(Evaluation { metrics, points })
}
