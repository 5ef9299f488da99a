use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use demand_forecast::metrics::evaluate_test_set;
use demand_forecast::window::WindowSample;
use demand_forecast::{ForecastError, Result, SequencePredictor};
use series_math::{ErrorMetrics, MathError, ZScoreNormalizer};

/// Repeats the last value of its window
#[derive(Debug)]
struct Persistence;

impl SequencePredictor for Persistence {
    fn sequence_length(&self) -> usize {
        2
    }

    fn predict_one(&self, window: &[f64]) -> Result<f64> {
        Ok(window[window.len() - 1])
    }

    fn name(&self) -> &str {
        "persistence"
    }
}

#[test]
fn test_error_metrics_exclude_zero_actuals_from_mape() {
    let metrics = ErrorMetrics::evaluate(&[0.0, 4.0], &[1.0, 5.0]).unwrap();
    assert_abs_diff_eq!(metrics.mae, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.rmse, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(metrics.mape, 0.25, epsilon = 1e-12);
    assert!(metrics.to_string().contains("MAPE:  25.00%"));
}

#[test]
fn test_error_metrics_reject_mismatched_lengths() {
    assert!(matches!(
        ErrorMetrics::evaluate(&[1.0, 2.0], &[1.0]),
        Err(MathError::LengthMismatch { .. })
    ));
    assert!(ErrorMetrics::evaluate(&[], &[]).is_err());
}

#[test]
fn test_evaluation_denormalizes_and_dates_points() {
    let series = [10.0, 12.0, 14.0, 16.0, 18.0, 20.0];
    let normalizer = ZScoreNormalizer::fit(&series);
    let scaled = normalizer.transform_all(&series);
    let dates: Vec<Option<NaiveDate>> = (1..=6)
        .map(|d| NaiveDate::from_ymd_opt(2024, 2, d))
        .collect();

    // Windows of 2 over 6 values: 4 samples, the last 2 held out (split index 2)
    let test = vec![
        WindowSample {
            input: scaled[2..4].to_vec(),
            target: scaled[4],
        },
        WindowSample {
            input: scaled[3..5].to_vec(),
            target: scaled[5],
        },
    ];
    let evaluation = evaluate_test_set(&Persistence, &normalizer, &test, &dates, 2).unwrap();

    assert_eq!(evaluation.points.len(), 2);
    assert_eq!(evaluation.points[0].date, NaiveDate::from_ymd_opt(2024, 2, 5));
    assert_eq!(evaluation.points[1].date, NaiveDate::from_ymd_opt(2024, 2, 6));
    assert_abs_diff_eq!(evaluation.points[0].actual, 18.0, epsilon = 1e-9);
    assert_abs_diff_eq!(evaluation.points[0].predicted, 16.0, epsilon = 1e-9);
    assert_abs_diff_eq!(evaluation.metrics.mae, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(evaluation.metrics.rmse, 2.0, epsilon = 1e-9);
    assert_eq!(evaluation.actual().len(), evaluation.predicted().len());
}

#[test]
fn test_evaluation_needs_test_samples() {
    let result = evaluate_test_set(&Persistence, &ZScoreNormalizer::default(), &[], &[], 0);
    assert!(matches!(result, Err(ForecastError::InsufficientData(_))));
}
