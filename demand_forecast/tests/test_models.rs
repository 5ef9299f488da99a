use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use demand_forecast::forecast::{forecast_dates, rollout};
use demand_forecast::models::{Adam, ModelKind, SequencePredictor, SequenceRegressor};
use demand_forecast::window::make_windows;
use demand_forecast::{ForecastError, Result};
use pretty_assertions::assert_eq;
use rstest::rstest;

/// Predicts the mean of its window
#[derive(Debug)]
struct WindowMean {
    length: usize,
}

impl SequencePredictor for WindowMean {
    fn sequence_length(&self) -> usize {
        self.length
    }

    fn predict_one(&self, window: &[f64]) -> Result<f64> {
        Ok(window.iter().sum::<f64>() / window.len() as f64)
    }

    fn name(&self) -> &str {
        "window mean"
    }
}

#[rstest]
#[case("gru", ModelKind::Gru)]
#[case("LSTM", ModelKind::Lstm)]
fn test_model_kind_from_str(#[case] text: &str, #[case] kind: ModelKind) {
    assert_eq!(text.parse::<ModelKind>().unwrap(), kind);
}

#[test]
fn test_model_kind_display_and_serde() {
    assert_eq!(ModelKind::Gru.to_string(), "GRU");
    assert_eq!(serde_json::to_string(&ModelKind::Lstm).unwrap(), "\"lstm\"");
    assert!("rnn".parse::<ModelKind>().is_err());
}

#[test]
fn test_rollout_feeds_predictions_back() {
    let predictor = WindowMean { length: 2 };
    let forecast = rollout(&predictor, &[0.0, 10.0, 2.0, 4.0], 3).unwrap();

    // [2, 4] -> 3, [4, 3] -> 3.5, [3, 3.5] -> 3.25
    assert_eq!(forecast, vec![3.0, 3.5, 3.25]);
}

#[test]
fn test_rollout_needs_a_full_window() {
    let predictor = WindowMean { length: 5 };
    assert!(matches!(
        rollout(&predictor, &[1.0, 2.0], 3),
        Err(ForecastError::InsufficientData(_))
    ));
    assert!(rollout(&predictor, &[1.0; 5], 0).unwrap().is_empty());
}

#[test]
fn test_rollout_through_trait_object() {
    let predictor: Box<dyn SequencePredictor> = Box::new(WindowMean { length: 1 });
    assert_eq!(rollout(predictor.as_ref(), &[7.0], 2).unwrap(), vec![7.0, 7.0]);
}

#[test]
fn test_forecast_dates_are_consecutive() {
    let last = NaiveDate::from_ymd_opt(2024, 12, 30).unwrap();
    let dates = forecast_dates(last, 3);
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
        ]
    );
}

#[rstest]
#[case(ModelKind::Gru)]
#[case(ModelKind::Lstm)]
fn test_regressor_learns_a_sine(#[case] kind: ModelKind) {
    let series: Vec<f64> = (0..120).map(|i| (i as f64 * 0.5).sin()).collect();
    let samples = make_windows(&series, 8);
    let mut model = SequenceRegressor::new(kind, 8, 16, 0.0, Some(2024)).unwrap();
    let mut adam = Adam::new(0.005);

    let before = model.evaluate_loss(&samples).unwrap();
    for _ in 0..60 {
        for batch in samples.chunks(16) {
            model.train_batch(batch, &mut adam).unwrap();
        }
    }
    let after = model.evaluate_loss(&samples).unwrap();

    assert!(after < before * 0.5, "{}: {} -> {}", kind, before, after);

    let windows: Vec<Vec<f64>> = samples.iter().take(4).map(|s| s.input.clone()).collect();
    let predictions = model.predict_many(&windows).unwrap();
    assert_eq!(predictions.len(), 4);
    for (prediction, window) in predictions.iter().zip(&windows) {
        assert_abs_diff_eq!(*prediction, model.predict_one(window).unwrap(), epsilon = 1e-12);
    }
}

#[test]
fn test_regressor_rejects_bad_parameters() {
    assert!(SequenceRegressor::new(ModelKind::Gru, 0, 8, 0.0, None).is_err());
    assert!(SequenceRegressor::new(ModelKind::Gru, 4, 0, 0.0, None).is_err());
    assert!(SequenceRegressor::new(ModelKind::Lstm, 4, 8, 1.0, None).is_err());
    assert!(SequenceRegressor::new(ModelKind::Lstm, 4, 8, -0.2, None).is_err());
}

#[test]
fn test_dropout_only_applies_while_training() {
    let model = SequenceRegressor::new(ModelKind::Gru, 4, 8, 0.5, Some(9)).unwrap();
    let window = [0.1, 0.2, 0.3, 0.4];
    let first = model.predict_one(&window).unwrap();
    for _ in 0..5 {
        assert_eq!(model.predict_one(&window).unwrap(), first);
    }
}
