use demand_forecast::models::{ModelKind, SequenceRegressor};
use demand_forecast::training::{TrainingOptions, TrainingRun};
use demand_forecast::window::{make_windows, WindowSample};
use demand_forecast::{ForecastError, SequencePredictor};
use pretty_assertions::assert_eq;
use std::thread;

fn samples(n: usize) -> Vec<WindowSample> {
    let series: Vec<f64> = (0..n + 4).map(|i| (i as f64 * 0.7).cos()).collect();
    make_windows(&series, 4)
}

fn model() -> SequenceRegressor {
    SequenceRegressor::new(ModelKind::Gru, 4, 6, 0.1, Some(17)).unwrap()
}

fn options(epochs: usize) -> TrainingOptions {
    TrainingOptions {
        epochs,
        batch_size: 8,
        learning_rate: 0.001,
        validation_split: 0.1,
    }
}

#[test]
fn test_run_yields_one_report_per_epoch() {
    let run = TrainingRun::new(model(), samples(40), options(5)).unwrap();
    assert_eq!(run.train_len(), 36);
    assert_eq!(run.validation_len(), 4);

    let reports: Vec<_> = run.collect();
    let epochs: Vec<usize> = reports.iter().map(|r| r.epoch).collect();
    assert_eq!(epochs, vec![1, 2, 3, 4, 5]);
    for report in &reports {
        assert!(report.train_loss.is_finite());
        assert!(report.val_loss.map_or(false, f64::is_finite));
    }
}

#[test]
fn test_validation_tail_size() {
    // 25 samples: floor(25 * 0.9) = 22 train, 3 validation
    let run = TrainingRun::new(model(), samples(25), options(1)).unwrap();
    assert_eq!(run.train_len(), 22);
    assert_eq!(run.validation_len(), 3);
}

#[test]
fn test_no_validation_split_reports_no_val_loss() {
    let mut opts = options(2);
    opts.validation_split = 0.0;
    let mut run = TrainingRun::new(model(), samples(20), opts).unwrap();
    assert_eq!(run.validation_len(), 0);
    assert_eq!(run.next().map(|r| r.val_loss), Some(None));
}

#[test]
fn test_run_is_fused() {
    let mut run = TrainingRun::new(model(), samples(20), options(1)).unwrap();
    assert!(run.next().is_some());
    assert!(run.next().is_none());
    assert!(run.next().is_none());
    assert!(run.is_finished());
    assert_eq!(run.epochs_completed(), 1);
}

#[test]
fn test_stop_request_is_honored_at_epoch_boundary() {
    let mut run = TrainingRun::new(model(), samples(30), options(50)).unwrap();
    let stop = run.stop_handle();

    assert_eq!(run.next().map(|r| r.epoch), Some(1));
    assert_eq!(run.next().map(|r| r.epoch), Some(2));
    stop.request_stop();
    assert!(run.next().is_none());
    assert_eq!(run.epochs_completed(), 2);
}

#[test]
fn test_stop_from_another_thread() {
    let mut run = TrainingRun::new(model(), samples(30), options(1_000)).unwrap();
    let stop = run.stop_handle();
    run.next();

    thread::spawn(move || stop.request_stop()).join().unwrap();

    assert!(run.next().is_none());
    assert!(run.epochs_completed() < 1_000);
}

#[test]
fn test_invalid_options_are_rejected() {
    let mut bad = options(0);
    assert!(matches!(
        TrainingRun::new(model(), samples(20), bad),
        Err(ForecastError::InvalidParameter(_))
    ));

    bad = options(3);
    bad.validation_split = 1.0;
    assert!(TrainingRun::new(model(), samples(20), bad).is_err());

    assert!(matches!(
        TrainingRun::new(model(), Vec::new(), options(3)),
        Err(ForecastError::InsufficientData(_))
    ));
}

#[test]
fn test_windows_of_the_wrong_length_are_rejected() {
    let series: Vec<f64> = (0..30).map(|i| i as f64 / 30.0).collect();
    assert!(matches!(
        TrainingRun::new(model(), make_windows(&series, 5), options(3)),
        Err(ForecastError::InvalidParameter(_))
    ));

    let mut run = TrainingRun::new(model(), make_windows(&series, 4), options(2)).unwrap();
    assert_eq!(run.by_ref().count(), 2);
    assert!(run.take_error().is_none());
}

#[test]
fn test_into_model_returns_trained_weights() {
    let untrained = model();
    let mut run = TrainingRun::new(untrained.clone(), samples(20), options(3)).unwrap();
    run.by_ref().for_each(drop);

    let window = [0.5, 0.1, -0.2, 0.3];
    let trained = run.into_model();
    assert_ne!(
        trained.predict_one(&window).unwrap(),
        untrained.predict_one(&window).unwrap()
    );
}

#[test]
fn test_epoch_report_display() {
    let report = demand_forecast::EpochReport {
        epoch: 3,
        train_loss: 0.25,
        val_loss: Some(0.5),
    };
    assert_eq!(report.to_string(), "Epoch   3: loss 0.25000, val_loss 0.50000");

    let report = demand_forecast::EpochReport {
        val_loss: None,
        ..report
    };
    assert_eq!(report.to_string(), "Epoch   3: loss 0.25000");
}
