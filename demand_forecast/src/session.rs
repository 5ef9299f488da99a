//! The workbench session
//!
//! [`Workbench`] owns everything a forecasting session needs: the loaded
//! rows, the chosen columns, the aggregated series with its normalizer and,
//! once trained, the model together with the normalizer snapshot and test
//! windows it was trained against. Those trained pieces are installed and
//! dropped as one unit, so a model can never be paired with the scaling of
//! a different series.
//!
//! Training is split into [`Workbench::start_training`], which hands out a
//! [`TrainingJob`] the caller drives epoch by epoch (possibly on another
//! thread), and [`Workbench::complete_training`], which installs the result
//! only if nothing changed the series in the meantime.

use crate::aggregate::{aggregate_by_date, AggregationMode, CategoryFilter};
use crate::config::{ForecastConfig, ModelConfig, WorkbenchConfig};
use crate::data::{
    detect_columns, ColumnSelection, DataLoader, Dataset, DatasetSummary, Row, TimeSeries,
};
use crate::error::{ForecastError, Result};
use crate::forecast::{forecast_dates, rollout, ForecastPoint};
use crate::metrics::{evaluate_test_set, Evaluation};
use crate::models::{SequencePredictor, SequenceRegressor};
use crate::training::{EpochReport, StopHandle, TrainingControl, TrainingOptions, TrainingRun};
use crate::window::{chronological_split, make_windows, WindowSample, MIN_TRAINING_SAMPLES};
use chrono::{Local, NaiveDate};
use series_math::analytics::{
    autocorrelation, day_of_week_averages, histogram, rolling_mean, summary_stats,
    DayOfWeekAverages, MIN_ROLLING_WINDOW,
};
use series_math::{Histogram, SummaryStats, ZScoreNormalizer};
use std::path::PathBuf;
use tracing::{info, warn};

/// Where rows come from
#[derive(Debug, Clone)]
pub enum DataSource {
    Csv(PathBuf),
    Json(PathBuf),
    /// Format chosen from the file extension
    File(PathBuf),
    /// Rows provided by the host environment
    Injected(Vec<Row>),
    /// The synthetic 365-day demo series
    Demo,
}

impl DataSource {
    fn load(self) -> Result<Dataset> {
        match self {
            DataSource::Csv(path) => DataLoader::from_csv(path),
            DataSource::Json(path) => DataLoader::from_json(path),
            DataSource::File(path) => DataLoader::from_path(path),
            DataSource::Injected(rows) => DataLoader::from_rows(rows),
            DataSource::Demo => Ok(DataLoader::demo()),
        }
    }
}

/// Exploratory view of the current series
#[derive(Debug, Clone, PartialEq)]
pub struct Exploration {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
    pub stats: SummaryStats,
    /// Width actually used for the rolling mean
    pub rolling_window: usize,
    pub rolling_mean: Vec<f64>,
    pub histogram: Histogram,
    pub day_of_week: DayOfWeekAverages,
    /// Autocorrelation for lags `1..=max_lag`
    pub autocorrelation: Vec<f64>,
}

/// A model plus everything needed to use it consistently
#[derive(Debug)]
struct TrainedState {
    model: SequenceRegressor,
    normalizer: ZScoreNormalizer,
    split_index: usize,
    test: Vec<WindowSample>,
}

/// A training run handed out by [`Workbench::start_training`].
///
/// Iterate it to train; each item is one finished epoch.
#[derive(Debug)]
pub struct TrainingJob {
    run: TrainingRun,
    generation: u64,
    normalizer: ZScoreNormalizer,
    split_index: usize,
    test: Vec<WindowSample>,
}

impl TrainingJob {
    pub fn stop_handle(&self) -> StopHandle {
        self.run.stop_handle()
    }

    pub fn run(&self) -> &TrainingRun {
        &self.run
    }

    /// Number of training windows before the validation tail is removed
    pub fn train_len(&self) -> usize {
        self.split_index
    }

    pub fn test_len(&self) -> usize {
        self.test.len()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Iterator for TrainingJob {
    type Item = EpochReport;

    fn next(&mut self) -> Option<EpochReport> {
        self.run.next()
    }
}

/// A demand forecasting session
#[derive(Debug, Default)]
pub struct Workbench {
    config: WorkbenchConfig,
    dataset: Option<Dataset>,
    columns: ColumnSelection,
    series: TimeSeries,
    normalizer: Option<ZScoreNormalizer>,
    trained: Option<TrainedState>,
    generation: u64,
}

impl Workbench {
    pub fn new(config: WorkbenchConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &WorkbenchConfig {
        &self.config
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        self.dataset.as_ref()
    }

    pub fn columns(&self) -> &ColumnSelection {
        &self.columns
    }

    pub fn series(&self) -> &TimeSeries {
        &self.series
    }

    /// Normalizer fitted to the current series
    pub fn normalizer(&self) -> Option<&ZScoreNormalizer> {
        self.normalizer.as_ref()
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    pub fn model(&self) -> Option<&SequenceRegressor> {
        self.trained.as_ref().map(|t| &t.model)
    }

    /// Counter bumped whenever the series or the trained state is invalidated
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Load rows and rebuild the series. On failure nothing changes.
    pub fn load(&mut self, source: DataSource) -> Result<DatasetSummary> {
        let dataset = source.load()?;
        let columns = self.resolve_columns(&dataset);
        let summary = match (&columns.date, &columns.target) {
            (Some(date), Some(target)) => dataset.summary(date, target),
            _ => {
                warn!(
                    columns = ?dataset.columns(),
                    "Could not resolve a date and a target column, keeping current data"
                );
                return Err(ForecastError::MissingInput(
                    "No date and target column selected".to_string(),
                ));
            }
        };

        self.dataset = Some(dataset);
        self.columns = columns;
        self.rebuild_series();
        Ok(summary)
    }

    /// Configured columns where the dataset has them, inferred ones otherwise
    fn resolve_columns(&self, dataset: &Dataset) -> ColumnSelection {
        let detected = detect_columns(dataset);
        let pick = |configured: &Option<String>, fallback: Option<String>| match configured {
            Some(name) if dataset.has_column(name) => Some(name.clone()),
            Some(name) => {
                warn!(column = %name, "Configured column not found, using inferred column");
                fallback
            }
            None => fallback,
        };
        ColumnSelection {
            date: pick(&self.config.data.date_column, detected.date),
            target: pick(&self.config.data.target_column, detected.target),
        }
    }

    /// Overview of the loaded rows for the selected columns
    pub fn summary(&self) -> Result<DatasetSummary> {
        let dataset = self.require_dataset()?;
        let (date, target) = self.require_columns()?;
        Ok(dataset.summary(date, target))
    }

    /// Choose the date and target columns; `None` keeps the current choice
    pub fn set_columns(&mut self, date: Option<String>, target: Option<String>) -> Result<()> {
        let dataset = self.require_dataset()?;
        for name in date.iter().chain(target.iter()) {
            if !dataset.has_column(name) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Unknown column '{}'",
                    name
                )));
            }
        }

        if let Some(date) = date {
            self.config.data.date_column = Some(date.clone());
            self.columns.date = Some(date);
        }
        if let Some(target) = target {
            self.config.data.target_column = Some(target.clone());
            self.columns.target = Some(target);
        }
        self.rebuild_series();
        Ok(())
    }

    pub fn set_aggregation(&mut self, mode: AggregationMode) {
        self.config.data.aggregation = mode;
        self.rebuild_series();
    }

    pub fn set_filters(&mut self, filters: CategoryFilter) {
        self.config.data.filters = filters;
        self.rebuild_series();
    }

    /// Replace the model settings used by the next training run
    pub fn set_model_config(&mut self, model: ModelConfig) -> Result<()> {
        model.validate()?;
        self.config.model = model;
        Ok(())
    }

    pub fn set_forecast_config(&mut self, forecast: ForecastConfig) -> Result<()> {
        if forecast.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        self.config.forecast = forecast;
        Ok(())
    }

    /// Re-aggregate from the raw rows; any trained model becomes invalid
    fn rebuild_series(&mut self) {
        let series = match (&self.dataset, &self.columns.date, &self.columns.target) {
            (Some(dataset), Some(date), Some(target)) => aggregate_by_date(
                dataset.rows(),
                date,
                target,
                self.config.data.aggregation,
                &self.config.data.filters,
            ),
            _ => TimeSeries::default(),
        };

        self.normalizer = Some(ZScoreNormalizer::fit(series.values()));
        self.series = series;
        self.invalidate();
        info!(
            points = self.series.len(),
            aggregation = %self.config.data.aggregation,
            "Rebuilt series"
        );
    }

    fn invalidate(&mut self) {
        self.trained = None;
        self.generation += 1;
    }

    /// Summary statistics, rolling mean, histogram, weekday profile and
    /// autocorrelation of the current series
    pub fn explore(&self) -> Result<Exploration> {
        self.require_dataset()?;
        let values = self.series.values();
        let data = &self.config.data;

        Ok(Exploration {
            labels: self.series.labels(),
            values: values.to_vec(),
            stats: summary_stats(values)?,
            rolling_window: data.rolling_window.max(MIN_ROLLING_WINDOW),
            rolling_mean: rolling_mean(values, data.rolling_window),
            histogram: histogram(values, data.histogram_bins)?,
            day_of_week: day_of_week_averages(self.series.dates(), values),
            autocorrelation: autocorrelation(values, data.max_lag),
        })
    }

    /// Prepare a fresh training run on the current series.
    ///
    /// The data is validated before anything is discarded: if there are too
    /// few windows the previous model stays in place. Otherwise the previous
    /// model is dropped, and any job started earlier becomes stale.
    pub fn start_training(&mut self) -> Result<TrainingJob> {
        self.require_dataset()?;
        let model_config = self.config.model.clone();
        model_config.validate()?;

        let normalizer = ZScoreNormalizer::fit(self.series.values());
        let scaled = normalizer.transform_all(self.series.values());
        let windows = make_windows(&scaled, model_config.sequence_length);
        if windows.len() < MIN_TRAINING_SAMPLES {
            warn!(
                windows = windows.len(),
                sequence_length = model_config.sequence_length,
                "Not enough data for the chosen sequence length"
            );
            return Err(ForecastError::InsufficientData(format!(
                "{} windows of length {} available, at least {} needed",
                windows.len(),
                model_config.sequence_length,
                MIN_TRAINING_SAMPLES
            )));
        }

        let split = chronological_split(windows, model_config.test_ratio)?;
        let model = SequenceRegressor::new(
            model_config.kind,
            model_config.sequence_length,
            model_config.hidden_units,
            model_config.dropout,
            model_config.seed,
        )?;
        let run = TrainingRun::new(model, split.train, TrainingOptions::from(&model_config))?;

        self.normalizer = Some(normalizer);
        self.invalidate();
        info!(
            model = %model_config.kind,
            hidden_units = model_config.hidden_units,
            epochs = model_config.epochs,
            batch_size = model_config.batch_size,
            train = run.train_len(),
            validation = run.validation_len(),
            test = split.test.len(),
            "Starting training"
        );

        Ok(TrainingJob {
            run,
            generation: self.generation,
            normalizer,
            split_index: split.split_index,
            test: split.test,
        })
    }

    /// Install the model of a finished or stopped job.
    ///
    /// Rejected with `NotReady` if the series changed or another job was
    /// started since this one. A run aborted by an epoch error returns that
    /// error and leaves the previous model in place.
    pub fn complete_training(&mut self, mut job: TrainingJob) -> Result<()> {
        if job.generation != self.generation {
            warn!(
                job = job.generation,
                current = self.generation,
                "Discarding stale training job"
            );
            return Err(ForecastError::NotReady(
                "Training job is stale; the series changed while it ran".to_string(),
            ));
        }

        if let Some(e) = job.run.take_error() {
            return Err(e);
        }

        let epochs = job.run.epochs_completed();
        self.trained = Some(TrainedState {
            model: job.run.into_model(),
            normalizer: job.normalizer,
            split_index: job.split_index,
            test: job.test,
        });
        info!(epochs, "Training complete");
        Ok(())
    }

    /// Train to completion, reporting each epoch to `on_epoch`.
    ///
    /// Returning [`TrainingControl::Stop`] ends training after that epoch;
    /// the partially trained model is still installed.
    pub fn train<F>(&mut self, mut on_epoch: F) -> Result<Vec<EpochReport>>
    where
        F: FnMut(&EpochReport) -> TrainingControl,
    {
        let mut job = self.start_training()?;
        let mut reports = Vec::new();
        for report in job.by_ref() {
            let control = on_epoch(&report);
            reports.push(report);
            if control == TrainingControl::Stop {
                info!(epoch = reports.len(), "Training stopped early");
                break;
            }
        }
        self.complete_training(job)?;
        Ok(reports)
    }

    /// Forecast the configured horizon
    pub fn forecast(&self) -> Result<Vec<ForecastPoint>> {
        self.forecast_horizon(self.config.forecast.horizon)
    }

    /// Forecast `horizon` days past the end of the series
    pub fn forecast_horizon(&self, horizon: usize) -> Result<Vec<ForecastPoint>> {
        let trained = self.require_trained()?;
        if horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be positive".to_string(),
            ));
        }

        let history = trained.normalizer.transform_all(self.series.values());
        let scaled = rollout(&trained.model, &history, horizon)?;
        let values = trained.normalizer.inverse_all(&scaled);
        let last = self.series.last_date().unwrap_or_else(today);

        let points: Vec<ForecastPoint> = forecast_dates(last, horizon)
            .into_iter()
            .zip(values)
            .map(|(date, value)| ForecastPoint { date, value })
            .collect();
        info!(
            horizon,
            model = trained.model.name(),
            first = ?points.first().map(|p| p.date),
            "Forecast produced"
        );
        Ok(points)
    }

    /// Score the model on the held-out test windows
    pub fn evaluate(&self) -> Result<Evaluation> {
        let trained = self.require_trained()?;
        let evaluation = evaluate_test_set(
            &trained.model,
            &trained.normalizer,
            &trained.test,
            self.series.dates(),
            trained.split_index,
        )?;
        info!(
            samples = evaluation.points.len(),
            mae = evaluation.metrics.mae,
            rmse = evaluation.metrics.rmse,
            r2 = evaluation.metrics.r2,
            "Evaluated test set"
        );
        Ok(evaluation)
    }

    /// Drop the trained model and the normalizer; loaded data is kept
    pub fn reset(&mut self) {
        self.normalizer = None;
        self.invalidate();
        info!("Session reset");
    }

    fn require_dataset(&self) -> Result<&Dataset> {
        self.dataset
            .as_ref()
            .ok_or_else(|| ForecastError::MissingInput("Load data first".to_string()))
    }

    fn require_columns(&self) -> Result<(&str, &str)> {
        match (&self.columns.date, &self.columns.target) {
            (Some(date), Some(target)) => Ok((date.as_str(), target.as_str())),
            _ => Err(ForecastError::MissingInput(
                "No date and target column selected".to_string(),
            )),
        }
    }

    fn require_trained(&self) -> Result<&TrainedState> {
        self.trained.as_ref().ok_or_else(|| {
            warn!("Prediction requested before training");
            ForecastError::NotReady("Train a model first".to_string())
        })
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aborted_job_keeps_previous_model() {
        let mut config = WorkbenchConfig::default();
        config.model.epochs = 2;
        config.model.hidden_units = 4;
        config.model.seed = Some(3);
        let mut bench = Workbench::new(config);
        bench.load(DataSource::Demo).unwrap();
        bench.train(|_| TrainingControl::Continue).unwrap();
        let before = bench.forecast_horizon(3).unwrap();

        let mut job = bench.start_training().unwrap();
        job.run.train_samples_mut().push(WindowSample {
            input: vec![0.0; 3],
            target: 0.0,
        });
        assert_eq!(job.by_ref().count(), 0);

        assert!(matches!(
            bench.complete_training(job),
            Err(ForecastError::InvalidParameter(_))
        ));
        assert!(bench.is_trained());
        assert_eq!(bench.forecast_horizon(3).unwrap(), before);
    }
}
