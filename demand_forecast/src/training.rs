//! Epoch-by-epoch training of a [`SequenceRegressor`]
//!
//! A [`TrainingRun`] is an iterator: every call to `next` trains one epoch
//! and yields its [`EpochReport`]. The caller decides how fast to drive it
//! and may stop early, either by dropping the iterator or through a
//! [`StopHandle`], which is honored at the next epoch boundary.

use crate::config::ModelConfig;
use crate::error::{ForecastError, Result};
use crate::models::{Adam, SequencePredictor, SequenceRegressor};
use crate::window::WindowSample;
use std::fmt;
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Loop settings for a training run
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of samples, taken from the end, used only for validation loss
    pub validation_split: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self::from(&ModelConfig::default())
    }
}

impl From<&ModelConfig> for TrainingOptions {
    fn from(config: &ModelConfig) -> Self {
        Self {
            epochs: config.epochs,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            validation_split: config.validation_split,
        }
    }
}

/// Losses after one epoch
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EpochReport {
    /// 1-based epoch number
    pub epoch: usize,
    /// Sample-weighted mean of the batch losses of the epoch
    pub train_loss: f64,
    /// Loss on the validation tail; `None` without a validation split
    pub val_loss: Option<f64>,
}

impl fmt::Display for EpochReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Epoch {:>3}: loss {:.5}", self.epoch, self.train_loss)?;
        if let Some(val_loss) = self.val_loss {
            write!(f, ", val_loss {:.5}", val_loss)?;
        }
        Ok(())
    }
}

/// Answer of a progress callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingControl {
    Continue,
    Stop,
}

/// Shared flag asking a run to stop at the next epoch boundary
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A lazy, finite sequence of training epochs
#[derive(Debug)]
pub struct TrainingRun {
    model: SequenceRegressor,
    optimizer: Adam,
    train: Vec<WindowSample>,
    validation: Vec<WindowSample>,
    options: TrainingOptions,
    epoch: usize,
    stop: StopHandle,
    finished: bool,
    error: Option<ForecastError>,
}

impl TrainingRun {
    /// Prepare a run; the validation tail is split off `samples` here
    pub fn new(
        model: SequenceRegressor,
        mut samples: Vec<WindowSample>,
        options: TrainingOptions,
    ) -> Result<Self> {
        if options.epochs == 0 || options.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Epochs and batch size must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&options.validation_split) {
            return Err(ForecastError::InvalidParameter(format!(
                "Validation split must be in [0, 1), got {}",
                options.validation_split
            )));
        }

        let length = model.sequence_length();
        if let Some(sample) = samples.iter().find(|s| s.input.len() != length) {
            return Err(ForecastError::InvalidParameter(format!(
                "Model expects windows of {} values, got a window of {}",
                length,
                sample.input.len()
            )));
        }

        let n = samples.len();
        let fit_len = (n as f64 * (1.0 - options.validation_split) + 1e-9).floor() as usize;
        let fit_len = fit_len.min(n);
        if fit_len == 0 {
            return Err(ForecastError::InsufficientData(format!(
                "No training samples left after holding back validation from {}",
                n
            )));
        }
        let validation = samples.split_off(fit_len);

        Ok(Self {
            model,
            optimizer: Adam::new(options.learning_rate),
            train: samples,
            validation,
            options,
            epoch: 0,
            stop: StopHandle::default(),
            finished: false,
            error: None,
        })
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn epochs_completed(&self) -> usize {
        self.epoch
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn train_len(&self) -> usize {
        self.train.len()
    }

    pub fn validation_len(&self) -> usize {
        self.validation.len()
    }

    /// Error that aborted the run, if any; taking it clears it
    pub fn take_error(&mut self) -> Option<ForecastError> {
        self.error.take()
    }

    #[cfg(test)]
    pub(crate) fn train_samples_mut(&mut self) -> &mut Vec<WindowSample> {
        &mut self.train
    }

    pub fn model(&self) -> &SequenceRegressor {
        &self.model
    }

    /// The model as trained so far
    pub fn into_model(self) -> SequenceRegressor {
        self.model
    }

    fn run_epoch(&mut self) -> Result<EpochReport> {
        let mut weighted = 0.0;
        for batch in self.train.chunks(self.options.batch_size) {
            let loss = self.model.train_batch(batch, &mut self.optimizer)?;
            weighted += loss * batch.len() as f64;
        }
        self.epoch += 1;

        Ok(EpochReport {
            epoch: self.epoch,
            train_loss: weighted / self.train.len() as f64,
            val_loss: self.model.evaluate_loss(&self.validation),
        })
    }
}

impl Iterator for TrainingRun {
    type Item = EpochReport;

    fn next(&mut self) -> Option<EpochReport> {
        if self.finished {
            return None;
        }
        if self.epoch >= self.options.epochs || self.stop.is_stop_requested() {
            self.finished = true;
            return None;
        }

        match self.run_epoch() {
            Ok(report) => {
                info!(
                    epoch = report.epoch,
                    epochs = self.options.epochs,
                    train_loss = report.train_loss,
                    val_loss = ?report.val_loss,
                    "Epoch finished"
                );
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, epoch = self.epoch + 1, "Training aborted");
                self.finished = true;
                self.error = Some(e);
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.finished {
            (0, Some(0))
        } else {
            (0, Some(self.options.epochs - self.epoch))
        }
    }
}

impl FusedIterator for TrainingRun {}
