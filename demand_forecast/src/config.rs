//! Workbench configuration
//!
//! Every knob the presentation layer exposes, as plain serde values. A
//! configuration can be built in code, or read from JSON where missing
//! fields fall back to their defaults.

use crate::aggregate::{AggregationMode, CategoryFilter};
use crate::error::{ForecastError, Result};
use crate::models::ModelKind;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Data preparation and exploration settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Date column; inferred from the column names when `None`
    pub date_column: Option<String>,
    /// Target column; inferred from the column names when `None`
    pub target_column: Option<String>,
    /// How rows sharing a date are merged
    pub aggregation: AggregationMode,
    /// Categorical filters applied before aggregation
    pub filters: CategoryFilter,
    /// Rolling-mean width used during exploration
    pub rolling_window: usize,
    /// Histogram bin count used during exploration
    pub histogram_bins: usize,
    /// Highest autocorrelation lag reported
    pub max_lag: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            date_column: None,
            target_column: None,
            aggregation: AggregationMode::Sum,
            filters: CategoryFilter::default(),
            rolling_window: 7,
            histogram_bins: 24,
            max_lag: 30,
        }
    }
}

/// Sequence model and training settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ModelKind,
    /// Window length L fed to the recurrent layer
    pub sequence_length: usize,
    /// Width of the recurrent layer
    pub hidden_units: usize,
    /// Input dropout probability of the recurrent layer, in `[0, 1)`.
    /// Applied per training window: a dropped window is zeroed at every step.
    pub dropout: f64,
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    /// Fraction of the training windows held back (from the end) for validation loss
    pub validation_split: f64,
    /// Fraction of all windows held back (from the end) for evaluation
    pub test_ratio: f64,
    /// Seed for weight initialization and dropout; random when `None`
    pub seed: Option<u64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::Gru,
            sequence_length: 14,
            hidden_units: 32,
            dropout: 0.1,
            epochs: 30,
            batch_size: 32,
            learning_rate: 0.001,
            validation_split: 0.1,
            test_ratio: 0.2,
            seed: None,
        }
    }
}

/// Forecast settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Number of future days produced by a rollout
    pub horizon: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self { horizon: 14 }
    }
}

/// Complete workbench configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    pub data: DataConfig,
    pub model: ModelConfig,
    pub forecast: ForecastConfig,
}

impl WorkbenchConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check that every value is in range
    pub fn validate(&self) -> Result<()> {
        self.data.validate()?;
        self.model.validate()?;
        if self.forecast.horizon == 0 {
            return Err(ForecastError::InvalidParameter(
                "Forecast horizon must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl DataConfig {
    pub fn validate(&self) -> Result<()> {
        if self.histogram_bins == 0 {
            return Err(ForecastError::InvalidParameter(
                "Histogram bin count must be positive".to_string(),
            ));
        }
        if self.max_lag == 0 {
            return Err(ForecastError::InvalidParameter(
                "Autocorrelation lag must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sequence_length == 0 {
            return Err(ForecastError::InvalidParameter(
                "Sequence length must be positive".to_string(),
            ));
        }
        if self.hidden_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Hidden units must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "Dropout must be in [0, 1), got {}",
                self.dropout
            )));
        }
        if self.epochs == 0 || self.batch_size == 0 {
            return Err(ForecastError::InvalidParameter(
                "Epochs and batch size must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(ForecastError::InvalidParameter(format!(
                "Learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ForecastError::InvalidParameter(format!(
                "Validation split must be in [0, 1), got {}",
                self.validation_split
            )));
        }
        if !(self.test_ratio > 0.0 && self.test_ratio < 1.0) {
            return Err(ForecastError::InvalidParameter(format!(
                "Test ratio must be in (0, 1), got {}",
                self.test_ratio
            )));
        }
        Ok(())
    }
}
