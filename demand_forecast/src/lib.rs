//! # Demand Forecast
//!
//! A Rust library for preparing demand time series, training recurrent
//! forecasting models on them and scoring the forecasts.
//!
//! ## Features
//!
//! - Loading rows from CSV, JSON, an injected dataset or a synthetic demo
//! - Date and target column inference from column names
//! - Store/product/region filtering and per-date aggregation (sum, mean, last)
//! - Exploratory statistics (rolling mean, histogram, weekday profile, ACF)
//! - GRU and LSTM regressors trained with backpropagation through time and Adam
//! - Iterator-driven training with early stop at epoch boundaries
//! - Recursive multi-step forecasts and test-set evaluation (MAE, RMSE, MAPE, SMAPE, R²)
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use demand_forecast::{DataSource, TrainingControl, Workbench, WorkbenchConfig};
//!
//! let mut bench = Workbench::new(WorkbenchConfig::default());
//! bench.load(DataSource::Demo)?;
//!
//! // Train, printing each epoch
//! bench.train(|report| {
//!     println!("epoch {} loss {:.4}", report.epoch, report.train_loss);
//!     TrainingControl::Continue
//! })?;
//!
//! for point in bench.forecast()? {
//!     println!("{}", point);
//! }
//! println!("{}", bench.evaluate()?.metrics);
//! # Ok::<(), demand_forecast::ForecastError>(())
//! ```

pub mod aggregate;
pub mod config;
pub mod data;
pub mod error;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod session;
pub mod training;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use crate::aggregate::{AggregationMode, CategoryFilter};
pub use crate::config::{DataConfig, ForecastConfig, ModelConfig, WorkbenchConfig};
pub use crate::data::{CellValue, DataLoader, Dataset, Dimension, Row, TimeSeries};
pub use crate::error::{ForecastError, Result};
pub use crate::forecast::ForecastPoint;
pub use crate::metrics::Evaluation;
pub use crate::models::{ModelKind, SequencePredictor, SequenceRegressor};
pub use crate::session::{DataSource, Exploration, TrainingJob, Workbench};
pub use crate::training::{EpochReport, StopHandle, TrainingControl, TrainingRun};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
