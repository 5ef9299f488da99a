//! # Demand Workbench
//!
//! `demand_workbench` bundles the workspace crates behind one dependency:
//! [`series_math`] for normalization, metrics and exploratory statistics,
//! and [`demand_forecast`] for loading, aggregation, recurrent-network
//! training and forecasting.
//!
//! ## Example
//!
//! ```
//! use demand_workbench::forecast::{DataSource, Workbench, WorkbenchConfig};
//!
//! let mut bench = Workbench::new(WorkbenchConfig::default());
//! let summary = bench.load(DataSource::Demo).unwrap();
//! assert_eq!(summary.rows, 365);
//!
//! let exploration = bench.explore().unwrap();
//! assert_eq!(exploration.day_of_week.labels()[0], "Sun");
//! ```

pub use demand_forecast as forecast;
pub use series_math as math;

pub use demand_forecast::{DataSource, ForecastError, Workbench, WorkbenchConfig};

/// Name and version of every crate in the workspace
pub fn crate_versions() -> [(&'static str, &'static str); 2] {
    [
        (demand_forecast::NAME, demand_forecast::VERSION),
        ("series_math", series_math::VERSION),
    ]
}
