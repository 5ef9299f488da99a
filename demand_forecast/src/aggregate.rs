//! Category filtering and per-date aggregation

use crate::data::{CellValue, Dimension, Row, TimeSeries};
use crate::error::{ForecastError, Result};
use crate::utils::date_parser;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// How rows sharing a date are merged into one value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    #[default]
    Sum,
    Mean,
    /// Last value encountered in input order
    Last,
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregationMode::Sum => "sum",
            AggregationMode::Mean => "mean",
            AggregationMode::Last => "last",
        };
        f.write_str(name)
    }
}

impl FromStr for AggregationMode {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sum" => Ok(AggregationMode::Sum),
            "mean" | "avg" | "average" => Ok(AggregationMode::Mean),
            "last" => Ok(AggregationMode::Last),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown aggregation '{}'",
                other
            ))),
        }
    }
}

/// Exact-match filters on store, product and region; `None` means all
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryFilter {
    pub store: Option<String>,
    pub product: Option<String>,
    pub region: Option<String>,
}

impl CategoryFilter {
    pub fn get(&self, dimension: Dimension) -> Option<&str> {
        match dimension {
            Dimension::Store => self.store.as_deref(),
            Dimension::Product => self.product.as_deref(),
            Dimension::Region => self.region.as_deref(),
        }
    }

    /// Set one dimension. `"all"` (any case) or an empty value clears it.
    pub fn set(&mut self, dimension: Dimension, value: Option<String>) {
        let value = value.filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("all"));
        match dimension {
            Dimension::Store => self.store = value,
            Dimension::Product => self.product = value,
            Dimension::Region => self.region = value,
        }
    }

    pub fn with(mut self, dimension: Dimension, value: impl Into<String>) -> Self {
        self.set(dimension, Some(value.into()));
        self
    }

    /// Whether no dimension is restricted
    pub fn is_unfiltered(&self) -> bool {
        Dimension::ALL.iter().all(|d| self.get(*d).is_none())
    }

    /// Whether a row passes every active filter
    pub fn matches(&self, row: &Row) -> bool {
        Dimension::ALL.iter().all(|&dimension| match self.get(dimension) {
            None => true,
            Some(wanted) => row.dimension(dimension).as_deref() == Some(wanted),
        })
    }
}

#[derive(Debug)]
struct Bucket {
    cell: CellValue,
    sum: f64,
    count: usize,
    last: f64,
}

/// Filter rows and reduce them to one value per distinct date key.
///
/// Rows whose target is not a finite number are skipped. Keys are the raw
/// date cells rendered as text and come out sorted ascending as strings;
/// each is then parsed, with unparseable dates kept as `None`.
pub fn aggregate_by_date(
    rows: &[Row],
    date_column: &str,
    target_column: &str,
    mode: AggregationMode,
    filter: &CategoryFilter,
) -> TimeSeries {
    let mut buckets: BTreeMap<String, Bucket> = BTreeMap::new();
    let mut skipped = 0usize;

    for row in rows.iter().filter(|row| filter.matches(row)) {
        let Some(value) = row.get(target_column).and_then(CellValue::as_f64) else {
            skipped += 1;
            continue;
        };
        let cell = row.get(date_column).cloned().unwrap_or(CellValue::Null);
        let bucket = buckets.entry(cell.to_string()).or_insert_with(|| Bucket {
            cell,
            sum: 0.0,
            count: 0,
            last: 0.0,
        });
        bucket.sum += value;
        bucket.count += 1;
        bucket.last = value;
    }

    let (dates, values): (Vec<_>, Vec<_>) = buckets
        .into_values()
        .map(|bucket| {
            let value = match mode {
                AggregationMode::Sum => bucket.sum,
                AggregationMode::Mean => bucket.sum / bucket.count as f64,
                AggregationMode::Last => bucket.last,
            };
            (date_parser::parse_cell(&bucket.cell), value)
        })
        .unzip();

    debug!(
        points = values.len(),
        skipped,
        mode = %mode,
        "Aggregated rows by date"
    );

    TimeSeries::from_parts(dates, values)
}
