//! Tabular data handling for demand forecasting
//!
//! Rows arrive with arbitrary schemas (CSV exports, JSON records, an
//! injected in-memory dataset, or the synthetic demo). This module keeps
//! them as ordered column/value pairs, infers which columns hold the date
//! and the target quantity, and exposes the aggregated [`TimeSeries`].

use crate::error::{ForecastError, Result};
use crate::utils::date_parser;
use chrono::{Datelike, Days, NaiveDate, Weekday};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use series_math::analytics::{summary_stats, SummaryStats};
use std::collections::BTreeSet;
use std::f64::consts::PI;
use std::fmt;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Date column candidates, in priority order, after name normalization
pub const DATE_CANDIDATES: &[&str] = &["date", "ds", "day", "timestamp", "time"];

/// Target column candidates, in priority order, after name normalization
pub const TARGET_CANDIDATES: &[&str] = &[
    "unitssold",
    "demand",
    "qty",
    "quantity",
    "sales",
    "units",
    "consumption",
    "demandforecast",
    "unitsordered",
    "orders",
    "value",
];

/// Length of the synthetic demo series, in days
pub const DEMO_DAYS: usize = 365;

/// A single raw cell value
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    /// The value as a finite number, if it is one or parses as one
    pub fn as_f64(&self) -> Option<f64> {
        let value = match self {
            CellValue::Number(v) => Some(*v),
            CellValue::Text(s) => s.trim().parse::<f64>().ok(),
            CellValue::Null | CellValue::Bool(_) => None,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Null => Ok(()),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Number(v) => write!(f, "{}", v),
            CellValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => CellValue::Null,
            Value::Bool(b) => CellValue::Bool(b),
            Value::Number(n) => n.as_f64().map_or(CellValue::Null, CellValue::Number),
            Value::String(s) => CellValue::Text(s),
            nested => CellValue::Text(nested.to_string()),
        }
    }
}

/// Categorical dimensions that can be filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Store,
    Product,
    Region,
}

impl Dimension {
    pub const ALL: [Dimension; 3] = [Dimension::Store, Dimension::Product, Dimension::Region];

    /// Column names recognized for this dimension, first match wins
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Dimension::Store => &["Store ID", "store", "store_id"],
            Dimension::Product => &["Product ID", "product", "product_id"],
            Dimension::Region => &["Region", "region"],
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Store => "store",
            Dimension::Product => "product",
            Dimension::Region => "region",
        };
        f.pad(name)
    }
}

/// One record: ordered column/value pairs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, CellValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, column: impl Into<String>, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a cell, replacing an existing value for the same column
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        let column = column.into();
        let value = value.into();
        match self.cells.iter_mut().find(|(name, _)| *name == column) {
            Some((_, cell)) => *cell = value,
            None => self.cells.push((column, value)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    /// Column names in source order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Value of a categorical dimension, from the first non-null alias column
    pub fn dimension(&self, dimension: Dimension) -> Option<String> {
        dimension
            .aliases()
            .iter()
            .find_map(|alias| self.get(alias).filter(|value| !value.is_null()))
            .map(CellValue::to_string)
    }
}

impl<S: Into<String>> FromIterator<(S, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (S, CellValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Loaded rows plus their column list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Build a dataset whose columns are those of the first row
    pub fn new(rows: Vec<Row>) -> Self {
        let columns = rows
            .first()
            .map(|row| row.columns().map(str::to_string).collect())
            .unwrap_or_default();
        Self { columns, rows }
    }

    /// Build a dataset with an explicit column list (e.g. a CSV header)
    pub fn with_columns(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Columns holding at least one finite numeric value
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .filter(|column| {
                self.rows
                    .iter()
                    .any(|row| row.get(column).and_then(CellValue::as_f64).is_some())
            })
            .cloned()
            .collect()
    }

    /// Sorted distinct non-empty values of a categorical dimension
    pub fn distinct_values(&self, dimension: Dimension) -> Vec<String> {
        self.rows
            .iter()
            .filter_map(|row| row.dimension(dimension))
            .filter(|value| !value.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Row count, date range and target statistics over the raw rows
    pub fn summary(&self, date_column: &str, target_column: &str) -> DatasetSummary {
        let dates: Vec<NaiveDate> = self
            .rows
            .iter()
            .filter_map(|row| row.get(date_column).and_then(date_parser::parse_cell))
            .collect();
        let targets: Vec<f64> = self
            .rows
            .iter()
            .filter_map(|row| row.get(target_column).and_then(CellValue::as_f64))
            .collect();

        DatasetSummary {
            rows: self.rows.len(),
            date_column: date_column.to_string(),
            target_column: target_column.to_string(),
            first_date: dates.iter().min().copied(),
            last_date: dates.iter().max().copied(),
            target: summary_stats(&targets).ok(),
        }
    }
}

/// Overview of a loaded dataset for the chosen columns
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary {
    pub rows: usize,
    pub date_column: String,
    pub target_column: String,
    /// Earliest parseable date
    pub first_date: Option<NaiveDate>,
    /// Latest parseable date
    pub last_date: Option<NaiveDate>,
    /// Statistics over the finite target values; `None` if there are none
    pub target: Option<SummaryStats>,
}

impl fmt::Display for DatasetSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |date: Option<NaiveDate>| date.map(|d| d.to_string()).unwrap_or_default();
        writeln!(f, "Rows: {}", self.rows)?;
        writeln!(
            f,
            "Date range: {} → {}",
            show(self.first_date),
            show(self.last_date)
        )?;
        match &self.target {
            Some(stats) => writeln!(
                f,
                "Target: {} | mean: {:.2} std: {:.2} min: {:.2} max: {:.2}",
                self.target_column, stats.mean, stats.std, stats.min, stats.max
            ),
            None => writeln!(f, "Target: {} | no numeric values", self.target_column),
        }
    }
}

/// Date and target column chosen for a dataset
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSelection {
    pub date: Option<String>,
    pub target: Option<String>,
}

/// Lower-case a column name and strip everything but `[a-z0-9]`
pub fn normalize_column_name(name: &str) -> String {
    name.chars()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Pick the first candidate with an exact normalized match, then the first
/// column containing any candidate.
fn pick_column(names: &[String], normalized: &[String], candidates: &[&str]) -> Option<String> {
    candidates
        .iter()
        .find_map(|candidate| normalized.iter().position(|n| n == candidate))
        .or_else(|| {
            normalized
                .iter()
                .position(|n| candidates.iter().any(|candidate| n.contains(candidate)))
        })
        .map(|idx| names[idx].clone())
}

/// Infer the date and target columns from the column names.
///
/// Falls back to the first column for the date and the second for the
/// target. A dataset without rows yields an empty selection.
pub fn detect_columns(dataset: &Dataset) -> ColumnSelection {
    if dataset.is_empty() {
        return ColumnSelection::default();
    }

    let names = dataset.columns();
    let normalized: Vec<String> = names.iter().map(|n| normalize_column_name(n)).collect();

    let selection = ColumnSelection {
        date: pick_column(names, &normalized, DATE_CANDIDATES).or_else(|| names.first().cloned()),
        target: pick_column(names, &normalized, TARGET_CANDIDATES)
            .or_else(|| names.get(1).cloned()),
    };
    debug!(date = ?selection.date, target = ?selection.target, "Detected columns");
    selection
}

/// Aggregated series: one value per distinct date, ascending
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeSeries {
    dates: Vec<Option<NaiveDate>>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Create a series from parallel dates and values
    pub fn new(dates: Vec<Option<NaiveDate>>, values: Vec<f64>) -> Result<Self> {
        if dates.len() != values.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Dates length ({}) doesn't match values length ({})",
                dates.len(),
                values.len()
            )));
        }
        Ok(Self { dates, values })
    }

    pub(crate) fn from_parts(dates: Vec<Option<NaiveDate>>, values: Vec<f64>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        Self { dates, values }
    }

    /// Dates; `None` where the raw date could not be parsed
    pub fn dates(&self) -> &[Option<NaiveDate>] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Most recent valid date
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.iter().rev().find_map(|d| *d)
    }

    /// `YYYY-MM-DD` labels, empty for unparseable dates
    pub fn labels(&self) -> Vec<String> {
        self.dates
            .iter()
            .map(|d| d.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default())
            .collect()
    }
}

/// Data loader for the supported input sources
#[derive(Debug)]
pub struct DataLoader;

impl DataLoader {
    /// Load a file, choosing JSON for a `.json` extension and CSV otherwise
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let path = path.as_ref();
        let is_json = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json(path)
        } else {
            Self::from_csv(path)
        }
    }

    /// Load rows from a delimited text file with a header row
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let file = File::open(path.as_ref())?;
        let dataset = Self::from_csv_reader(file)?;
        info!(path = %path.as_ref().display(), rows = dataset.len(), "Loaded CSV");
        Ok(dataset)
    }

    /// Read delimited text: trimmed fields, short records padded with nulls
    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Dataset> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            if record.iter().all(str::is_empty) {
                continue;
            }
            let row: Row = headers
                .iter()
                .enumerate()
                .map(|(i, header)| {
                    let value = record
                        .get(i)
                        .map_or(CellValue::Null, |field| CellValue::Text(field.to_string()));
                    (header.clone(), value)
                })
                .collect();
            rows.push(row);
        }

        Self::non_empty(Dataset::with_columns(headers, rows))
    }

    /// Load an array of JSON objects from a file
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Dataset> {
        let text = fs::read_to_string(path.as_ref())?;
        let dataset = Self::from_json_str(&text)?;
        info!(path = %path.as_ref().display(), rows = dataset.len(), "Loaded JSON");
        Ok(dataset)
    }

    /// Parse an array of JSON objects, keeping each object's key order
    pub fn from_json_str(text: &str) -> Result<Dataset> {
        let records: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(text)?;
        let rows: Vec<Row> = records
            .into_iter()
            .map(|record| {
                record
                    .into_iter()
                    .map(|(column, value)| (column, CellValue::from(value)))
                    .collect()
            })
            .collect();

        Self::non_empty(Dataset::new(rows))
    }

    /// Wrap rows injected by the host environment
    pub fn from_rows(rows: Vec<Row>) -> Result<Dataset> {
        let dataset = Self::non_empty(Dataset::new(rows))?;
        info!(rows = dataset.len(), "Loaded injected rows");
        Ok(dataset)
    }

    /// Synthetic daily demand starting 2024-01-01.
    ///
    /// Weekly sine seasonality, a Saturday bump, a linear trend and uniform
    /// noise, clipped at zero and rounded to two decimals.
    pub fn synthetic<R: Rng + ?Sized>(days: usize, rng: &mut R) -> Dataset {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or(NaiveDate::MIN);
        let noise = Uniform::new(-0.5, 0.5);

        let rows = (0..days)
            .map(|i| {
                let date = start + Days::new(i as u64);
                let t = i as f64;
                let weekend = if date.weekday() == Weekday::Sat { 18.0 } else { 0.0 };
                let value = 120.0
                    + 15.0 * (2.0 * PI * t / 7.0).sin()
                    + weekend
                    + 0.07 * t
                    + noise.sample(rng) * 12.0;
                let value = (value.max(0.0) * 100.0).round() / 100.0;

                Row::new()
                    .with("Date", date.format("%Y-%m-%d").to_string())
                    .with("Store ID", "S001")
                    .with("Product ID", "P0001")
                    .with("Region", "North")
                    .with("Units Sold", value)
            })
            .collect();

        Dataset::new(rows)
    }

    /// The 365-day demo dataset with fresh noise
    pub fn demo() -> Dataset {
        let dataset = Self::synthetic(DEMO_DAYS, &mut rand::thread_rng());
        info!(rows = dataset.len(), "Generated demo rows");
        dataset
    }

    fn non_empty(dataset: Dataset) -> Result<Dataset> {
        if dataset.is_empty() {
            return Err(ForecastError::MissingInput("No rows found".to_string()));
        }
        Ok(dataset)
    }
}
