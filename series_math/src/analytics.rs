//! Exploratory statistics over an aggregated series
//!
//! Contains read-only views used while exploring a series:
//! - Trailing rolling mean
//! - Histogram with uniform bins
//! - Day-of-week averages
//! - Autocorrelation by lag
//! - Summary statistics

use crate::{MathError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Smallest rolling-mean width accepted
pub const MIN_ROLLING_WINDOW: usize = 3;

/// Weekday labels in bucket order, Sunday first
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// Trailing rolling mean.
///
/// The width is raised to [`MIN_ROLLING_WINDOW`] if smaller. Leading
/// positions average over the shorter prefix instead of padding.
pub fn rolling_mean(values: &[f64], window: usize) -> Vec<f64> {
    let window = window.max(MIN_ROLLING_WINDOW);
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;

    for (i, &value) in values.iter().enumerate() {
        sum += value;
        if i >= window {
            sum -= values[i - window];
        }
        let width = (i + 1).min(window);
        out.push(sum / width as f64);
    }

    out
}

/// Histogram with uniform bin width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    /// Bin edges, `counts.len() + 1` entries
    pub edges: Vec<f64>,
    /// Number of values falling in each bin
    pub counts: Vec<usize>,
}

impl Histogram {
    /// Human readable `low–high` label per bin, one decimal place
    pub fn labels(&self) -> Vec<String> {
        self.edges
            .windows(2)
            .map(|edge| format!("{:.1}–{:.1}", edge[0], edge[1]))
            .collect()
    }

    pub fn bins(&self) -> usize {
        self.counts.len()
    }
}

/// Build a histogram with `bins` equal-width bins between min and max.
///
/// A zero-width range uses a bin width of 1. The maximum lands in the last bin.
pub fn histogram(values: &[f64], bins: usize) -> Result<Histogram> {
    if bins == 0 {
        return Err(MathError::InvalidInput(
            "Histogram needs at least one bin".to_string(),
        ));
    }
    if values.is_empty() {
        return Err(MathError::InsufficientData(
            "Cannot build a histogram of an empty series".to_string(),
        ));
    }

    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let width = match (max - min) / bins as f64 {
        w if w > 0.0 && w.is_finite() => w,
        _ => 1.0,
    };

    let edges = (0..=bins).map(|i| min + i as f64 * width).collect();
    let mut counts = vec![0; bins];
    for &value in values {
        let idx = ((value - min) / width).floor();
        let idx = if idx < 0.0 { 0 } else { (idx as usize).min(bins - 1) };
        counts[idx] += 1;
    }

    Ok(Histogram { edges, counts })
}

/// Mean value per weekday, Sunday first
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DayOfWeekAverages {
    /// Average per weekday; 0 for weekdays without observations
    pub averages: [f64; 7],
    /// Observations per weekday
    pub counts: [usize; 7],
}

impl DayOfWeekAverages {
    pub fn labels(&self) -> [&'static str; 7] {
        WEEKDAY_LABELS
    }
}

/// Group values by calendar weekday and average each group.
///
/// Entries without a valid date are skipped.
pub fn day_of_week_averages(dates: &[Option<NaiveDate>], values: &[f64]) -> DayOfWeekAverages {
    let mut sums = [0.0; 7];
    let mut counts = [0usize; 7];

    for (date, value) in dates.iter().zip(values) {
        if let Some(date) = date {
            let day = date.weekday().num_days_from_sunday() as usize;
            sums[day] += value;
            counts[day] += 1;
        }
    }

    let mut averages = [0.0; 7];
    for day in 0..7 {
        if counts[day] > 0 {
            averages[day] = sums[day] / counts[day] as f64;
        }
    }

    DayOfWeekAverages { averages, counts }
}

/// Sample autocorrelation for lags `1..=max_lag`.
///
/// Each lag's autocovariance is divided by the lag-0 sum of squares, taken
/// as 1 when the series is constant or empty.
pub fn autocorrelation(values: &[f64], max_lag: usize) -> Vec<f64> {
    let mean = crate::mean(values).unwrap_or(0.0);
    let denom = match values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() {
        d if d == 0.0 => 1.0,
        d => d,
    };

    (1..=max_lag)
        .map(|lag| {
            let num: f64 = (lag..values.len())
                .map(|t| (values[t] - mean) * (values[t - lag] - mean))
                .sum();
            num / denom
        })
        .collect()
}

/// Basic descriptive statistics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

/// Count, mean, population std, min and max of a non-empty series
pub fn summary_stats(values: &[f64]) -> Result<SummaryStats> {
    let mean = crate::mean(values).ok_or_else(|| {
        MathError::InsufficientData("No values to summarize".to_string())
    })?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;

    Ok(SummaryStats {
        count: values.len(),
        mean,
        std: variance.sqrt(),
        min: values.iter().copied().fold(f64::INFINITY, f64::min),
        max: values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    })
}
