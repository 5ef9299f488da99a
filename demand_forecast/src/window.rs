//! Supervised windows over a series and the chronological train/test split

use crate::error::{ForecastError, Result};

/// Fewest training windows a model can be fitted on
pub const MIN_TRAINING_SAMPLES: usize = 10;

/// `L` consecutive values and the value that follows them
#[derive(Debug, Clone, PartialEq)]
pub struct WindowSample {
    pub input: Vec<f64>,
    pub target: f64,
}

/// Slide a window of `sequence_length` over `series` with stride 1.
///
/// Produces `len - L` samples, none when the series is not longer than `L`.
pub fn make_windows(series: &[f64], sequence_length: usize) -> Vec<WindowSample> {
    if sequence_length == 0 || series.len() <= sequence_length {
        return Vec::new();
    }
    series
        .windows(sequence_length + 1)
        .map(|w| WindowSample {
            input: w[..sequence_length].to_vec(),
            target: w[sequence_length],
        })
        .collect()
}

/// Train prefix and test suffix of a sample list
#[derive(Debug, Clone, PartialEq)]
pub struct ChronologicalSplit {
    pub train: Vec<WindowSample>,
    pub test: Vec<WindowSample>,
    /// Number of training samples; the index of the first test sample
    pub split_index: usize,
}

/// Keep the last `max(1, ceil(n * test_ratio))` samples for testing.
///
/// Order is preserved; nothing is shuffled.
pub fn chronological_split(
    samples: Vec<WindowSample>,
    test_ratio: f64,
) -> Result<ChronologicalSplit> {
    if !(test_ratio > 0.0 && test_ratio < 1.0) {
        return Err(ForecastError::InvalidParameter(format!(
            "Test ratio must be in (0, 1), got {}",
            test_ratio
        )));
    }
    let n = samples.len();
    if n == 0 {
        return Err(ForecastError::InsufficientData(
            "No samples to split".to_string(),
        ));
    }

    // 1e-9 keeps products such as 10 * 0.2 from rounding up past the integer.
    let test_len = ((n as f64 * test_ratio - 1e-9).ceil() as usize).clamp(1, n);
    let split_index = n - test_len;

    let mut train = samples;
    let test = train.split_off(split_index);
    Ok(ChronologicalSplit {
        train,
        test,
        split_index,
    })
}
