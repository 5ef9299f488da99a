//! Recurrent sequence models for one-step demand prediction
//!
//! A single recurrent layer (GRU or LSTM) reads a window of normalized
//! values and hands its final hidden state to a small dense head. Gradients
//! are computed exactly by backpropagation through time and applied with
//! Adam.

use crate::error::{ForecastError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayViewD, ArrayViewMutD};
use rand::Rng;
use rand_distr::{Distribution, Uniform};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::str::FromStr;

pub mod dense;
pub mod gru;
pub mod lstm;
pub mod network;
pub mod optimizer;

pub use dense::{Activation, Dense};
pub use gru::GruCell;
pub use lstm::LstmCell;
pub use network::SequenceRegressor;
pub use optimizer::Adam;

/// Recurrent cell used by the regressor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Gru,
    Lstm,
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelKind::Gru => f.write_str("GRU"),
            ModelKind::Lstm => f.write_str("LSTM"),
        }
    }
}

impl FromStr for ModelKind {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gru" => Ok(ModelKind::Gru),
            "lstm" => Ok(ModelKind::Lstm),
            other => Err(ForecastError::InvalidParameter(format!(
                "Unknown model kind '{}'",
                other
            ))),
        }
    }
}

/// A fitted model mapping a window of `L` values to the next value
pub trait SequencePredictor: Debug {
    /// Window length `L` the model expects
    fn sequence_length(&self) -> usize;

    /// Predict the value following `window`
    fn predict_one(&self, window: &[f64]) -> Result<f64>;

    /// Predict for each window in order
    fn predict_many(&self, windows: &[Vec<f64>]) -> Result<Vec<f64>> {
        windows.iter().map(|w| self.predict_one(w)).collect()
    }

    /// Name of the model
    fn name(&self) -> &str;
}

/// Trainable weights exposed as flat views, always in the same order
pub trait Parameters {
    fn params(&self) -> Vec<ArrayViewD<'_, f64>>;

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>>;

    /// Same shapes, all zeros; used as a gradient accumulator
    fn zeros_like(&self) -> Self
    where
        Self: Sized;

    /// Total number of scalar weights
    fn parameter_count(&self) -> usize {
        self.params().iter().map(|p| p.len()).sum()
    }
}

/// Weights of one gate: input kernel, recurrent kernel and bias
#[derive(Debug, Clone, PartialEq)]
pub struct Gate {
    pub(crate) w_x: Array2<f64>,
    pub(crate) w_h: Array2<f64>,
    pub(crate) b: Array1<f64>,
}

impl Gate {
    /// Glorot-uniform kernels with fan-out taken over all `gates` of the cell
    pub(crate) fn new<R: Rng + ?Sized>(
        input_size: usize,
        hidden_size: usize,
        gates: usize,
        bias: f64,
        rng: &mut R,
    ) -> Self {
        Self {
            w_x: glorot_uniform(hidden_size, input_size, input_size, gates * hidden_size, rng),
            w_h: glorot_uniform(hidden_size, hidden_size, hidden_size, gates * hidden_size, rng),
            b: Array1::from_elem(hidden_size, bias),
        }
    }

    /// `W_x x + W_h h + b`
    pub(crate) fn preactivation(&self, x: &Array1<f64>, h: &Array1<f64>) -> Array1<f64> {
        self.w_x.dot(x) + self.w_h.dot(h) + &self.b
    }

    /// Add this gate's weight gradients for pre-activation gradient `da`
    pub(crate) fn accumulate(
        grad: &mut Gate,
        da: &Array1<f64>,
        x: &Array1<f64>,
        h: &Array1<f64>,
    ) {
        grad.w_x += &outer(da.view(), x.view());
        grad.w_h += &outer(da.view(), h.view());
        grad.b += da;
    }

    /// Gradient flowing back into the recurrent input
    pub(crate) fn backprop_hidden(&self, da: &Array1<f64>) -> Array1<f64> {
        self.w_h.t().dot(da)
    }
}

impl Parameters for Gate {
    fn params(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![
            self.w_x.view().into_dyn(),
            self.w_h.view().into_dyn(),
            self.b.view().into_dyn(),
        ]
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.w_x.view_mut().into_dyn(),
            self.w_h.view_mut().into_dyn(),
            self.b.view_mut().into_dyn(),
        ]
    }

    fn zeros_like(&self) -> Self {
        Self {
            w_x: Array2::zeros(self.w_x.raw_dim()),
            w_h: Array2::zeros(self.w_h.raw_dim()),
            b: Array1::zeros(self.b.raw_dim()),
        }
    }
}

pub(crate) fn sigmoid(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(|v| 1.0 / (1.0 + (-v).exp()))
}

pub(crate) fn tanh(x: &Array1<f64>) -> Array1<f64> {
    x.mapv(f64::tanh)
}

/// Column vector `a` times row vector `b`
pub(crate) fn outer(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> Array2<f64> {
    let a = a.insert_axis(ndarray::Axis(1));
    let b = b.insert_axis(ndarray::Axis(0));
    a.dot(&b)
}

/// `rows x cols` matrix drawn from `U(-limit, limit)`, `limit = sqrt(6 / (fan_in + fan_out))`
pub(crate) fn glorot_uniform<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    fan_in: usize,
    fan_out: usize,
    rng: &mut R,
) -> Array2<f64> {
    let limit = (6.0 / (fan_in + fan_out).max(1) as f64).sqrt();
    let dist = Uniform::new_inclusive(-limit, limit);
    Array2::from_shape_simple_fn((rows, cols), || dist.sample(rng))
}
