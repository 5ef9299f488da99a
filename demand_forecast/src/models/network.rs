//! Recurrent regressor: one recurrent layer, Dense(32, ReLU), Dense(1)

use super::dense::DenseCache;
use super::gru::GruStep;
use super::lstm::LstmStep;
use super::{
    Activation, Adam, Dense, GruCell, LstmCell, ModelKind, Parameters, SequencePredictor,
};
use crate::error::{ForecastError, Result};
use crate::window::WindowSample;
use ndarray::{Array1, ArrayViewD, ArrayViewMutD};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Bernoulli, Distribution};
use tracing::debug;

/// Width of the dense layer between the recurrent layer and the output
pub const HIDDEN_DENSE_UNITS: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RecurrentLayer {
    Gru(GruCell),
    Lstm(LstmCell),
}

#[derive(Debug, Clone)]
enum RecurrentCache {
    Gru(Vec<GruStep>),
    Lstm(Vec<LstmStep>),
}

impl RecurrentLayer {
    fn new(kind: ModelKind, hidden_units: usize, rng: &mut StdRng) -> Self {
        match kind {
            ModelKind::Gru => RecurrentLayer::Gru(GruCell::new(1, hidden_units, rng)),
            ModelKind::Lstm => RecurrentLayer::Lstm(LstmCell::new(1, hidden_units, rng)),
        }
    }

    fn hidden_size(&self) -> usize {
        match self {
            RecurrentLayer::Gru(cell) => cell.hidden_size(),
            RecurrentLayer::Lstm(cell) => cell.hidden_size(),
        }
    }

    /// Final hidden state after reading `inputs` one value per step
    fn forward(&self, inputs: impl Iterator<Item = f64>) -> Array1<f64> {
        let zeros = Array1::zeros(self.hidden_size());
        match self {
            RecurrentLayer::Gru(cell) => inputs.fold(zeros, |h, value| {
                cell.step(&Array1::from_elem(1, value), &h)
            }),
            RecurrentLayer::Lstm(cell) => {
                let (h, _) = inputs.fold((zeros.clone(), zeros), |(h, c), value| {
                    cell.step(&Array1::from_elem(1, value), &h, &c)
                });
                h
            }
        }
    }

    fn forward_cached(&self, inputs: impl Iterator<Item = f64>) -> (Array1<f64>, RecurrentCache) {
        let mut h = Array1::zeros(self.hidden_size());
        match self {
            RecurrentLayer::Gru(cell) => {
                let mut steps = Vec::new();
                for value in inputs {
                    let (next, step) = cell.step_cached(&Array1::from_elem(1, value), &h);
                    steps.push(step);
                    h = next;
                }
                (h, RecurrentCache::Gru(steps))
            }
            RecurrentLayer::Lstm(cell) => {
                let mut c = Array1::zeros(self.hidden_size());
                let mut steps = Vec::new();
                for value in inputs {
                    let (next_h, next_c, step) =
                        cell.step_cached(&Array1::from_elem(1, value), &h, &c);
                    steps.push(step);
                    h = next_h;
                    c = next_c;
                }
                (h, RecurrentCache::Lstm(steps))
            }
        }
    }

    /// Backpropagation through time from the gradient of the final hidden state
    fn backward(&self, grad: &mut RecurrentLayer, cache: &RecurrentCache, dh_last: Array1<f64>) {
        match (self, grad, cache) {
            (RecurrentLayer::Gru(cell), RecurrentLayer::Gru(grad), RecurrentCache::Gru(steps)) => {
                steps.iter().rev().fold(dh_last, |dh, step| {
                    cell.backward_step(grad, step, &dh)
                });
            }
            (
                RecurrentLayer::Lstm(cell),
                RecurrentLayer::Lstm(grad),
                RecurrentCache::Lstm(steps),
            ) => {
                let dc_last = Array1::zeros(dh_last.raw_dim());
                steps.iter().rev().fold((dh_last, dc_last), |(dh, dc), step| {
                    cell.backward_step(grad, step, &dh, &dc)
                });
            }
            _ => unreachable!("recurrent layer, gradient and cache kinds always match"),
        }
    }
}

impl Parameters for RecurrentLayer {
    fn params(&self) -> Vec<ArrayViewD<'_, f64>> {
        match self {
            RecurrentLayer::Gru(cell) => cell.params(),
            RecurrentLayer::Lstm(cell) => cell.params(),
        }
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        match self {
            RecurrentLayer::Gru(cell) => cell.params_mut(),
            RecurrentLayer::Lstm(cell) => cell.params_mut(),
        }
    }

    fn zeros_like(&self) -> Self {
        match self {
            RecurrentLayer::Gru(cell) => RecurrentLayer::Gru(cell.zeros_like()),
            RecurrentLayer::Lstm(cell) => RecurrentLayer::Lstm(cell.zeros_like()),
        }
    }
}

/// All trainable layers, in parameter order
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Layers {
    recurrent: RecurrentLayer,
    hidden: Dense,
    output: Dense,
}

impl Parameters for Layers {
    fn params(&self) -> Vec<ArrayViewD<'_, f64>> {
        let mut params = self.recurrent.params();
        params.extend(self.hidden.params());
        params.extend(self.output.params());
        params
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut params = self.recurrent.params_mut();
        params.extend(self.hidden.params_mut());
        params.extend(self.output.params_mut());
        params
    }

    fn zeros_like(&self) -> Self {
        Self {
            recurrent: self.recurrent.zeros_like(),
            hidden: self.hidden.zeros_like(),
            output: self.output.zeros_like(),
        }
    }
}

struct SampleCache {
    recurrent: RecurrentCache,
    hidden: DenseCache,
    output: DenseCache,
}

/// Univariate recurrent regressor predicting the value after a window
#[derive(Debug, Clone)]
pub struct SequenceRegressor {
    name: String,
    kind: ModelKind,
    sequence_length: usize,
    dropout: f64,
    keep: Option<Bernoulli>,
    layers: Layers,
    rng: StdRng,
}

impl SequenceRegressor {
    /// Fresh, untrained network. A `seed` makes initialization and dropout repeatable.
    ///
    /// `dropout` is the probability that a training window is fed as zeros;
    /// one mask is drawn per sample and shared by every time step and gate.
    pub fn new(
        kind: ModelKind,
        sequence_length: usize,
        hidden_units: usize,
        dropout: f64,
        seed: Option<u64>,
    ) -> Result<Self> {
        if sequence_length == 0 || hidden_units == 0 {
            return Err(ForecastError::InvalidParameter(
                "Sequence length and hidden units must be positive".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&dropout) {
            return Err(ForecastError::InvalidParameter(format!(
                "Dropout must be in [0, 1), got {}",
                dropout
            )));
        }
        let keep = if dropout > 0.0 {
            let keep = Bernoulli::new(1.0 - dropout)
                .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
            Some(keep)
        } else {
            None
        };

        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let layers = Layers {
            recurrent: RecurrentLayer::new(kind, hidden_units, &mut rng),
            hidden: Dense::new(hidden_units, HIDDEN_DENSE_UNITS, Activation::Relu, &mut rng),
            output: Dense::new(HIDDEN_DENSE_UNITS, 1, Activation::Linear, &mut rng),
        };

        Ok(Self {
            name: format!("{}({})", kind, hidden_units),
            kind,
            sequence_length,
            dropout,
            keep,
            layers,
            rng,
        })
    }

    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    pub fn hidden_units(&self) -> usize {
        self.layers.recurrent.hidden_size()
    }

    pub fn dropout(&self) -> f64 {
        self.dropout
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.parameter_count()
    }

    fn check_window(&self, window: &[f64]) -> Result<()> {
        if window.len() != self.sequence_length {
            return Err(ForecastError::InvalidParameter(format!(
                "Expected a window of {} values, got {}",
                self.sequence_length,
                window.len()
            )));
        }
        Ok(())
    }

    fn forward(&self, window: &[f64]) -> f64 {
        let h = self.layers.recurrent.forward(window.iter().copied());
        let hidden = self.layers.hidden.forward(&h);
        self.layers.output.forward(&hidden)[0]
    }

    fn forward_cached(&self, window: &[f64], scale: f64) -> (f64, SampleCache) {
        let (h, recurrent) = self
            .layers
            .recurrent
            .forward_cached(window.iter().map(|v| v * scale));
        let (hidden_out, hidden) = self.layers.hidden.forward_cached(&h);
        let (out, output) = self.layers.output.forward_cached(&hidden_out);
        let cache = SampleCache {
            recurrent,
            hidden,
            output,
        };
        (out[0], cache)
    }

    fn backward(&self, grads: &mut Layers, cache: &SampleCache, d_out: f64) {
        let d_hidden = self
            .layers
            .output
            .backward(&mut grads.output, &cache.output, &Array1::from_elem(1, d_out));
        let dh = self
            .layers
            .hidden
            .backward(&mut grads.hidden, &cache.hidden, &d_hidden);
        self.layers
            .recurrent
            .backward(&mut grads.recurrent, &cache.recurrent, dh);
    }

    /// Mean squared error of a batch and its gradient.
    ///
    /// `scales[k]` multiplies every input of sample `k`: 1 without dropout,
    /// 0 for a dropped sample and `1 / (1 - p)` for a kept one.
    pub(crate) fn loss_and_gradients(
        &self,
        batch: &[WindowSample],
        scales: &[f64],
    ) -> (f64, Layers) {
        let mut grads = self.layers.zeros_like();
        let n = batch.len() as f64;
        let mut loss = 0.0;
        for (sample, &scale) in batch.iter().zip(scales) {
            let (prediction, cache) = self.forward_cached(&sample.input, scale);
            let error = prediction - sample.target;
            loss += error * error;
            self.backward(&mut grads, &cache, 2.0 * error / n);
        }
        (loss / n, grads)
    }

    /// Mean squared error without dropout; `None` for no samples
    pub fn evaluate_loss(&self, samples: &[WindowSample]) -> Option<f64> {
        if samples.is_empty() {
            return None;
        }
        let total: f64 = samples
            .iter()
            .map(|s| (self.forward(&s.input) - s.target).powi(2))
            .sum();
        Some(total / samples.len() as f64)
    }

    /// Input scale per sample for one training batch.
    ///
    /// Dropout keeps or drops a whole window: a single Bernoulli draw per
    /// sample decides whether all of its inputs, at every time step, are
    /// zeroed or scaled by `1 / (1 - p)`.
    fn dropout_scales(&mut self, count: usize) -> Vec<f64> {
        match self.keep {
            Some(keep) => {
                let scale = 1.0 / (1.0 - self.dropout);
                (0..count)
                    .map(|_| if keep.sample(&mut self.rng) { scale } else { 0.0 })
                    .collect()
            }
            None => vec![1.0; count],
        }
    }

    /// One optimizer step on a mini-batch, returning the batch loss before the step
    pub fn train_batch(&mut self, batch: &[WindowSample], optimizer: &mut Adam) -> Result<f64> {
        if batch.is_empty() {
            return Err(ForecastError::InsufficientData(
                "Empty training batch".to_string(),
            ));
        }
        for sample in batch {
            self.check_window(&sample.input)?;
        }

        let scales = self.dropout_scales(batch.len());
        let (loss, grads) = self.loss_and_gradients(batch, &scales);
        optimizer.apply(&mut self.layers, &grads);
        debug!(batch = batch.len(), loss, "Applied batch update");
        Ok(loss)
    }
}

impl SequencePredictor for SequenceRegressor {
    fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    fn predict_one(&self, window: &[f64]) -> Result<f64> {
        self.check_window(window)?;
        Ok(self.forward(window))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples(count: usize, length: usize) -> Vec<WindowSample> {
        (0..count)
            .map(|k| {
                let input: Vec<f64> = (0..length)
                    .map(|t| ((k * length + t) as f64 * 0.37).sin())
                    .collect();
                let target = input.iter().sum::<f64>() / length as f64 + 0.1;
                WindowSample { input, target }
            })
            .collect()
    }

    fn gradient_check(kind: ModelKind) {
        let net = SequenceRegressor::new(kind, 5, 4, 0.0, Some(11)).unwrap();
        let batch = samples(3, 5);
        let (_, grads) = net.loss_and_gradients(&batch, &[1.0; 3]);
        let analytic = grads.params();
        let eps = 1e-6;

        for (slot, grad) in analytic.iter().enumerate() {
            for index in [0, grad.len() - 1] {
                let perturbed = |delta: f64| {
                    let mut shifted = net.clone();
                    {
                        let mut views = shifted.layers.params_mut();
                        let value = views[slot].iter_mut().nth(index).unwrap();
                        *value += delta;
                    }
                    shifted.evaluate_loss(&batch).unwrap()
                };
                let numeric = (perturbed(eps) - perturbed(-eps)) / (2.0 * eps);
                let exact = *grad.iter().nth(index).unwrap();
                let tolerance = 1e-5 + 1e-3 * numeric.abs().max(exact.abs());
                assert!(
                    (numeric - exact).abs() < tolerance,
                    "{} slot {} index {}: numeric {} vs backprop {}",
                    kind,
                    slot,
                    index,
                    numeric,
                    exact
                );
            }
        }
    }

    #[test]
    fn test_gru_gradients_match_finite_differences() {
        gradient_check(ModelKind::Gru);
    }

    #[test]
    fn test_lstm_gradients_match_finite_differences() {
        gradient_check(ModelKind::Lstm);
    }

    #[test]
    fn test_training_reduces_loss() {
        let mut net = SequenceRegressor::new(ModelKind::Gru, 5, 8, 0.0, Some(5)).unwrap();
        let batch = samples(16, 5);
        let before = net.evaluate_loss(&batch).unwrap();
        let mut adam = Adam::new(0.01);
        for _ in 0..100 {
            net.train_batch(&batch, &mut adam).unwrap();
        }
        let after = net.evaluate_loss(&batch).unwrap();
        assert!(after < before, "loss went from {} to {}", before, after);
    }

    #[test]
    fn test_seed_makes_initialization_repeatable() {
        let a = SequenceRegressor::new(ModelKind::Lstm, 4, 3, 0.1, Some(99)).unwrap();
        let b = SequenceRegressor::new(ModelKind::Lstm, 4, 3, 0.1, Some(99)).unwrap();
        assert_eq!(a.layers, b.layers);
        assert_eq!(a.name(), "LSTM(3)");
        assert_eq!(a.parameter_count(), 4 * (3 + 9 + 3) + (3 * 32 + 32) + (32 + 1));
    }

    #[test]
    fn test_dropout_masks_whole_samples() {
        let mut net = SequenceRegressor::new(ModelKind::Gru, 4, 3, 0.25, Some(8)).unwrap();
        let scales = net.dropout_scales(400);
        assert_eq!(scales.len(), 400);
        assert!(scales
            .iter()
            .all(|&s| s == 0.0 || (s - 1.0 / 0.75).abs() < 1e-12));
        let dropped = scales.iter().filter(|&&s| s == 0.0).count();
        assert!((50..150).contains(&dropped), "dropped {} of 400", dropped);

        let mut plain = SequenceRegressor::new(ModelKind::Gru, 4, 3, 0.0, Some(8)).unwrap();
        assert_eq!(plain.dropout_scales(3), vec![1.0; 3]);
    }

    #[test]
    fn test_rejects_wrong_window_length() {
        let net = SequenceRegressor::new(ModelKind::Gru, 4, 3, 0.0, Some(1)).unwrap();
        assert!(net.predict_one(&[1.0, 2.0]).is_err());
        assert!(net.predict_one(&[1.0, 2.0, 3.0, 4.0]).is_ok());
    }
}
