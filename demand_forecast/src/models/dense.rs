//! Fully connected layer

use super::{glorot_uniform, outer, Parameters};
use ndarray::{Array1, Array2, ArrayViewD, ArrayViewMutD};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Linear,
}

impl Activation {
    fn apply(self, z: &Array1<f64>) -> Array1<f64> {
        match self {
            Activation::Relu => z.mapv(|v| v.max(0.0)),
            Activation::Linear => z.clone(),
        }
    }

    /// Derivative at pre-activation `z`
    fn derivative(self, z: &Array1<f64>) -> Array1<f64> {
        match self {
            Activation::Relu => z.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 }),
            Activation::Linear => Array1::ones(z.raw_dim()),
        }
    }
}

/// `y = act(W x + b)`, `W` of shape `(units, inputs)`
#[derive(Debug, Clone, PartialEq)]
pub struct Dense {
    weights: Array2<f64>,
    bias: Array1<f64>,
    activation: Activation,
}

/// Values kept from the forward pass for the backward pass
#[derive(Debug, Clone)]
pub(crate) struct DenseCache {
    input: Array1<f64>,
    preactivation: Array1<f64>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        units: usize,
        activation: Activation,
        rng: &mut R,
    ) -> Self {
        Self {
            weights: glorot_uniform(units, inputs, inputs, units, rng),
            bias: Array1::zeros(units),
            activation,
        }
    }

    pub fn units(&self) -> usize {
        self.bias.len()
    }

    pub fn forward(&self, input: &Array1<f64>) -> Array1<f64> {
        self.activation.apply(&(self.weights.dot(input) + &self.bias))
    }

    pub(crate) fn forward_cached(&self, input: &Array1<f64>) -> (Array1<f64>, DenseCache) {
        let z = self.weights.dot(input) + &self.bias;
        let out = self.activation.apply(&z);
        let cache = DenseCache {
            input: input.clone(),
            preactivation: z,
        };
        (out, cache)
    }

    /// Accumulate weight gradients into `grad` and return the input gradient
    pub(crate) fn backward(
        &self,
        grad: &mut Dense,
        cache: &DenseCache,
        d_out: &Array1<f64>,
    ) -> Array1<f64> {
        let dz = d_out * &self.activation.derivative(&cache.preactivation);
        grad.weights += &outer(dz.view(), cache.input.view());
        grad.bias += &dz;
        self.weights.t().dot(&dz)
    }
}

impl Parameters for Dense {
    fn params(&self) -> Vec<ArrayViewD<'_, f64>> {
        vec![self.weights.view().into_dyn(), self.bias.view().into_dyn()]
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        vec![
            self.weights.view_mut().into_dyn(),
            self.bias.view_mut().into_dyn(),
        ]
    }

    fn zeros_like(&self) -> Self {
        Self {
            weights: Array2::zeros(self.weights.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
            activation: self.activation,
        }
    }
}
