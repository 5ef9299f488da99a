//! Gated recurrent unit
//!
//! ```text
//! z  = σ(W_xz x + W_hz h + b_z)
//! r  = σ(W_xr x + W_hr h + b_r)
//! n  = tanh(W_xn x + W_hn (r ⊙ h) + b_n)
//! h' = (1 - z) ⊙ n + z ⊙ h
//! ```

use super::{sigmoid, tanh, Gate, Parameters};
use ndarray::{Array1, ArrayViewD, ArrayViewMutD};
use rand::Rng;

#[derive(Debug, Clone, PartialEq)]
pub struct GruCell {
    update: Gate,
    reset: Gate,
    candidate: Gate,
}

/// Intermediate values of one time step
#[derive(Debug, Clone)]
pub(crate) struct GruStep {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    z: Array1<f64>,
    r: Array1<f64>,
    n: Array1<f64>,
    reset_hidden: Array1<f64>,
}

impl GruCell {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        Self {
            update: Gate::new(input_size, hidden_size, 3, 0.0, rng),
            reset: Gate::new(input_size, hidden_size, 3, 0.0, rng),
            candidate: Gate::new(input_size, hidden_size, 3, 0.0, rng),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.update.b.len()
    }

    pub fn step(&self, x: &Array1<f64>, h_prev: &Array1<f64>) -> Array1<f64> {
        self.step_cached(x, h_prev).0
    }

    pub(crate) fn step_cached(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
    ) -> (Array1<f64>, GruStep) {
        let z = sigmoid(&self.update.preactivation(x, h_prev));
        let r = sigmoid(&self.reset.preactivation(x, h_prev));
        let reset_hidden = &r * h_prev;
        let n = tanh(&self.candidate.preactivation(x, &reset_hidden));
        let h = &n + &(&z * &(h_prev - &n));

        let cache = GruStep {
            x: x.clone(),
            h_prev: h_prev.clone(),
            z,
            r,
            n,
            reset_hidden,
        };
        (h, cache)
    }

    /// Backpropagate `dh` through one step, returning the gradient for `h_prev`
    pub(crate) fn backward_step(
        &self,
        grad: &mut GruCell,
        step: &GruStep,
        dh: &Array1<f64>,
    ) -> Array1<f64> {
        let GruStep {
            x,
            h_prev,
            z,
            r,
            n,
            reset_hidden,
        } = step;

        let dn = dh * &z.mapv(|v| 1.0 - v);
        let dz = dh * &(h_prev - n);
        let mut dh_prev = dh * z;

        let da_n = &dn * &n.mapv(|v| 1.0 - v * v);
        Gate::accumulate(&mut grad.candidate, &da_n, x, reset_hidden);
        let d_reset_hidden = self.candidate.backprop_hidden(&da_n);
        let dr = &d_reset_hidden * h_prev;
        dh_prev += &(&d_reset_hidden * r);

        let da_z = &dz * &z.mapv(|v| v * (1.0 - v));
        Gate::accumulate(&mut grad.update, &da_z, x, h_prev);
        dh_prev += &self.update.backprop_hidden(&da_z);

        let da_r = &dr * &r.mapv(|v| v * (1.0 - v));
        Gate::accumulate(&mut grad.reset, &da_r, x, h_prev);
        dh_prev += &self.reset.backprop_hidden(&da_r);

        dh_prev
    }
}

impl Parameters for GruCell {
    fn params(&self) -> Vec<ArrayViewD<'_, f64>> {
        let mut params = self.update.params();
        params.extend(self.reset.params());
        params.extend(self.candidate.params());
        params
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut params = self.update.params_mut();
        params.extend(self.reset.params_mut());
        params.extend(self.candidate.params_mut());
        params
    }

    fn zeros_like(&self) -> Self {
        Self {
            update: self.update.zeros_like(),
            reset: self.reset.zeros_like(),
            candidate: self.candidate.zeros_like(),
        }
    }
}
