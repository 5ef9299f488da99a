//! Long short-term memory cell
//!
//! ```text
//! i  = σ(W_xi x + W_hi h + b_i)
//! f  = σ(W_xf x + W_hf h + b_f)
//! g  = tanh(W_xg x + W_hg h + b_g)
//! o  = σ(W_xo x + W_ho h + b_o)
//! c' = f ⊙ c + i ⊙ g
//! h' = o ⊙ tanh(c')
//! ```

use super::{sigmoid, tanh, Gate, Parameters};
use ndarray::{Array1, ArrayViewD, ArrayViewMutD};
use rand::Rng;

/// Initial forget-gate bias
const FORGET_BIAS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LstmCell {
    input: Gate,
    forget: Gate,
    cell: Gate,
    output: Gate,
}

/// Intermediate values of one time step
#[derive(Debug, Clone)]
pub(crate) struct LstmStep {
    x: Array1<f64>,
    h_prev: Array1<f64>,
    c_prev: Array1<f64>,
    i: Array1<f64>,
    f: Array1<f64>,
    g: Array1<f64>,
    o: Array1<f64>,
    tanh_c: Array1<f64>,
}

impl LstmCell {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        Self {
            input: Gate::new(input_size, hidden_size, 4, 0.0, rng),
            forget: Gate::new(input_size, hidden_size, 4, FORGET_BIAS, rng),
            cell: Gate::new(input_size, hidden_size, 4, 0.0, rng),
            output: Gate::new(input_size, hidden_size, 4, 0.0, rng),
        }
    }

    pub fn hidden_size(&self) -> usize {
        self.input.b.len()
    }

    /// One step from `(h, c)` to the next `(h, c)`
    pub fn step(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let (h, c, _) = self.step_cached(x, h_prev, c_prev);
        (h, c)
    }

    pub(crate) fn step_cached(
        &self,
        x: &Array1<f64>,
        h_prev: &Array1<f64>,
        c_prev: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>, LstmStep) {
        let i = sigmoid(&self.input.preactivation(x, h_prev));
        let f = sigmoid(&self.forget.preactivation(x, h_prev));
        let g = tanh(&self.cell.preactivation(x, h_prev));
        let o = sigmoid(&self.output.preactivation(x, h_prev));

        let c = &f * c_prev + &i * &g;
        let tanh_c = tanh(&c);
        let h = &o * &tanh_c;

        let cache = LstmStep {
            x: x.clone(),
            h_prev: h_prev.clone(),
            c_prev: c_prev.clone(),
            i,
            f,
            g,
            o,
            tanh_c,
        };
        (h, c, cache)
    }

    /// Backpropagate `(dh, dc)` through one step, returning the gradients
    /// for `(h_prev, c_prev)`
    pub(crate) fn backward_step(
        &self,
        grad: &mut LstmCell,
        step: &LstmStep,
        dh: &Array1<f64>,
        dc: &Array1<f64>,
    ) -> (Array1<f64>, Array1<f64>) {
        let LstmStep {
            x,
            h_prev,
            c_prev,
            i,
            f,
            g,
            o,
            tanh_c,
        } = step;

        let d_o = dh * tanh_c;
        let dc_total = dc + &(dh * &(o * &tanh_c.mapv(|v| 1.0 - v * v)));

        let d_i = &dc_total * g;
        let d_g = &dc_total * i;
        let d_f = &dc_total * c_prev;
        let dc_prev = &dc_total * f;

        let da_i = &d_i * &i.mapv(|v| v * (1.0 - v));
        let da_f = &d_f * &f.mapv(|v| v * (1.0 - v));
        let da_g = &d_g * &g.mapv(|v| 1.0 - v * v);
        let da_o = &d_o * &o.mapv(|v| v * (1.0 - v));

        Gate::accumulate(&mut grad.input, &da_i, x, h_prev);
        Gate::accumulate(&mut grad.forget, &da_f, x, h_prev);
        Gate::accumulate(&mut grad.cell, &da_g, x, h_prev);
        Gate::accumulate(&mut grad.output, &da_o, x, h_prev);

        let dh_prev = self.input.backprop_hidden(&da_i)
            + self.forget.backprop_hidden(&da_f)
            + self.cell.backprop_hidden(&da_g)
            + self.output.backprop_hidden(&da_o);

        (dh_prev, dc_prev)
    }
}

impl Parameters for LstmCell {
    fn params(&self) -> Vec<ArrayViewD<'_, f64>> {
        let mut params = self.input.params();
        params.extend(self.forget.params());
        params.extend(self.cell.params());
        params.extend(self.output.params());
        params
    }

    fn params_mut(&mut self) -> Vec<ArrayViewMutD<'_, f64>> {
        let mut params = self.input.params_mut();
        params.extend(self.forget.params_mut());
        params.extend(self.cell.params_mut());
        params.extend(self.output.params_mut());
        params
    }

    fn zeros_like(&self) -> Self {
        Self {
            input: self.input.zeros_like(),
            forget: self.forget.zeros_like(),
            cell: self.cell.zeros_like(),
            output: self.output.zeros_like(),
        }
    }
}
