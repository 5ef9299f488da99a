//! Adam optimizer (Adaptive Moment Estimation)

use super::Parameters;
use ndarray::{ArrayD, Zip};

pub const DEFAULT_BETA1: f64 = 0.9;
pub const DEFAULT_BETA2: f64 = 0.999;
pub const DEFAULT_EPSILON: f64 = 1e-7;

/// Adam with bias-corrected moments, one moment pair per parameter slot
#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
    t: i32,
    m: Vec<ArrayD<f64>>,
    v: Vec<ArrayD<f64>>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            epsilon: DEFAULT_EPSILON,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// Number of updates applied so far
    pub fn steps(&self) -> i32 {
        self.t
    }

    /// Apply one update to `params` from gradients laid out the same way
    pub fn apply<P: Parameters>(&mut self, params: &mut P, grads: &P) {
        let grads = grads.params();
        if self.m.len() != grads.len() {
            self.m = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.v = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.t = 0;
        }

        self.t += 1;
        let (beta1, beta2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let correction1 = 1.0 - beta1.powi(self.t);
        let correction2 = 1.0 - beta2.powi(self.t);

        let slots = params
            .params_mut()
            .into_iter()
            .zip(&grads)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()));
        for ((param, grad), (m, v)) in slots {
            Zip::from(param)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|p, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / correction1;
                    let v_hat = *v / correction2;
                    *p -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gate;
    use ndarray::{Array1, Array2};

    fn gate(value: f64) -> Gate {
        Gate {
            w_x: Array2::from_elem((1, 1), value),
            w_h: Array2::from_elem((1, 1), value),
            b: Array1::from_elem(1, value),
        }
    }

    #[test]
    fn test_first_step_moves_by_learning_rate() {
        let mut params = gate(1.0);
        let grads = gate(0.5);
        let mut adam = Adam::new(0.01);
        adam.apply(&mut params, &grads);

        // Bias correction makes the first step lr * sign(g)
        for p in params.params() {
            assert!((p.iter().next().copied().unwrap_or_default() - 0.99).abs() < 1e-6);
        }
        assert_eq!(adam.steps(), 1);
    }

    #[test]
    fn test_zero_gradient_leaves_params() {
        let mut params = gate(2.0);
        let grads = gate(0.0);
        let mut adam = Adam::new(0.1);
        adam.apply(&mut params, &grads);
        assert_eq!(params, gate(2.0));
    }
}
