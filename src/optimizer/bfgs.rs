use log::debug;
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use super::objective::{max_abs, Evaluator, LineSearch, Objective};
use super::{OptimizationResult, OptimizationStatus, Optimizer};
use crate::error::{Result, TenbilacError};

/// Quasi-Newton minimizer keeping a dense inverse Hessian estimate.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Bfgs {
    pub maxiter: usize,
    /// Stop once the largest gradient component is below this
    pub gtol: f64,
    /// Relative step of the finite-difference gradient
    pub epsilon: f64,
}

impl Bfgs {
    pub fn new(maxiter: usize, gtol: f64) -> Self {
        Bfgs {
            maxiter,
            gtol,
            ..Default::default()
        }
    }
}

impl Default for Bfgs {
    fn default() -> Self {
        Bfgs {
            maxiter: 100,
            gtol: 1e-5,
            epsilon: f64::EPSILON.sqrt(),
        }
    }
}

impl Optimizer for Bfgs {
    fn name(&self) -> &'static str {
        "bfgs"
    }

    fn minimize(&self, objective: &mut dyn Objective, x0: Array1<f64>) -> Result<OptimizationResult> {
        if !(self.gtol >= 0.0) {
            return Err(TenbilacError::invalid_parameter("gtol", "must be non-negative"));
        }
        let n = x0.len();
        let mut eval = Evaluator::new(objective, self.epsilon);
        let search = LineSearch::default();

        let mut x = x0;
        let mut fx = eval.f(x.view())?;
        let mut g = eval.grad(x.view(), fx)?;
        let mut h = Array2::<f64>::eye(n);
        let mut iterations = 0;
        let mut status = OptimizationStatus::MaxIterations;

        while iterations < self.maxiter {
            if !g.iter().all(|v| v.is_finite()) {
                status = OptimizationStatus::NonFinite;
                break;
            }
            if max_abs(g.view()) <= self.gtol {
                status = OptimizationStatus::Converged;
                break;
            }

            let mut direction = -h.dot(&g);
            if !(g.dot(&direction) < 0.0) {
                debug!("Resetting inverse Hessian estimate");
                h = Array2::eye(n);
                direction = -&g;
            }

            let step = match search.search(&mut eval, x.view(), fx, g.view(), direction.view(), 1.0)? {
                Some(step) => step,
                None => {
                    status = OptimizationStatus::LineSearchFailed;
                    break;
                }
            };

            let s = &step.x - &x;
            x = step.x;
            fx = step.fx;
            iterations += 1;
            eval.iteration(x.view())?;
            let g_new = eval.grad(x.view(), fx)?;
            let y = &g_new - &g;
            g = g_new;

            let sy = s.dot(&y);
            if sy > 1e-12 {
                if iterations == 1 {
                    h *= sy / y.dot(&y);
                }
                update_inverse_hessian(&mut h, &s, &y, sy);
            }
        }

        if status == OptimizationStatus::MaxIterations && max_abs(g.view()) <= self.gtol {
            status = OptimizationStatus::Converged;
        }

        Ok(OptimizationResult {
            x,
            fun: fx,
            iterations,
            func_calls: eval.func_calls,
            grad_calls: eval.grad_calls,
            status,
        })
    }
}

/// `H <- (I - rho s y^T) H (I - rho y s^T) + rho s s^T`, with `rho = 1 / (s . y)`.
fn update_inverse_hessian(h: &mut Array2<f64>, s: &Array1<f64>, y: &Array1<f64>, sy: f64) {
    let rho = 1.0 / sy;
    let hy = h.dot(y);
    let yhy = y.dot(&hy);
    let s_col = s.view().insert_axis(Axis(1));
    let ss = s_col.dot(&s.view().insert_axis(Axis(0)));
    let shy = s_col.dot(&hy.view().insert_axis(Axis(0)));
    h.scaled_add(rho * (1.0 + rho * yhy), &ss);
    h.scaled_add(-rho, &shy);
    h.scaled_add(-rho, &shy.t());
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_inverse_hessian_update_satisfies_secant() {
        let mut h = array![[2.0, 0.5, 0.0], [0.5, 1.0, 0.1], [0.0, 0.1, 3.0]];
        let s = array![0.3, -0.2, 0.5];
        let y = array![1.0, 0.4, 0.7];
        let sy = s.dot(&y);
        update_inverse_hessian(&mut h, &s, &y, sy);

        let hy = h.dot(&y);
        for i in 0..3 {
            assert!((hy[i] - s[i]).abs() < 1e-12);
            for j in 0..3 {
                assert!((h[[i, j]] - h[[j, i]]).abs() < 1e-12);
            }
        }
    }
}
