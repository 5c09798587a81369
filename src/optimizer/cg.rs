use ndarray::Array1;
use serde::{Deserialize, Serialize};

use super::objective::{max_abs, Evaluator, LineSearch, Objective};
use super::{OptimizationResult, OptimizationStatus, Optimizer};
use crate::error::{Result, TenbilacError};

/// Nonlinear conjugate gradient with the Polak-Ribiere+ update, restarted along the
/// steepest descent every `n` iterations.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ConjugateGradient {
    pub maxiter: usize,
    pub gtol: f64,
    pub epsilon: f64,
}

impl ConjugateGradient {
    pub fn new(maxiter: usize, gtol: f64) -> Self {
        ConjugateGradient {
            maxiter,
            gtol,
            ..Default::default()
        }
    }
}

impl Default for ConjugateGradient {
    fn default() -> Self {
        ConjugateGradient {
            maxiter: 100,
            gtol: 1e-5,
            epsilon: f64::EPSILON.sqrt(),
        }
    }
}

impl Optimizer for ConjugateGradient {
    fn name(&self) -> &'static str {
        "cg"
    }

    fn minimize(&self, objective: &mut dyn Objective, x0: Array1<f64>) -> Result<OptimizationResult> {
        if !(self.gtol >= 0.0) {
            return Err(TenbilacError::invalid_parameter("gtol", "must be non-negative"));
        }
        let n = x0.len().max(1);
        let mut eval = Evaluator::new(objective, self.epsilon);
        let search = LineSearch::default();

        let mut x = x0;
        let mut fx = eval.f(x.view())?;
        let mut g = eval.grad(x.view(), fx)?;
        let mut direction = -&g;
        let mut alpha = 1.0 / max_abs(g.view()).max(1.0);
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
            if !(g.dot(&direction) < 0.0) {
                direction = -&g;
            }

            let alpha0 = (2.0 * alpha).min(1.0);
            let step = match search.search(&mut eval, x.view(), fx, g.view(), direction.view(), alpha0)? {
                Some(step) => step,
                None => {
                    status = OptimizationStatus::LineSearchFailed;
                    break;
                }
            };

            alpha = step.alpha;
            x = step.x;
            fx = step.fx;
            iterations += 1;
            eval.iteration(x.view())?;
            let g_new = eval.grad(x.view(), fx)?;

            let gg = g.dot(&g);
            let beta = if iterations % n == 0 || gg == 0.0 {
                0.0
            } else {
                (g_new.dot(&(&g_new - &g)) / gg).max(0.0)
            };
            direction = &direction * beta - &g_new;
            g = g_new;
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
