use ndarray::{Array1, ArrayView1};

use crate::error::Result;

/// What a minimizer drives.
///
/// The minimizer calls `cost` for every function evaluation (including the evaluations
/// behind finite-difference gradients) and `iteration` once after each completed
/// iteration, with the parameters reached.
pub trait Objective {
    fn cost(&mut self, p: ArrayView1<f64>) -> Result<f64>;

    fn iteration(&mut self, p: ArrayView1<f64>) -> Result<()>;
}

/// Counts evaluations and computes forward-difference gradients.
pub(crate) struct Evaluator<'a> {
    objective: &'a mut dyn Objective,
    epsilon: f64,
    pub func_calls: usize,
    pub grad_calls: usize,
}

impl<'a> Evaluator<'a> {
    pub fn new(objective: &'a mut dyn Objective, epsilon: f64) -> Self {
        Evaluator {
            objective,
            epsilon,
            func_calls: 0,
            grad_calls: 0,
        }
    }

    pub fn f(&mut self, x: ArrayView1<f64>) -> Result<f64> {
        self.func_calls += 1;
        self.objective.cost(x)
    }

    /// Gradient at `x`, where the cost is already known to be `fx`.
    pub fn grad(&mut self, x: ArrayView1<f64>, fx: f64) -> Result<Array1<f64>> {
        self.grad_calls += 1;
        let mut probe = x.to_owned();
        let mut g = Array1::zeros(x.len());
        for i in 0..x.len() {
            let orig = probe[i];
            let h = self.epsilon * orig.abs().max(1.0);
            probe[i] = orig + h;
            let fp = self.f(probe.view())?;
            probe[i] = orig;
            g[i] = (fp - fx) / h;
        }
        Ok(g)
    }

    pub fn iteration(&mut self, x: ArrayView1<f64>) -> Result<()> {
        self.objective.iteration(x)
    }
}

/// Backtracking line search with the Armijo sufficient-decrease condition.
pub(crate) struct LineSearch {
    pub c1: f64,
    pub shrink: f64,
    pub max_steps: usize,
}

impl Default for LineSearch {
    fn default() -> Self {
        LineSearch {
            c1: 1e-4,
            shrink: 0.5,
            max_steps: 50,
        }
    }
}

/// Accepted step of a line search.
pub(crate) struct Step {
    pub alpha: f64,
    pub x: Array1<f64>,
    pub fx: f64,
}

impl LineSearch {
    /// Search along `direction` from `x`. `None` if `direction` is not a descent direction
    /// or no step length gives a sufficient decrease.
    pub fn search(
        &self,
        eval: &mut Evaluator<'_>,
        x: ArrayView1<f64>,
        fx: f64,
        g: ArrayView1<f64>,
        direction: ArrayView1<f64>,
        alpha0: f64,
    ) -> Result<Option<Step>> {
        let slope = g.dot(&direction);
        if !(slope < 0.0) {
            return Ok(None);
        }
        let mut alpha = alpha0;
        for _ in 0..self.max_steps {
            let candidate = &x + &(&direction * alpha);
            let fc = eval.f(candidate.view())?;
            if fc.is_finite() && fc <= fx + self.c1 * alpha * slope {
                return Ok(Some(Step {
                    alpha,
                    x: candidate,
                    fx: fc,
                }));
            }
            alpha *= self.shrink;
        }
        Ok(None)
    }
}

pub(crate) fn max_abs(v: ArrayView1<f64>) -> f64 {
    v.iter().fold(0.0, |m: f64, x| m.max(x.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    struct Quadratic;

    impl Objective for Quadratic {
        fn cost(&mut self, p: ArrayView1<f64>) -> Result<f64> {
            Ok((p[0] - 1.0).powi(2) + 3.0 * (p[1] + 2.0).powi(2))
        }

        fn iteration(&mut self, _p: ArrayView1<f64>) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_forward_difference_gradient() {
        let mut objective = Quadratic;
        let mut eval = Evaluator::new(&mut objective, 1e-7);
        let x = array![0.0, 0.0];
        let fx = eval.f(x.view()).unwrap();
        let g = eval.grad(x.view(), fx).unwrap();
        assert!((g[0] + 2.0).abs() < 1e-5);
        assert!((g[1] - 12.0).abs() < 1e-5);
        assert_eq!(eval.func_calls, 3);
        assert_eq!(eval.grad_calls, 1);
    }

    #[test]
    fn test_line_search_rejects_ascent() {
        let mut objective = Quadratic;
        let mut eval = Evaluator::new(&mut objective, 1e-7);
        let x = array![0.0, 0.0];
        let g = array![-2.0, 12.0];
        let up = array![-1.0, 1.0];
        assert!(LineSearch::default()
            .search(&mut eval, x.view(), 13.0, g.view(), up.view(), 1.0)
            .unwrap()
            .is_none());

        let down = -&g;
        let step = LineSearch::default()
            .search(&mut eval, x.view(), 13.0, g.view(), down.view(), 1.0)
            .unwrap()
            .unwrap();
        assert!(step.fx < 13.0);
        assert!(step.alpha <= 1.0);
    }
}
